use thiserror::Error;

/// Request-level failures. Each one aborts the invocation with a client error.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("missing or invalid customer id")]
    InvalidIdentifier,

    #[error("invalid webhook signature")]
    InvalidSignature,
}

impl WebhookError {
    /// HTTP status returned to the webhook caller.
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookError::MalformedPayload(_) | WebhookError::InvalidIdentifier => 400,
            WebhookError::InvalidSignature => 401,
        }
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(e: serde_json::Error) -> Self {
        WebhookError::MalformedPayload(e.to_string())
    }
}
