//! Authenticity check for inbound webhooks signed with the shared app secret.

use crate::error::WebhookError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use hmac::{Hmac, Mac};
use log::warn;
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "X-Shopify-Hmac-Sha256";

type HmacSha256 = Hmac<Sha256>;

/// Checks the base64 HMAC-SHA256 of the raw body against `signature`.
///
/// Verification is skipped when no secret is configured.
pub fn verify_signature(
    secret: Option<&str>,
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), WebhookError> {
    let Some(secret) = secret else {
        return Ok(());
    };

    let Some(signature) = signature else {
        warn!("Webhook signature missing");
        return Err(WebhookError::InvalidSignature);
    };

    let expected = BASE64_STANDARD.decode(signature.trim()).map_err(|_| {
        warn!("Webhook signature is not valid base64");
        WebhookError::InvalidSignature
    })?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);

    mac.verify_slice(&expected).map_err(|_| {
        warn!("Webhook signature mismatch");
        WebhookError::InvalidSignature
    })
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("any key length is valid");
    mac.update(body);
    BASE64_STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "hush";
    const BODY: &[u8] = br#"{"id": 1}"#;

    #[test]
    fn test_verify_no_secret() {
        assert!(verify_signature(None, BODY, None).is_ok());
        assert!(verify_signature(None, BODY, Some("garbage")).is_ok());
    }

    #[test]
    fn test_verify_valid() {
        let signature = sign(SECRET, BODY);
        assert!(verify_signature(Some(SECRET), BODY, Some(&signature)).is_ok());
    }

    #[test]
    fn test_verify_tampered_body() {
        let signature = sign(SECRET, BODY);
        let res = verify_signature(Some(SECRET), br#"{"id": 2}"#, Some(&signature));
        assert!(matches!(res, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn test_verify_wrong_secret() {
        let signature = sign("other", BODY);
        let res = verify_signature(Some(SECRET), BODY, Some(&signature));
        assert!(matches!(res, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn test_verify_missing_header() {
        let res = verify_signature(Some(SECRET), BODY, None);
        assert!(matches!(res, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn test_verify_not_base64() {
        let res = verify_signature(Some(SECRET), BODY, Some("%%%"));
        assert!(matches!(res, Err(WebhookError::InvalidSignature)));
    }
}
