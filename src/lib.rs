//! Metasync library for mirroring customer webhook fields onto Shopify customer metafields.
//!
//! A customer webhook body is parsed into a typed payload, its `note` block is folded in, keys are normalized and
//! checked against a fixed metafield schema, and each surviving field is upserted to the Admin API. Per-field
//! failures are reported back rather than aborting the request.

pub mod config;
pub mod error;
pub mod key;
pub mod note;
pub mod reconcile;
pub mod schema;
pub mod sync;
pub mod verify;

use anyhow::Result;
use log::{LevelFilter, debug, info, warn};
use serde::Serialize;
use serde_json::{Value, json};

pub use config::Config;
pub use error::WebhookError;
pub use reconcile::{CustomerId, CustomerPayload, Reconciled, UpdateOperation, reconcile};
pub use sync::{AttributeStore, FieldFailure, ShopifyClient, SyncResult, apply};

pub const APP_NAME: &str = "metasync";

/// Sets up a `fern` logger writing to stderr.
///
/// `verbose` enables DEBUG for this crate and the calling module; everything else logs at WARN and above.
pub fn set_up_logger(calling_module: &str, verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for(APP_NAME, level)
        .level_for(calling_module.to_string(), level)
        .chain(std::io::stderr())
        .apply()?;

    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Every field was written.
    Ok,
    /// Some fields were written, some failed.
    Partial,
    /// Every field failed.
    Failed,
    /// Nothing in the payload maps to a metafield.
    Noop,
}

impl SyncStatus {
    fn of(result: &SyncResult) -> Self {
        match (result.succeeded.is_empty(), result.failed.is_empty()) {
            (true, true) => SyncStatus::Noop,
            (false, true) => SyncStatus::Ok,
            (false, false) => SyncStatus::Partial,
            (true, false) => SyncStatus::Failed,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct SyncResponse {
    pub status: SyncStatus,
    pub customer_id: CustomerId,
    pub updated: Vec<String>,
    pub failed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldFailure>,
}

impl SyncResponse {
    fn new(customer_id: CustomerId, result: SyncResult) -> Self {
        SyncResponse {
            status: SyncStatus::of(&result),
            customer_id,
            failed: result.failed_keys().map(str::to_string).collect(),
            updated: result.succeeded,
            errors: result.failed,
        }
    }
}

/// Outcome of one webhook invocation: a (possibly partial) sync, or a rejected request.
#[derive(Debug)]
pub enum WebhookResponse {
    Synced(SyncResponse),
    Rejected(WebhookError),
}

impl WebhookResponse {
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookResponse::Synced(_) => 200,
            WebhookResponse::Rejected(e) => e.status_code(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            WebhookResponse::Synced(response) => serde_json::to_value(response)
                .unwrap_or_else(|e| json!({ "error": e.to_string() })),
            WebhookResponse::Rejected(e) => json!({ "error": e.to_string() }),
        }
    }
}

/// Verifies and parses a webhook body into the metafield operations it implies, without writing anything.
pub fn plan(
    webhook_secret: Option<&str>,
    body: &[u8],
    signature: Option<&str>,
) -> Result<Reconciled, WebhookError> {
    verify::verify_signature(webhook_secret, body, signature)?;

    let payload = CustomerPayload::from_slice(body)?;
    debug!("Payload: {payload:?}");

    reconcile(&payload)
}

/// Handles one customer webhook end to end.
///
/// This function:
/// 1. Verifies the body signature when a webhook secret is configured
/// 2. Parses the body and reconciles it into metafield updates
/// 3. Writes each update to the store and collects the per-field outcome
///
/// # Arguments
/// * `store` - Remote metafield store
/// * `webhook_secret` - Shared secret the body is signed with, if verification is enabled
/// * `body` - Raw request body
/// * `signature` - Value of the `X-Shopify-Hmac-Sha256` header, if present
///
/// # Returns
/// * `WebhookResponse` - `Synced` with status `ok`, `partial`, `failed`, or `noop` once the customer id is known;
///   `Rejected` otherwise
///
/// # Errors
/// Never fails outright. Signature, body shape, and customer id problems come back as `Rejected` with a client
/// error status; per-field write failures are reported inside `Synced`.
pub async fn handle_customer_webhook<S: AttributeStore>(
    store: &S,
    webhook_secret: Option<&str>,
    body: &[u8],
    signature: Option<&str>,
) -> WebhookResponse {
    let reconciled = match plan(webhook_secret, body, signature) {
        Ok(reconciled) => reconciled,
        Err(e) => {
            warn!("Rejected webhook: {e}");
            return WebhookResponse::Rejected(e);
        }
    };

    if reconciled.is_noop() {
        info!(
            "No metafields to update for customer {}",
            reconciled.customer_id
        );
    }

    let result = apply(store, &reconciled.operations).await;
    let response = SyncResponse::new(reconciled.customer_id, result);

    info!(
        "Customer {} sync {:?}: {} updated, {} failed",
        response.customer_id,
        response.status,
        response.updated.len(),
        response.failed.len()
    );

    WebhookResponse::Synced(response)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sync::test::RecordingStore;

    const TEST_WEBHOOK: &str = r#"{
        "id": 706405506930370084,
        "email": "bob@example.com",
        "first_name": "Bob",
        "last_name": "Norman",
        "admin_graphql_api_id": "gid://shopify/Customer/706405506930370084",
        "note": "Company Name: Norman Supplies\nCompany Website: https://norman.example\nJob Title: Owner\nThis line is ignored",
        "company_name": "Old Name",
        "billingCity": "Ottawa",
        "tags": "",
        "addresses": []
    }"#;

    #[tokio::test]
    async fn test_handle_webhook_ok() {
        let store = RecordingStore::default();

        let response = handle_customer_webhook(&store, None, TEST_WEBHOOK.as_bytes(), None).await;

        assert_eq!(200, response.status_code());
        assert_eq!(
            json!({
                "status": "ok",
                "customer_id": "706405506930370084",
                "updated": ["billing_city", "company_name", "company_website", "job_title"],
                "failed": [],
            }),
            response.to_json()
        );
    }

    #[tokio::test]
    async fn test_handle_webhook_partial() {
        let store = RecordingStore::failing(&["company_website"]);

        let response = handle_customer_webhook(&store, None, TEST_WEBHOOK.as_bytes(), None).await;

        assert_eq!(200, response.status_code());
        let body = response.to_json();
        assert_eq!("partial", body["status"]);
        assert_eq!(json!(["billing_city", "company_name", "job_title"]), body["updated"]);
        assert_eq!(json!(["company_website"]), body["failed"]);
        assert_eq!(422, body["errors"][0]["status"]);
    }

    #[tokio::test]
    async fn test_handle_webhook_all_failed() {
        let store = RecordingStore::failing(&["industry"]);

        let response =
            handle_customer_webhook(&store, None, br#"{"id": 5, "industry": "Retail"}"#, None)
                .await;

        assert_eq!(200, response.status_code());
        assert_eq!("failed", response.to_json()["status"]);
    }

    #[tokio::test]
    async fn test_handle_webhook_noop() {
        let store = RecordingStore::default();

        let response = handle_customer_webhook(
            &store,
            None,
            br#"{"id": "gid://shopify/Customer/5", "email": "a@example.com", "tags": ""}"#,
            None,
        )
        .await;

        assert_eq!(200, response.status_code());
        assert_eq!(
            json!({"status": "noop", "customer_id": "5", "updated": [], "failed": []}),
            response.to_json()
        );
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_handle_webhook_missing_id() {
        let store = RecordingStore::default();

        let response =
            handle_customer_webhook(&store, None, br#"{"company_name": "Acme"}"#, None).await;

        assert_eq!(400, response.status_code());
        assert_eq!(
            json!({"error": "missing or invalid customer id"}),
            response.to_json()
        );
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_handle_webhook_malformed() {
        let store = RecordingStore::default();

        let bodies: [&[u8]; 3] = [b"[1, 2, 3]", b"", b"{\"id\": "];
        for body in bodies {
            let response = handle_customer_webhook(&store, None, body, None).await;

            assert_eq!(400, response.status_code());
            assert!(matches!(
                response,
                WebhookResponse::Rejected(WebhookError::MalformedPayload(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_handle_webhook_signature() {
        let store = RecordingStore::default();
        let body = br#"{"id": 5, "industry": "Retail"}"#;
        let signature = verify::sign("hush", body);

        let response = handle_customer_webhook(&store, Some("hush"), body, Some(&signature)).await;
        assert_eq!(200, response.status_code());

        let response = handle_customer_webhook(&store, Some("hush"), body, None).await;
        assert_eq!(401, response.status_code());

        assert_eq!(vec!["industry"], store.calls());
    }

    #[test]
    fn test_plan_does_not_write() -> Result<()> {
        let reconciled = plan(None, TEST_WEBHOOK.as_bytes(), None)?;

        assert_eq!("706405506930370084", reconciled.customer_id.as_str());
        assert_eq!(4, reconciled.operations.len());

        Ok(())
    }
}
