//! Writes metafield updates to the remote store, one field at a time.

use crate::config::Config;
use crate::reconcile::{CustomerId, UpdateOperation};
use anyhow::Result;
use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::Serialize;
use std::future::Future;

const MAX_DETAIL_LEN: usize = 512;

/// Why a single upsert did not succeed. `status` is `None` when no HTTP response was received.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpsertFailure {
    pub status: Option<u16>,
    pub detail: String,
}

/// Create-or-update of one metafield, keyed by `(customer_id, namespace, key)`.
pub trait AttributeStore {
    fn upsert(
        &self,
        operation: &UpdateOperation,
    ) -> impl Future<Output = Result<(), UpsertFailure>> + Send;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldFailure {
    pub key: String,
    #[serde(flatten)]
    pub failure: UpsertFailure,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub succeeded: Vec<String>,
    pub failed: Vec<FieldFailure>,
}

impl SyncResult {
    pub fn failed_keys(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(|f| f.key.as_str())
    }
}

/// Applies each operation in order against the store.
///
/// Operations are written one at a time and never retried. A failed field is recorded and the remaining fields
/// are still written.
///
/// # Arguments
/// * `store` - Remote metafield store
/// * `operations` - Updates produced by `reconcile`, in the order they should be written
///
/// # Returns
/// * `SyncResult` - Keys that were written, and keys that failed with their status and detail
pub async fn apply<S: AttributeStore>(store: &S, operations: &[UpdateOperation]) -> SyncResult {
    let mut result = SyncResult::default();

    for operation in operations {
        debug!(
            "Upsert Metafield: {}:{}.{} ({})",
            operation.customer_id, operation.namespace, operation.key, operation.kind
        );

        match store.upsert(operation).await {
            Ok(()) => {
                info!(
                    "Upsert Metafield Succeeded: {}:{}.{}",
                    operation.customer_id, operation.namespace, operation.key
                );
                result.succeeded.push(operation.key.clone());
            }
            Err(failure) => {
                warn!(
                    "Upsert Metafield Failed: {}:{}.{} - {:?} {}",
                    operation.customer_id,
                    operation.namespace,
                    operation.key,
                    failure.status,
                    failure.detail
                );
                result.failed.push(FieldFailure {
                    key: operation.key.clone(),
                    failure,
                });
            }
        }
    }

    result
}

#[derive(Serialize)]
struct MetafieldRequest<'a> {
    metafield: Metafield<'a>,
}

#[derive(Serialize)]
struct Metafield<'a> {
    namespace: &'a str,
    key: &'a str,
    value: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

impl<'a> From<&'a UpdateOperation> for MetafieldRequest<'a> {
    fn from(operation: &'a UpdateOperation) -> Self {
        MetafieldRequest {
            metafield: Metafield {
                namespace: operation.namespace,
                key: &operation.key,
                value: &operation.value,
                kind: operation.kind.metafield_type(),
            },
        }
    }
}

/// Admin REST API client for customer metafields.
#[derive(Clone, Debug)]
pub struct ShopifyClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl ShopifyClient {
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = format!(
            "https://{}/admin/api/{}",
            config.shop_domain(),
            config.api_version
        );

        Self::with_base_url(config, base_url)
    }

    pub(crate) fn with_base_url(config: &Config, base_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(ShopifyClient {
            http,
            base_url,
            access_token: config.access_token.clone(),
        })
    }

    fn metafields_url(&self, customer_id: &CustomerId) -> String {
        format!("{}/customers/{customer_id}/metafields.json", self.base_url)
    }
}

impl AttributeStore for ShopifyClient {
    async fn upsert(&self, operation: &UpdateOperation) -> Result<(), UpsertFailure> {
        let response = self
            .http
            .post(self.metafields_url(&operation.customer_id))
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&MetafieldRequest::from(operation))
            .send()
            .await
            .map_err(|e| UpsertFailure {
                status: None,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if matches!(status, StatusCode::OK | StatusCode::CREATED) {
            return Ok(());
        }

        let mut detail = response.text().await.unwrap_or_default();
        if detail.len() > MAX_DETAIL_LEN {
            let mut end = MAX_DETAIL_LEN;
            while !detail.is_char_boundary(end) {
                end -= 1;
            }
            detail.truncate(end);
        }
        if detail.is_empty() {
            detail = status.to_string();
        }

        Err(UpsertFailure {
            status: Some(status.as_u16()),
            detail,
        })
    }
}
