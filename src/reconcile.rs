//! Maps a customer webhook payload onto metafield update operations.

use crate::error::WebhookError;
use crate::key::normalize_key;
use crate::note::parse_note;
use crate::schema::{self, ValueKind};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

pub const NAMESPACE: &str = "custom";

/// Canonical keys that are never written as metafields: identifier and email aliases, and the note itself.
const RESERVED_KEYS: &[&str] = &[
    "id",
    "customer_id",
    "admin_graphql_api_id",
    "email",
    "email_address",
    "customer_email",
    "note",
];

/// Customer webhook body with the fields this service interprets pulled out, everything else in `extra`.
#[derive(Debug, Default, Deserialize)]
pub struct CustomerPayload {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub admin_graphql_api_id: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub note: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CustomerPayload {
    pub fn from_value(value: Value) -> Result<Self, WebhookError> {
        if !value.is_object() {
            return Err(WebhookError::MalformedPayload(format!(
                "expected a JSON object, got {}",
                json_type(&value)
            )));
        }

        Ok(serde_json::from_value(value)?)
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, WebhookError> {
        Self::from_value(serde_json::from_slice(body)?)
    }

    fn note(&self) -> Option<&str> {
        self.note.as_ref().and_then(Value::as_str)
    }
}

/// Bare numeric customer id, as used in Admin REST paths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    /// Accepts a bare id or a global id (`gid://shopify/Customer/12345`) and keeps the trailing segment.
    ///
    /// # Returns
    /// * `Option<CustomerId>` - The trailing segment, if it is a non-empty run of ASCII digits
    pub fn parse(raw: &str) -> Option<Self> {
        let id = raw.trim().rsplit('/').next()?.trim();

        if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            Some(CustomerId(id.to_string()))
        } else {
            None
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => n.as_u64().map(|n| CustomerId(n.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpdateOperation {
    pub customer_id: CustomerId,
    pub namespace: &'static str,
    pub key: String,
    pub value: String,
    pub kind: ValueKind,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Reconciled {
    pub customer_id: CustomerId,
    pub operations: Vec<UpdateOperation>,
}

impl Reconciled {
    /// True when nothing in the payload maps to a metafield.
    pub fn is_noop(&self) -> bool {
        self.operations.is_empty()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extracts the customer id from `id`, falling back to `admin_graphql_api_id`.
pub fn customer_id(payload: &CustomerPayload) -> Result<CustomerId, WebhookError> {
    [&payload.id, &payload.admin_graphql_api_id]
        .into_iter()
        .flatten()
        .find_map(CustomerId::from_value)
        .ok_or(WebhookError::InvalidIdentifier)
}

/// String form of a scalar value, or `None` for null, blank, and non-scalar values.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };

    if text.is_empty() { None } else { Some(text) }
}

/// Merges payload fields and note lines into one map keyed by canonical key. Note entries win.
fn merge(payload: &CustomerPayload) -> BTreeMap<String, Value> {
    let mut merged = BTreeMap::new();

    for (key, value) in &payload.extra {
        let canonical = normalize_key(key);
        if canonical != *key {
            debug!("Normalized payload key: {key:?} -> {canonical:?}");
        }
        merged.insert(canonical, value.clone());
    }

    for (label, value) in parse_note(payload.note()) {
        let canonical = normalize_key(&label);
        match merged.entry(canonical) {
            Entry::Occupied(mut e) => {
                debug!("Note overrides {:?}: {:?} -> {value:?}", e.key(), e.get());
                e.insert(Value::String(value));
            }
            Entry::Vacant(e) => {
                e.insert(Value::String(value));
            }
        }
    }

    merged
}

/// Builds the ordered list of metafield updates for a customer payload.
///
/// This function:
/// 1. Extracts the customer id from `id` or `admin_graphql_api_id`
/// 2. Merges the parsed `note` block over the payload fields, keyed by canonical key
/// 3. Skips reserved, blank, and unknown fields, logging each skip
///
/// # Arguments
/// * `payload` - Customer webhook body, already parsed into its typed form
///
/// # Returns
/// * `Result<Reconciled>` - The customer id and its updates, ordered by canonical key. An empty list is a no-op,
///   not an error.
///
/// # Errors
/// * Returns `WebhookError::InvalidIdentifier` if neither id field holds a numeric customer id
pub fn reconcile(payload: &CustomerPayload) -> Result<Reconciled, WebhookError> {
    let customer_id = customer_id(payload)?;
    debug!("Customer ID: {customer_id}");

    let mut operations = Vec::new();

    for (key, value) in merge(payload) {
        if RESERVED_KEYS.contains(&key.as_str()) {
            debug!("Skipping reserved field: {key}");
            continue;
        }

        let Some(value) = scalar_text(&value) else {
            debug!("Skipping empty field: {key}");
            continue;
        };

        let Some(kind) = schema::lookup(&key) else {
            info!("Skipping unknown field: {key}");
            continue;
        };

        operations.push(UpdateOperation {
            customer_id: customer_id.clone(),
            namespace: NAMESPACE,
            key,
            value,
            kind,
        });
    }

    debug!(
        "{} metafield update(s) for customer {customer_id}",
        operations.len()
    );

    Ok(Reconciled {
        customer_id,
        operations,
    })
}
