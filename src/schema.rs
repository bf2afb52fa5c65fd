//! The fixed table of customer metafields this service writes.

use serde::Serialize;
use std::fmt;

/// Declared value type of a metafield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    MultilineText,
    Url,
}

impl ValueKind {
    /// Type name the Admin API expects for this kind.
    pub fn metafield_type(self) -> &'static str {
        match self {
            ValueKind::Text => "single_line_text_field",
            ValueKind::MultilineText => "multi_line_text_field",
            ValueKind::Url => "url",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metafield_type())
    }
}

const SCHEMA: &[(&str, ValueKind)] = &[
    ("billing_first_name", ValueKind::Text),
    ("billing_last_name", ValueKind::Text),
    ("billing_phone", ValueKind::Text),
    ("billing_address_1", ValueKind::Text),
    ("billing_address_2", ValueKind::Text),
    ("billing_city", ValueKind::Text),
    ("billing_state", ValueKind::Text),
    ("billing_postcode", ValueKind::Text),
    ("billing_country", ValueKind::Text),
    ("shipping_first_name", ValueKind::Text),
    ("shipping_last_name", ValueKind::Text),
    ("shipping_phone", ValueKind::Text),
    ("shipping_address_1", ValueKind::Text),
    ("shipping_address_2", ValueKind::Text),
    ("shipping_city", ValueKind::Text),
    ("shipping_state", ValueKind::Text),
    ("shipping_postcode", ValueKind::Text),
    ("shipping_country", ValueKind::Text),
    ("company_name", ValueKind::Text),
    ("company_website", ValueKind::Url),
    ("company_size", ValueKind::Text),
    ("industry", ValueKind::Text),
    ("job_title", ValueKind::Text),
    ("tax_id", ValueKind::Text),
    ("business_type", ValueKind::Text),
    ("annual_revenue", ValueKind::Text),
    ("referral_source", ValueKind::Text),
    ("account_manager", ValueKind::Text),
    ("customer_tier", ValueKind::Text),
    ("lead_status", ValueKind::Text),
    ("signup_source", ValueKind::Text),
    ("internal_notes", ValueKind::MultilineText),
];

/// Returns the declared kind of a canonical key, or `None` for keys outside the schema.
pub fn lookup(canonical_key: &str) -> Option<ValueKind> {
    SCHEMA
        .iter()
        .find(|(key, _)| *key == canonical_key)
        .map(|(_, kind)| *kind)
}

#[cfg(test)]
fn keys() -> impl Iterator<Item = &'static str> {
    SCHEMA.iter().map(|(key, _)| *key)
}
