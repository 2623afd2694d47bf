//! Value types exchanged with a state store.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Free-form key/value pairs passed through to the backend.
pub type Metadata = HashMap<String, String>;

/// Store name used when none is configured.
pub const DEFAULT_STORE_NAME: &str = "statestore";

/// The value stored for one key in one store.
///
/// An absent or zero-length `value` means "not found". A deliberately stored
/// empty payload is therefore indistinguishable from a missing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateItem {
    pub key: String,
    pub value: Option<Bytes>,
    /// Backend-supplied version tag, if any.
    pub etag: Option<String>,
}

impl StateItem {
    /// An item carrying no value for `key`.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            etag: None,
        }
    }

    /// An item holding `value`. Empty payloads collapse to "not found".
    pub fn found(key: impl Into<String>, value: Bytes) -> Self {
        Self {
            key: key.into(),
            value: (!value.is_empty()).then_some(value),
            etag: None,
        }
    }

    pub fn with_etag(mut self, etag: Option<String>) -> Self {
        self.etag = etag;
        self
    }

    /// Whether the item holds a non-empty value.
    pub fn is_found(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_empty())
    }
}

/// Write concurrency mode requested from the backend.
///
/// Only last-write semantics are offered; first-write would need etags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Concurrency {
    #[default]
    LastWrite,
}

/// Replication consistency requested from the backend.
///
/// Saves never wait on replication, so eventual is the only mode sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    #[default]
    Eventual,
}

/// Options attached to a save. Ignored by the in-memory backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOptions {
    pub concurrency: Concurrency,
    pub consistency: Consistency,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_value_is_not_found() {
        let item = StateItem::found("k", Bytes::new());
        assert!(!item.is_found());
        assert_eq!(item.value, None);
    }

    #[test]
    fn non_empty_value_is_found() {
        let item = StateItem::found("k", Bytes::from_static(b"v"));
        assert!(item.is_found());
        assert_eq!(item.value.as_deref(), Some(&b"v"[..]));
    }

    #[test]
    fn not_found_keeps_key() {
        let item = StateItem::not_found("missing");
        assert_eq!(item.key, "missing");
        assert!(!item.is_found());
    }

    #[test]
    fn save_options_serialize_like_sidecar_expects() {
        let json = serde_json::to_value(SaveOptions::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"concurrency": "last-write", "consistency": "eventual"})
        );
    }
}
