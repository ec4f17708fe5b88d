//! Snapshot source abstraction.
//!
//! A poller asks its [`SnapshotSource`] for one snapshot per cycle. The
//! production implementation is [`HttpSource`]; tests plug in scripted
//! sources.

mod http;

pub use http::{HttpSource, HttpSourceBuilder};

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Deserialize;

use crate::data::{Snapshot, SNAPSHOT_FIELDS};
use crate::error::FetchError;

/// Trait for fetching a node's current snapshot.
#[async_trait]
pub trait SnapshotSource: Send + Sync + Debug {
    /// Fetch one snapshot.
    ///
    /// Every error is per-cycle: the caller skips this cycle and tries
    /// again on its next tick.
    async fn fetch(&self) -> Result<Snapshot, FetchError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}

/// How strictly a snapshot payload is decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMode {
    /// Unknown keys are ignored, missing keys read as zero.
    #[default]
    Lenient,
    /// Every snapshot key must be present and no other key is allowed.
    Strict,
}

impl SchemaMode {
    /// Decode a response body.
    pub fn decode(&self, body: &[u8]) -> Result<Snapshot, FetchError> {
        match self {
            SchemaMode::Lenient => Ok(serde_json::from_slice(body)?),
            SchemaMode::Strict => {
                let value: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_slice(body)?;

                if let Some(unknown) = value.keys().find(|k| !SNAPSHOT_FIELDS.contains(&k.as_str()))
                {
                    return Err(FetchError::Decode(format!("unknown field '{}'", unknown)));
                }
                if let Some(missing) = SNAPSHOT_FIELDS.iter().find(|f| !value.contains_key(**f)) {
                    return Err(FetchError::Decode(format!("missing field '{}'", missing)));
                }

                Ok(serde_json::from_value(serde_json::Value::Object(value))?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_body() -> String {
        let fields: Vec<String> = SNAPSHOT_FIELDS
            .iter()
            .map(|f| {
                if *f == "token" {
                    format!("\"{}\": false", f)
                } else {
                    format!("\"{}\": 1", f)
                }
            })
            .collect();
        format!("{{{}}}", fields.join(","))
    }

    #[test]
    fn test_lenient_accepts_partial_and_extra() {
        let body = br#"{"generated_transactions": 5, "chain_depth": 2, "version": "x"}"#;
        let snapshot = SchemaMode::Lenient.decode(body).unwrap();
        assert_eq!(snapshot.generated_transactions, 5);
        assert_eq!(snapshot.gas, 0);
    }

    #[test]
    fn test_strict_accepts_full_payload() {
        let snapshot = SchemaMode::Strict.decode(full_body().as_bytes()).unwrap();
        assert_eq!(snapshot.submit_num, 1);
    }

    #[test]
    fn test_strict_rejects_missing_field() {
        let body = br#"{"generated_transactions": 5, "chain_depth": 2}"#;
        let err = SchemaMode::Strict.decode(body).unwrap_err();
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_strict_rejects_unknown_field() {
        let mut body = full_body();
        body.insert_str(1, "\"extra\": 1,");
        let err = SchemaMode::Strict.decode(body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("unknown field 'extra'"));
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let err = SchemaMode::Lenient.decode(b"<html>").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
