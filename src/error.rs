//! Error types for the collection pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the node roster.
///
/// All of these are fatal: the roster is read once at startup.
#[derive(Debug, Error)]
pub enum RosterError {
    /// The roster file could not be opened or read.
    #[error("cannot read roster {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record did not have the expected number of columns.
    #[error("roster line {line}: expected {expected} fields, found {found}")]
    Arity {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A record could not be interpreted.
    #[error("roster line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// The same node name appears twice.
    #[error("roster line {line}: duplicate node '{name}'")]
    Duplicate { line: usize, name: String },
}

/// Errors that can occur when fetching a snapshot from a node.
///
/// Every variant is recoverable: the poller abandons the cycle and waits
/// for its next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with a non-success status.
    #[error("endpoint returned status {0}")]
    Status(u16),

    /// The response body is not a valid snapshot.
    #[error("failed to decode snapshot: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// Errors from the per-node time-series store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("series store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store file is not in the expected layout.
    #[error("malformed series store: {0}")]
    Format(String),

    /// Update carried a different number of values than the store has fields.
    #[error("expected {expected} values, got {found}")]
    Arity { expected: usize, found: usize },

    /// Timestamps must strictly increase.
    #[error("update at {timestamp} is not after last update at {last}")]
    Stale { timestamp: u64, last: u64 },
}

/// Errors raised by the aggregation step.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// A class-weighted average would divide by a zero class count.
    #[error("cannot average '{field}': no {class} nodes configured")]
    ZeroDivisor {
        field: &'static str,
        class: &'static str,
    },

    /// The aggregator task panicked or was cancelled.
    #[error("aggregator task failed: {0}")]
    Task(String),

    /// Writing a node's CSV log failed.
    #[error("failed to write log for node '{node}': {source}")]
    Log {
        node: String,
        #[source]
        source: std::io::Error,
    },
}
