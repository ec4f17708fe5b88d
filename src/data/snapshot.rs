//! Node snapshot and report types.
//!
//! These types match the JSON served by a node's `/telematics/snapshot`
//! endpoint. The lighter deployment only serves `generated_transactions`
//! and `chain_depth`; every other field defaults to zero so both payloads
//! decode into the same shape.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Number of fields in a snapshot (including the token flag).
pub const SNAPSHOT_FIELDS: [&str; 14] = [
    "generated_transactions",
    "confirmed_transactions",
    "chain_depth",
    "token",
    "propose_block",
    "sign_block",
    "submit_block",
    "propose_latency",
    "sign_latency",
    "submit_latency",
    "gas",
    "propose_num",
    "sign_num",
    "submit_num",
];

/// A point-in-time metrics payload from one node.
///
/// Counters (transactions, latencies, gas, event counts) never decrease at
/// the source. Latencies are cumulative milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub generated_transactions: u64,
    pub confirmed_transactions: u64,
    pub chain_depth: u64,
    /// Set while the node holds the leadership token.
    pub token: bool,

    /// Block id currently being proposed (0 when idle).
    pub propose_block: u64,
    /// Block id currently being signed (0 when idle).
    pub sign_block: u64,
    /// Block id currently being submitted (0 when idle).
    pub submit_block: u64,

    pub propose_latency: u64,
    pub sign_latency: u64,
    pub submit_latency: u64,

    pub gas: u64,

    pub propose_num: u64,
    pub sign_num: u64,
    pub submit_num: u64,
}

impl Snapshot {
    /// Values written to the node's time series, in store field order.
    ///
    /// See [`crate::store::telemetry_fields`] for the matching field specs.
    pub fn series_values(&self) -> [u64; 10] {
        [
            self.generated_transactions,
            self.confirmed_transactions,
            self.chain_depth,
            self.propose_latency,
            self.sign_latency,
            self.submit_latency,
            self.gas,
            self.propose_num,
            self.sign_num,
            self.submit_num,
        ]
    }

    /// Format one CSV log row: timestamp followed by every raw field.
    pub fn csv_row(&self, timestamp: u64) -> String {
        let mut row = String::with_capacity(96);
        let _ = write!(
            row,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            timestamp,
            self.generated_transactions,
            self.confirmed_transactions,
            self.chain_depth,
            u8::from(self.token),
            self.propose_block,
            self.sign_block,
            self.submit_block,
            self.propose_latency,
            self.sign_latency,
            self.submit_latency,
            self.gas,
            self.propose_num,
            self.sign_num,
            self.submit_num,
        );
        row.push('\n');
        row
    }
}

/// A snapshot tagged with the node it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub node: String,
    pub snapshot: Snapshot,
}

impl Report {
    pub fn new(node: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            node: node.into(),
            snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_snapshot() {
        let json = r#"{
            "generated_transactions": 10,
            "confirmed_transactions": 8,
            "chain_depth": 5,
            "token": true,
            "propose_block": 6,
            "sign_block": 0,
            "submit_block": 4,
            "propose_latency": 1200,
            "sign_latency": 300,
            "submit_latency": 900,
            "gas": 21000,
            "propose_num": 5,
            "sign_num": 2,
            "submit_num": 4
        }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.generated_transactions, 10);
        assert_eq!(snapshot.confirmed_transactions, 8);
        assert!(snapshot.token);
        assert_eq!(snapshot.gas, 21000);
        assert_eq!(snapshot.submit_num, 4);
    }

    #[test]
    fn test_reduced_schema_defaults_to_zero() {
        let json = r#"{ "generated_transactions": 42, "chain_depth": 7 }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.generated_transactions, 42);
        assert_eq!(snapshot.chain_depth, 7);
        assert_eq!(snapshot.confirmed_transactions, 0);
        assert!(!snapshot.token);
        assert_eq!(snapshot.propose_latency, 0);
    }

    #[test]
    fn test_csv_row_layout() {
        let snapshot = Snapshot {
            generated_transactions: 10,
            confirmed_transactions: 8,
            chain_depth: 5,
            token: true,
            gas: 7,
            submit_num: 3,
            ..Snapshot::default()
        };

        let row = snapshot.csv_row(1_700_000_000);
        assert_eq!(row, "1700000000,10,8,5,1,0,0,0,0,0,0,7,0,0,3\n");
        assert_eq!(row.trim_end().split(',').count(), SNAPSHOT_FIELDS.len() + 1);
    }

    #[test]
    fn test_zero_snapshot_row() {
        let row = Snapshot::default().csv_row(5);
        assert_eq!(row, "5,0,0,0,0,0,0,0,0,0,0,0,0,0,0\n");
    }

    #[test]
    fn test_series_values_order() {
        let snapshot = Snapshot {
            generated_transactions: 1,
            confirmed_transactions: 2,
            chain_depth: 3,
            propose_latency: 4,
            sign_latency: 5,
            submit_latency: 6,
            gas: 7,
            propose_num: 8,
            sign_num: 9,
            submit_num: 10,
            ..Snapshot::default()
        };
        assert_eq!(snapshot.series_values(), [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }
}
