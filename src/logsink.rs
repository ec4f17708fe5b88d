//! Append-only per-node CSV logs.
//!
//! Every aggregation tick writes exactly one row per configured node, even
//! for a node that has never reported (it logs as an all-zero snapshot) or
//! has not reported since the previous tick (its last value repeats). This
//! keeps every node's log on the same row cadence so the files can be
//! joined row by row downstream.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::data::Snapshot;
use crate::error::AggregateError;

/// Path of a node's CSV log inside `dir`.
pub fn log_path(dir: &Path, node: &str) -> PathBuf {
    dir.join(format!("{}.txt", node))
}

/// One CSV stream per node, owned by the aggregator.
#[derive(Debug, Default)]
pub struct NodeLogs {
    writers: BTreeMap<String, Box<dyn LogWriter>>,
}

/// Destination of one node's rows.
pub trait LogWriter: Send + std::fmt::Debug {
    fn append(&mut self, row: &str) -> std::io::Result<()>;
}

#[derive(Debug)]
struct FileLog(BufWriter<File>);

impl LogWriter for FileLog {
    fn append(&mut self, row: &str) -> std::io::Result<()> {
        self.0.write_all(row.as_bytes())?;
        self.0.flush()
    }
}

impl NodeLogs {
    /// Create (truncating) `<dir>/<node>.txt` for every node.
    pub fn create<'a>(
        dir: &Path,
        nodes: impl IntoIterator<Item = &'a str>,
    ) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let mut logs = Self::default();
        for node in nodes {
            let file = File::create(log_path(dir, node))?;
            logs.insert(node, Box::new(FileLog(BufWriter::new(file))));
        }
        Ok(logs)
    }

    /// Register a writer for a node.
    pub fn insert(&mut self, node: &str, writer: Box<dyn LogWriter>) {
        self.writers.insert(node.to_string(), writer);
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    /// Append one row per node from `current`; absent nodes log zeros.
    pub fn write_tick(
        &mut self,
        timestamp: u64,
        current: &BTreeMap<String, Snapshot>,
    ) -> Result<(), AggregateError> {
        for (node, writer) in self.writers.iter_mut() {
            let snapshot = current.get(node).copied().unwrap_or_default();
            writer
                .append(&snapshot.csv_row(timestamp))
                .map_err(|source| AggregateError::Log {
                    node: node.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}
