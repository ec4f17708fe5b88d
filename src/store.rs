//! Per-node round-robin time-series store.
//!
//! Each node gets one `.series` file: a JSON header line describing the
//! fields, followed by one CSV row per update:
//!
//! ```text
//! {"step":1,"heartbeat":2,"rows":3600,"fields":[{"name":"generated_tx","kind":"COUNTER"},...]}
//! 1700000000,10,8,5,...
//! 1700000001,12,9,5,...
//! ```
//!
//! Only the newest `rows` entries are retained. The file is compacted once
//! it holds twice that many rows.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// File extension of series stores.
pub const SERIES_EXTENSION: &str = "series";

/// How a field's samples are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldKind {
    /// Monotonic total; readers derive a per-second rate.
    Counter,
    /// Point-in-time value.
    Gauge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn counter(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Counter,
        }
    }

    pub fn gauge(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Gauge,
        }
    }
}

/// Field specs of a node store, in [`crate::Snapshot::series_values`] order.
pub fn telemetry_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::counter("generated_tx"),
        FieldSpec::counter("confirmed_tx"),
        FieldSpec::gauge("chain_depth"),
        FieldSpec::counter("propose_latency"),
        FieldSpec::counter("sign_latency"),
        FieldSpec::counter("submit_latency"),
        FieldSpec::counter("gas"),
        FieldSpec::gauge("propose_num"),
        FieldSpec::gauge("sign_num"),
        FieldSpec::gauge("submit_num"),
    ]
}

/// Path of a node's store inside `dir`.
pub fn series_path(dir: &Path, node: &str) -> PathBuf {
    dir.join(format!("{}.{}", node, SERIES_EXTENSION))
}

/// Store metadata written as the first line of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesHeader {
    /// Expected seconds between updates.
    pub step: u64,
    /// Seconds after which a missing update marks a gap.
    pub heartbeat: u64,
    /// Number of rows retained.
    pub rows: usize,
    pub fields: Vec<FieldSpec>,
}

impl SeriesHeader {
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRow {
    pub timestamp: u64,
    pub values: Vec<u64>,
}

/// Contents of a store as read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesData {
    pub header: SeriesHeader,
    pub rows: Vec<SeriesRow>,
}

/// A sink for one node's metric history.
pub trait TimeSeries: Send {
    /// Record `values` (in field order) at `timestamp` (unix seconds).
    fn update(&mut self, timestamp: u64, values: &[u64]) -> Result<(), StoreError>;
}

/// File-backed [`TimeSeries`].
#[derive(Debug)]
pub struct SeriesStore {
    path: PathBuf,
    header: SeriesHeader,
    writer: BufWriter<File>,
    last_update: Option<u64>,
    stored: usize,
}

impl SeriesStore {
    /// Create (or overwrite) a store.
    ///
    /// `step` is the polling interval; the heartbeat is twice the step.
    pub fn create(
        path: impl Into<PathBuf>,
        fields: Vec<FieldSpec>,
        step: Duration,
        rows: usize,
    ) -> Result<Self, StoreError> {
        if rows == 0 {
            return Err(StoreError::Format("row capacity must be positive".to_string()));
        }
        let path = path.into();
        let step = step.as_secs().max(1);
        let header = SeriesHeader {
            step,
            heartbeat: step * 2,
            rows,
            fields,
        };

        let mut writer = BufWriter::new(File::create(&path)?);
        write_header(&mut writer, &header)?;
        writer.flush()?;

        Ok(Self {
            path,
            header,
            writer,
            last_update: None,
            stored: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &SeriesHeader {
        &self.header
    }

    /// Read a store, keeping only the retained rows.
    pub fn read(path: &Path) -> Result<SeriesData, StoreError> {
        let content = fs::read_to_string(path)?;
        let mut lines = content.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| StoreError::Format("missing header".to_string()))?;
        let header: SeriesHeader = serde_json::from_str(header_line)
            .map_err(|e| StoreError::Format(format!("bad header: {}", e)))?;

        let mut rows = Vec::new();
        for (index, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            rows.push(parse_row(line, header.fields.len(), index + 2)?);
        }

        let excess = rows.len().saturating_sub(header.rows);
        rows.drain(..excess);

        Ok(SeriesData { header, rows })
    }

    /// Rewrite the file with only the newest `rows` entries.
    fn compact(&mut self) -> Result<(), StoreError> {
        self.writer.flush()?;
        let data = Self::read(&self.path)?;

        let tmp = self.path.with_extension("series.tmp");
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            write_header(&mut out, &data.header)?;
            for row in &data.rows {
                write_row(&mut out, row.timestamp, &row.values)?;
            }
            out.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.stored = data.rows.len();
        Ok(())
    }
}

impl TimeSeries for SeriesStore {
    fn update(&mut self, timestamp: u64, values: &[u64]) -> Result<(), StoreError> {
        if values.len() != self.header.fields.len() {
            return Err(StoreError::Arity {
                expected: self.header.fields.len(),
                found: values.len(),
            });
        }
        if let Some(last) = self.last_update {
            if timestamp <= last {
                return Err(StoreError::Stale { timestamp, last });
            }
        }

        write_row(&mut self.writer, timestamp, values)?;
        self.writer.flush()?;
        self.last_update = Some(timestamp);
        self.stored += 1;

        if self.stored >= self.header.rows * 2 {
            self.compact()?;
        }
        Ok(())
    }
}

fn write_header(out: &mut impl Write, header: &SeriesHeader) -> Result<(), StoreError> {
    let json = serde_json::to_string(header)
        .map_err(|e| StoreError::Format(format!("cannot encode header: {}", e)))?;
    out.write_all(json.as_bytes())?;
    out.write_all(b"\n")?;
    Ok(())
}

fn write_row(out: &mut impl Write, timestamp: u64, values: &[u64]) -> Result<(), StoreError> {
    write!(out, "{}", timestamp)?;
    for value in values {
        write!(out, ",{}", value)?;
    }
    out.write_all(b"\n")?;
    Ok(())
}

fn parse_row(line: &str, arity: usize, line_no: usize) -> Result<SeriesRow, StoreError> {
    let mut parts = line.split(',').map(|p| p.trim().parse::<u64>());
    let bad = || StoreError::Format(format!("bad row at line {}", line_no));

    let timestamp = parts.next().ok_or_else(bad)?.map_err(|_| bad())?;
    let values = parts.collect::<Result<Vec<u64>, _>>().map_err(|_| bad())?;
    if values.len() != arity {
        return Err(StoreError::Arity {
            expected: arity,
            found: values.len(),
        });
    }
    Ok(SeriesRow { timestamp, values })
}
