//! Per-node polling task.
//!
//! Each node gets one [`Poller`], started once at startup. On every tick of
//! its own interval it fetches a snapshot, records it in the node's time
//! series and hands a [`Report`] to the aggregator. A failed fetch or decode
//! abandons the cycle; there is no retry within a cycle.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::data::{Report, Snapshot};
use crate::error::FetchError;
use crate::source::SnapshotSource;
use crate::store::TimeSeries;

/// Polls one node and forwards its snapshots.
pub struct Poller {
    node: String,
    source: Box<dyn SnapshotSource>,
    series: Box<dyn TimeSeries>,
    interval: Duration,
    reports: mpsc::Sender<Report>,
}

impl Poller {
    pub fn new(
        node: impl Into<String>,
        source: Box<dyn SnapshotSource>,
        series: Box<dyn TimeSeries>,
        interval: Duration,
        reports: mpsc::Sender<Report>,
    ) -> Self {
        Self {
            node: node.into(),
            source,
            series,
            interval,
            reports,
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    /// Run one fetch-record cycle.
    ///
    /// Returns the snapshot to report, or `None` if the cycle is abandoned.
    pub async fn poll_once(&mut self) -> Option<Snapshot> {
        let snapshot = match self.source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(FetchError::Decode(e)) => {
                warn!(node = %self.node, "bad snapshot payload: {}", e);
                return None;
            }
            Err(e) => {
                debug!(node = %self.node, "fetch failed: {}", e);
                return None;
            }
        };

        if let Err(e) = self.series.update(unix_now(), &snapshot.series_values()) {
            warn!(node = %self.node, "time series update failed: {}", e);
        }

        Some(snapshot)
    }

    /// Poll until shutdown or until the aggregator goes away.
    ///
    /// The report send waits for channel capacity, so a slow aggregator
    /// throttles this poller.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(node = %self.node, source = self.source.description(), "poller started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(snapshot) = self.poll_once().await else {
                        continue;
                    };
                    let report = Report::new(self.node.clone(), snapshot);
                    tokio::select! {
                        sent = self.reports.send(report) => {
                            if sent.is_err() {
                                debug!(node = %self.node, "aggregator gone, stopping poller");
                                return;
                            }
                        }
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                return;
                            }
                        }
                    }
                }
                changed = shutdown.changed() => {
                    // A dropped sender means the process is going away
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("node", &self.node)
            .field("interval", &self.interval)
            .finish()
    }
}

/// Seconds since the unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
