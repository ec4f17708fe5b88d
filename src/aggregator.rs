//! The aggregator task.
//!
//! A single task owns the current and previous snapshot maps. Pollers never
//! touch them; they only send [`Report`]s. On each tick the aggregator sums
//! and averages the fleet, writes one CSV row per node and redraws the
//! dashboard.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::data::{Divisors, FleetFrame, Report, Snapshot};
use crate::error::AggregateError;
use crate::logsink::NodeLogs;
use crate::poller::unix_now;
use crate::roster::Roster;
use crate::ui::Dashboard;

/// Latest and previous snapshot per node.
#[derive(Debug, Clone, Default)]
pub struct AggregatorState {
    current: BTreeMap<String, Snapshot>,
    previous: BTreeMap<String, Snapshot>,
}

impl AggregatorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a report. The node's old current value becomes its previous.
    pub fn apply(&mut self, report: Report) {
        if let Some(old) = self.current.insert(report.node.clone(), report.snapshot) {
            self.previous.insert(report.node, old);
        }
    }

    pub fn current(&self) -> &BTreeMap<String, Snapshot> {
        &self.current
    }

    pub fn previous(&self) -> &BTreeMap<String, Snapshot> {
        &self.previous
    }

    /// True once some node has reported twice.
    pub fn is_warm(&self) -> bool {
        !self.current.is_empty() && !self.previous.is_empty()
    }
}

/// Owns the fleet state and everything written on a tick.
pub struct Aggregator {
    state: AggregatorState,
    roster: Roster,
    divisors: Divisors,
    logs: NodeLogs,
    dashboard: Box<dyn Dashboard>,
    interval: Duration,
    started: Instant,
}

impl Aggregator {
    pub fn new(
        roster: Roster,
        divisors: Divisors,
        logs: NodeLogs,
        dashboard: Box<dyn Dashboard>,
        interval: Duration,
    ) -> Self {
        Self {
            state: AggregatorState::new(),
            roster,
            divisors,
            logs,
            dashboard,
            interval,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> &AggregatorState {
        &self.state
    }

    pub fn apply(&mut self, report: Report) {
        self.state.apply(report);
    }

    /// Run one aggregation step.
    ///
    /// Returns `Ok(None)` while the state is not yet warm.
    pub fn tick(&mut self, now: Instant) -> Result<Option<FleetFrame>, AggregateError> {
        if !self.state.is_warm() {
            debug!("tick skipped, waiting for second report");
            return Ok(None);
        }

        let elapsed = now.saturating_duration_since(self.started);
        let frame = FleetFrame::compute(
            &self.state.current,
            &self.state.previous,
            &self.divisors,
            &self.roster,
            elapsed,
        )?;

        self.logs.write_tick(unix_now(), &self.state.current)?;

        if let Err(e) = self.dashboard.draw(&frame) {
            warn!("dashboard draw failed: {}", e);
        }

        Ok(Some(frame))
    }

    /// Consume reports and tick until shutdown.
    ///
    /// Once every poller has stopped the report branch is disabled and the
    /// loop keeps ticking on the last known state.
    pub async fn run(
        mut self,
        mut reports: mpsc::Receiver<Report>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), AggregateError> {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reports_open = true;

        info!(
            nodes = self.roster.len(),
            interval = ?self.interval,
            "aggregator started"
        );

        loop {
            tokio::select! {
                report = reports.recv(), if reports_open => match report {
                    Some(report) => self.state.apply(report),
                    None => {
                        debug!("report channel closed");
                        reports_open = false;
                    }
                },
                _ = ticker.tick() => {
                    self.tick(Instant::now())?;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("aggregator stopping");
                        return Ok(());
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("state", &self.state)
            .field("divisors", &self.divisors)
            .field("interval", &self.interval)
            .finish()
    }
}
