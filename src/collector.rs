//! Startup wiring for the `log` subcommand.
//!
//! Everything that can fail fatally (roster, directories, stores, averaging
//! divisors) is resolved before a single task is spawned. After that the
//! pipeline only stops on shutdown, on a log write failure or when the
//! aggregator task dies.

use std::fs;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::aggregator::Aggregator;
use crate::config::Settings;
use crate::data::{Divisors, Report};
use crate::error::AggregateError;
use crate::logsink::NodeLogs;
use crate::poller::Poller;
use crate::roster::Roster;
use crate::source::{HttpSource, SnapshotSource};
use crate::store::{series_path, telemetry_fields, SeriesStore, TimeSeries};
use crate::ui::Dashboard;

/// Reports in flight between pollers and the aggregator.
///
/// A single slot: a slow aggregator holds every poller at its send.
pub const REPORT_CHANNEL_CAPACITY: usize = 1;

/// Pollers sharing one report channel.
#[derive(Debug)]
pub struct Pipeline {
    interval: Duration,
    sender: mpsc::Sender<Report>,
    reports: mpsc::Receiver<Report>,
    pollers: Vec<Poller>,
}

impl Pipeline {
    pub fn new(interval: Duration) -> Self {
        let (sender, reports) = mpsc::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            interval,
            sender,
            reports,
            pollers: Vec::new(),
        }
    }

    /// Register a node's poller.
    pub fn add_node(
        &mut self,
        node: &str,
        source: Box<dyn SnapshotSource>,
        series: Box<dyn TimeSeries>,
    ) {
        self.pollers.push(Poller::new(
            node,
            source,
            series,
            self.interval,
            self.sender.clone(),
        ));
    }

    pub fn len(&self) -> usize {
        self.pollers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pollers.is_empty()
    }

    /// Spawn every poller and the aggregator, then wait for the aggregator.
    ///
    /// Pollers are stopped once the aggregator returns. A panicked
    /// aggregator is reported as [`AggregateError::Task`].
    pub async fn run(
        self,
        aggregator: Aggregator,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), AggregateError> {
        let Pipeline {
            sender,
            reports,
            pollers,
            ..
        } = self;
        drop(sender);

        let mut tasks = JoinSet::new();
        for poller in pollers {
            tasks.spawn(poller.run(shutdown.clone()));
        }

        let result = match tokio::spawn(aggregator.run(reports, shutdown)).await {
            Ok(result) => result,
            Err(e) => {
                error!("aggregator task failed: {}", e);
                Err(AggregateError::Task(e.to_string()))
            }
        };

        tasks.shutdown().await;
        result
    }
}

/// Build the HTTP-backed pipeline from settings and run it until shutdown.
pub async fn run_collection(
    settings: &Settings,
    dashboard: Box<dyn Dashboard>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let interval = settings.poll_interval()?;

    let roster = Roster::load(&settings.nodes_file, &settings.roster)
        .with_context(|| format!("failed to load roster {}", settings.nodes_file.display()))?;
    if roster.is_empty() {
        bail!("roster {} lists no nodes", settings.nodes_file.display());
    }
    let divisors = Divisors::for_roster(&roster, settings.averaging)?;

    fs::create_dir_all(&settings.data_dir).with_context(|| {
        format!("cannot create data directory {}", settings.data_dir.display())
    })?;
    let logs = NodeLogs::create(&settings.log_dir, roster.names()).with_context(|| {
        format!("cannot create node logs in {}", settings.log_dir.display())
    })?;

    let client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;

    let mut pipeline = Pipeline::new(interval);
    for endpoint in roster.endpoints() {
        let path = series_path(&settings.data_dir, &endpoint.name);
        let store = SeriesStore::create(&path, telemetry_fields(), interval, settings.duration)
            .with_context(|| format!("cannot create series store {}", path.display()))?;
        let source = HttpSource::builder(endpoint.url.as_str())
            .client(client.clone())
            .schema(settings.schema)
            .build()?;
        pipeline.add_node(&endpoint.name, Box::new(source), Box::new(store));
    }

    info!(
        nodes = roster.len(),
        scale = roster.count_scale(),
        side = roster.count_side(),
        interval = ?interval,
        "starting collection"
    );

    let aggregator = Aggregator::new(roster, divisors, logs, dashboard, interval);
    pipeline
        .run(aggregator, shutdown)
        .await
        .context("aggregation stopped")?;

    info!("collection stopped");
    Ok(())
}
