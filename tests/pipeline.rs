//! End-to-end collection scenarios over the public API.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use telematics::logsink::log_path;
use telematics::{
    Aggregator, AveragingProfile, Dashboard, Divisors, FetchError, FleetFrame, NodeLogs, Pipeline,
    Poller, Report, Roster, RosterLayout, Snapshot, SnapshotSource, StoreError, TimeSeries,
};

/// Two scale nodes (a, b) and two side nodes (c, d).
const ROSTER: &str = "\
a,1,127.0.0.1,6001,7001,1
b,2,127.0.0.1,6002,7002,1
c,3,127.0.0.1,6003,7003,0
d,4,127.0.0.1,6004,7004,0
";

#[derive(Debug)]
struct Script(Mutex<VecDeque<Option<Snapshot>>>);

impl Script {
    fn new(steps: Vec<Option<Snapshot>>) -> Self {
        Self(Mutex::new(steps.into()))
    }
}

#[async_trait]
impl SnapshotSource for Script {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let mut steps = self.0.lock().unwrap();
        let step = if steps.len() > 1 {
            steps.pop_front().flatten()
        } else {
            steps.front().copied().flatten()
        };
        step.ok_or_else(|| FetchError::Transport("connection refused".to_string()))
    }

    fn description(&self) -> &str {
        "script"
    }
}

#[derive(Debug, Default)]
struct NullSeries;

impl TimeSeries for NullSeries {
    fn update(&mut self, _timestamp: u64, _values: &[u64]) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Counts the samples written to a node's series.
#[derive(Debug, Default, Clone)]
struct CountingSeries(Arc<Mutex<usize>>);

impl CountingSeries {
    fn count(&self) -> usize {
        *self.0.lock().unwrap()
    }
}

impl TimeSeries for CountingSeries {
    fn update(&mut self, _timestamp: u64, _values: &[u64]) -> Result<(), StoreError> {
        *self.0.lock().unwrap() += 1;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
struct Frames(Arc<Mutex<Vec<FleetFrame>>>);

impl Dashboard for Frames {
    fn draw(&mut self, frame: &FleetFrame) -> std::io::Result<()> {
        self.0.lock().unwrap().push(frame.clone());
        Ok(())
    }
}

fn snapshot(generated: u64, confirmed: u64, depth: u64) -> Snapshot {
    Snapshot {
        generated_transactions: generated,
        confirmed_transactions: confirmed,
        chain_depth: depth,
        ..Snapshot::default()
    }
}

fn roster() -> Roster {
    Roster::parse(ROSTER, &RosterLayout::default()).unwrap()
}

fn aggregator(roster: &Roster, log_dir: &Path, frames: &Frames) -> Aggregator {
    let divisors = Divisors::for_roster(roster, AveragingProfile::Full).unwrap();
    let logs = NodeLogs::create(log_dir, roster.names()).unwrap();
    Aggregator::new(
        roster.clone(),
        divisors,
        logs,
        Box::new(frames.clone()),
        Duration::from_secs(1),
    )
}

fn poller(node: &str, steps: Vec<Option<Snapshot>>) -> Poller {
    poller_with_series(node, steps, Box::new(NullSeries))
}

fn poller_with_series(
    node: &str,
    steps: Vec<Option<Snapshot>>,
    series: Box<dyn TimeSeries>,
) -> Poller {
    let (tx, _rx) = mpsc::channel(1);
    Poller::new(node, Box::new(Script::new(steps)), series, Duration::from_secs(1), tx)
}

/// Poll every node once and hand its report to the aggregator.
async fn round(pollers: &mut [Poller], aggregator: &mut Aggregator) {
    for poller in pollers.iter_mut() {
        if let Some(snapshot) = poller.poll_once().await {
            aggregator.apply(Report::new(poller.node(), snapshot));
        }
    }
}

fn log_rows(dir: &Path, node: &str) -> Vec<String> {
    fs::read_to_string(log_path(dir, node))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Everything after the timestamp column.
fn row_values(row: &str) -> &str {
    row.split_once(',').map(|(_, rest)| rest).unwrap_or("")
}

#[tokio::test]
async fn test_three_ticks_steady_fleet() {
    let dir = tempdir().unwrap();
    let roster = roster();
    let frames = Frames::default();
    let mut aggregator = aggregator(&roster, dir.path(), &frames);
    let mut pollers: Vec<Poller> = roster
        .names()
        .map(|name| poller(name, vec![Some(snapshot(10, 8, 5))]))
        .collect();

    // Tick 1: one report per node, nothing to compare against yet
    round(&mut pollers, &mut aggregator).await;
    assert!(aggregator.tick(Instant::now()).unwrap().is_none());

    round(&mut pollers, &mut aggregator).await;
    let second = aggregator.tick(Instant::now()).unwrap().unwrap();

    round(&mut pollers, &mut aggregator).await;
    let third = aggregator.tick(Instant::now()).unwrap().unwrap();

    for frame in [&second, &third] {
        assert_eq!(frame.current.generated, 40);
        assert_eq!(frame.current.confirmed, 32);
        assert_eq!(frame.current.chain_depth, 20);
        // Side-averaged over two side nodes
        assert_eq!(frame.current_avg.generated, 20.0);
        assert_eq!(frame.current_avg.chain_depth, 10.0);
        assert_eq!(frame.nodes.len(), 4);
    }

    for name in ["a", "b", "c", "d"] {
        let rows = log_rows(dir.path(), name);
        assert_eq!(rows.len(), 2, "node {}", name);
        assert!(row_values(&rows[0]).starts_with("10,8,5,0,"));
    }
    assert_eq!(frames.0.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_silent_node_keeps_last_value() {
    let dir = tempdir().unwrap();
    let roster = roster();
    let frames = Frames::default();
    let mut aggregator = aggregator(&roster, dir.path(), &frames);

    let rising = |name: &str| {
        poller(
            name,
            vec![
                Some(snapshot(10, 5, 1)),
                Some(snapshot(20, 10, 2)),
                Some(snapshot(30, 15, 3)),
            ],
        )
    };
    let d_series = CountingSeries::default();
    let mut pollers = vec![
        rising("a"),
        rising("b"),
        rising("c"),
        // d answers once, then its endpoint goes away
        poller_with_series(
            "d",
            vec![Some(snapshot(10, 5, 1)), None],
            Box::new(d_series.clone()),
        ),
    ];

    round(&mut pollers, &mut aggregator).await;
    assert!(aggregator.tick(Instant::now()).unwrap().is_none());
    round(&mut pollers, &mut aggregator).await;
    let second = aggregator.tick(Instant::now()).unwrap().unwrap();
    round(&mut pollers, &mut aggregator).await;
    let third = aggregator.tick(Instant::now()).unwrap().unwrap();

    // The others keep advancing
    assert_eq!(second.current.generated, 20 + 20 + 20 + 10);
    assert_eq!(third.current.generated, 30 + 30 + 30 + 10);

    let d_row = third.nodes.iter().find(|n| n.name == "d").unwrap();
    assert_eq!(d_row.chain_depth, 1);

    let d_rows = log_rows(dir.path(), "d");
    assert_eq!(d_rows.len(), 2);
    assert_eq!(row_values(&d_rows[0]), row_values(&d_rows[1]));
    assert!(row_values(&d_rows[1]).starts_with("10,5,1,"));

    let a_rows = log_rows(dir.path(), "a");
    assert!(row_values(&a_rows[1]).starts_with("30,15,3,"));

    // d's series stopped at its only successful sample
    assert_eq!(d_series.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_running_pipeline_logs_in_lockstep() {
    let dir = tempdir().unwrap();
    let roster = roster();
    let frames = Frames::default();
    let aggregator = aggregator(&roster, dir.path(), &frames);

    let mut pipeline = Pipeline::new(Duration::from_secs(1));
    for name in roster.names() {
        let steps = if name == "b" {
            vec![None]
        } else {
            vec![Some(snapshot(10, 8, 5))]
        };
        pipeline.add_node(name, Box::new(Script::new(steps)), Box::new(NullSeries));
    }
    assert_eq!(pipeline.len(), 4);

    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(pipeline.run(aggregator, stop_rx));

    tokio::time::sleep(Duration::from_millis(5500)).await;
    stop_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    let drawn = frames.0.lock().unwrap().len();
    assert!(drawn >= 3, "only {} frames drawn", drawn);

    // Every node gets a row on every tick, reporting or not
    for name in ["a", "b", "c", "d"] {
        assert_eq!(log_rows(dir.path(), name).len(), drawn, "node {}", name);
    }
    let b_rows = log_rows(dir.path(), "b");
    assert_eq!(row_values(&b_rows[0]), "0,0,0,0,0,0,0,0,0,0,0,0,0,0");
}
