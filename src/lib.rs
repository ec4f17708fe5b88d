//! # telematics
//!
//! A fleet telemetry collector and live dashboard for ScaleChain nodes.
//!
//! Every node in a roster exposes a JSON snapshot of its counters over
//! HTTP. The collector polls each node on a fixed interval, records the
//! samples in a per-node time series, aggregates the fleet on its own tick
//! and renders the result to the terminal.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          collector                               │
//! │                                                                  │
//! │  ┌─────────┐  Report   ┌────────────┐   FleetFrame   ┌─────────┐ │
//! │  │ poller  │──────────▶│ aggregator │───────────────▶│   ui    │ │
//! │  │ (1/node)│ channel(1)│ (1 task)   │                │         │ │
//! │  └────┬────┘           └─────┬──────┘                └─────────┘ │
//! │       │                      │                                   │
//! │       ▼                      ▼                                   │
//! │  ┌─────────┐           ┌────────────┐                            │
//! │  │  store  │           │  logsink   │                            │
//! │  │ .series │           │  <node>.txt│                            │
//! │  └─────────┘           └────────────┘                            │
//! │       ▲                                                          │
//! │  ┌─────────┐                                                     │
//! │  │ source  │◀── HttpSource | any SnapshotSource                  │
//! │  └─────────┘                                                     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`roster`]**: the node list, read once at startup
//! - **[`source`]**: the [`SnapshotSource`] trait and its HTTP implementation
//! - **[`poller`]**: one task per node: fetch, record, report
//! - **[`aggregator`]**: the single owner of fleet state; sums, class-weighted
//!   averages, per-node CSV rows and dashboard frames
//! - **[`store`]**: bounded per-node time series, read back by [`plot`]
//! - **[`ui`]**: the full-screen ratatui dashboard and a plain fallback
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Poll every node in nodes.txt once a second
//! telematics log --nodes-file nodes.txt
//!
//! # Chart a node's generated transaction rate
//! telematics plot --node node_1 --content txrate --output node_1.svg
//! ```
//!
//! ### As a library
//!
//! ```
//! use telematics::{AggregatorState, Report, Snapshot};
//!
//! let mut state = AggregatorState::new();
//! state.apply(Report::new("node_1", Snapshot::default()));
//! assert!(!state.is_warm());
//!
//! state.apply(Report::new("node_1", Snapshot { chain_depth: 3, ..Snapshot::default() }));
//! assert!(state.is_warm());
//! ```
//!
//! ### Driving a poller by hand
//!
//! ```no_run
//! use std::time::Duration;
//! use telematics::{HttpSource, Pipeline, SeriesStore, telemetry_fields};
//!
//! # tokio_test::block_on(async {
//! let source = HttpSource::builder("http://127.0.0.1:7001/telematics/snapshot")
//!     .build()
//!     .unwrap();
//! let store = SeriesStore::create(
//!     "node_1.series",
//!     telemetry_fields(),
//!     Duration::from_secs(1),
//!     3600,
//! )
//! .unwrap();
//!
//! let mut pipeline = Pipeline::new(Duration::from_secs(1));
//! pipeline.add_node("node_1", Box::new(source), Box::new(store));
//! # });
//! ```

pub mod aggregator;
pub mod collector;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod logsink;
pub mod plot;
pub mod poller;
pub mod roster;
pub mod source;
pub mod store;
pub mod ui;

// Re-export main types for convenience
pub use aggregator::{Aggregator, AggregatorState};
pub use collector::{run_collection, Pipeline};
pub use config::{Overrides, Settings};
pub use data::{AveragingProfile, Divisors, FleetFrame, FleetTotals, Report, Snapshot};
pub use error::{AggregateError, FetchError, RosterError, StoreError};
pub use logsink::NodeLogs;
pub use plot::PlotContent;
pub use poller::Poller;
pub use roster::{NodeClass, NodeEndpoint, Roster, RosterLayout};
pub use source::{HttpSource, SchemaMode, SnapshotSource};
pub use store::{telemetry_fields, SeriesStore, TimeSeries};
pub use ui::{Dashboard, PlainDashboard, TerminalDashboard, Theme};
