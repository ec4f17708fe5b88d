//! Data models and aggregation for node snapshots.
//!
//! ## Submodules
//!
//! - [`snapshot`]: wire types ([`Snapshot`], [`Report`])
//! - [`aggregate`]: fleet sums, class-weighted averages and the per-tick [`FleetFrame`]
//! - [`duration`]: interval parsing and elapsed-time formatting
//!
//! ## Data Flow
//!
//! ```text
//! Report (from a poller)
//!        │
//!        ▼
//! current / previous maps (aggregator)
//!        │  every tick
//!        ▼
//! FleetTotals::sum() ──▶ Divisors::average() ──▶ FleetFrame
//! ```

pub mod aggregate;
pub mod duration;
pub mod snapshot;

pub use aggregate::{
    latency_per_block, throughput, AveragingProfile, Divisor, Divisors, Field, FleetAverages,
    FleetFrame, FleetTotals, NodeRow,
};
pub use snapshot::{Report, Snapshot, SNAPSHOT_FIELDS};
