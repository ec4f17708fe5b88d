//! Fleet-wide sums, class-weighted averages and derived rates.
//!
//! The two node classes do different work, so each averaged field has its
//! own divisor. With the default [`AveragingProfile::Full`] mapping:
//!
//! | field                                      | divisor        |
//! |--------------------------------------------|----------------|
//! | generated, confirmed, chain depth          | side count     |
//! | sign latency, submit latency, gas          | scale count    |
//! | propose latency                            | none           |
//!
//! [`AveragingProfile::Reduced`] (two-field deployments) divides every
//! field by the total node count; [`AveragingProfile::ReducedScale`] divides
//! them by the scale count instead.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use super::snapshot::Snapshot;
use crate::error::AggregateError;
use crate::roster::{NodeClass, Roster};

/// Fields that are summed across nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Generated,
    Confirmed,
    ChainDepth,
    ProposeLatency,
    SignLatency,
    SubmitLatency,
    Gas,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Generated,
        Field::Confirmed,
        Field::ChainDepth,
        Field::ProposeLatency,
        Field::SignLatency,
        Field::SubmitLatency,
        Field::Gas,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Generated => "generated_transactions",
            Field::Confirmed => "confirmed_transactions",
            Field::ChainDepth => "chain_depth",
            Field::ProposeLatency => "propose_latency",
            Field::SignLatency => "sign_latency",
            Field::SubmitLatency => "submit_latency",
            Field::Gas => "gas",
        }
    }
}

/// What a summed field is divided by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divisor {
    /// Number of side nodes.
    Side,
    /// Number of scale nodes.
    Scale,
    /// Number of nodes in the roster.
    Nodes,
    /// Passed through undivided.
    Unit,
}

impl Divisor {
    fn label(&self) -> &'static str {
        match self {
            Divisor::Side => "side",
            Divisor::Scale => "scale",
            Divisor::Nodes => "roster",
            Divisor::Unit => "unit",
        }
    }
}

/// Field-to-divisor mapping in use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AveragingProfile {
    #[default]
    Full,
    /// Two-field deployments: every field over the roster size.
    Reduced,
    /// Two-field deployments: every field over the scale count.
    #[serde(rename = "reduced-scale")]
    ReducedScale,
}

impl AveragingProfile {
    pub fn divisor(&self, field: Field) -> Divisor {
        match self {
            AveragingProfile::Full => match field {
                Field::Generated | Field::Confirmed | Field::ChainDepth => Divisor::Side,
                Field::SignLatency | Field::SubmitLatency | Field::Gas => Divisor::Scale,
                Field::ProposeLatency => Divisor::Unit,
            },
            AveragingProfile::Reduced => Divisor::Nodes,
            AveragingProfile::ReducedScale => Divisor::Scale,
        }
    }
}

/// Sums of the additive snapshot fields over a set of nodes.
///
/// Node counters are `u64`; sums are `u128` so no roster size can overflow
/// them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetTotals {
    pub generated: u128,
    pub confirmed: u128,
    pub chain_depth: u128,
    pub propose_latency: u128,
    pub sign_latency: u128,
    pub submit_latency: u128,
    pub gas: u128,
}

impl FleetTotals {
    /// Sum over the given snapshots. Token, block ids and event counts are
    /// not additive and are left out.
    pub fn sum<'a>(snapshots: impl IntoIterator<Item = &'a Snapshot>) -> Self {
        snapshots.into_iter().fold(Self::default(), |mut acc, s| {
            acc.generated += u128::from(s.generated_transactions);
            acc.confirmed += u128::from(s.confirmed_transactions);
            acc.chain_depth += u128::from(s.chain_depth);
            acc.propose_latency += u128::from(s.propose_latency);
            acc.sign_latency += u128::from(s.sign_latency);
            acc.submit_latency += u128::from(s.submit_latency);
            acc.gas += u128::from(s.gas);
            acc
        })
    }

    pub fn get(&self, field: Field) -> u128 {
        match field {
            Field::Generated => self.generated,
            Field::Confirmed => self.confirmed,
            Field::ChainDepth => self.chain_depth,
            Field::ProposeLatency => self.propose_latency,
            Field::SignLatency => self.sign_latency,
            Field::SubmitLatency => self.submit_latency,
            Field::Gas => self.gas,
        }
    }
}

/// Class-weighted averages of [`FleetTotals`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FleetAverages {
    pub generated: f64,
    pub confirmed: f64,
    pub chain_depth: f64,
    pub propose_latency: f64,
    pub sign_latency: f64,
    pub submit_latency: f64,
    pub gas: f64,
}

/// Validated averaging divisors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divisors {
    scale: u64,
    side: u64,
    profile: AveragingProfile,
}

impl Divisors {
    /// Fails if any divisor the profile needs is zero.
    pub fn new(
        count_scale: usize,
        count_side: usize,
        profile: AveragingProfile,
    ) -> Result<Self, AggregateError> {
        let divisors = Self {
            scale: count_scale as u64,
            side: count_side as u64,
            profile,
        };
        for field in Field::ALL {
            divisors.count(field)?;
        }
        Ok(divisors)
    }

    pub fn for_roster(roster: &Roster, profile: AveragingProfile) -> Result<Self, AggregateError> {
        Self::new(roster.count_scale(), roster.count_side(), profile)
    }

    pub fn profile(&self) -> AveragingProfile {
        self.profile
    }

    fn count(&self, field: Field) -> Result<u64, AggregateError> {
        let divisor = self.profile.divisor(field);
        let count = match divisor {
            Divisor::Side => self.side,
            Divisor::Scale => self.scale,
            Divisor::Nodes => self.side + self.scale,
            Divisor::Unit => 1,
        };
        if count == 0 {
            return Err(AggregateError::ZeroDivisor {
                field: field.name(),
                class: divisor.label(),
            });
        }
        Ok(count)
    }

    fn average_field(&self, totals: &FleetTotals, field: Field) -> Result<f64, AggregateError> {
        Ok(totals.get(field) as f64 / self.count(field)? as f64)
    }

    pub fn average(&self, totals: &FleetTotals) -> Result<FleetAverages, AggregateError> {
        Ok(FleetAverages {
            generated: self.average_field(totals, Field::Generated)?,
            confirmed: self.average_field(totals, Field::Confirmed)?,
            chain_depth: self.average_field(totals, Field::ChainDepth)?,
            propose_latency: self.average_field(totals, Field::ProposeLatency)?,
            sign_latency: self.average_field(totals, Field::SignLatency)?,
            submit_latency: self.average_field(totals, Field::SubmitLatency)?,
            gas: self.average_field(totals, Field::Gas)?,
        })
    }
}

/// Cumulative rate since process start.
///
/// This is total over total elapsed time, not a per-tick delta.
pub fn throughput(average: f64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        average / secs
    } else {
        0.0
    }
}

/// Average latency per block, in the latency's own unit.
///
/// The divisor is `depth + 1` so a chain of depth zero yields the latency
/// itself.
pub fn latency_per_block(latency: f64, chain_depth: f64) -> f64 {
    latency / (chain_depth + 1.0)
}

/// One node's line on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRow {
    pub name: String,
    pub class: Option<NodeClass>,
    pub leader: bool,
    pub chain_depth: u64,
    pub propose_block: u64,
    pub sign_block: u64,
    pub submit_block: u64,
}

impl NodeRow {
    fn new(name: &str, class: Option<NodeClass>, snapshot: &Snapshot) -> Self {
        Self {
            name: name.to_string(),
            class,
            leader: snapshot.token,
            chain_depth: snapshot.chain_depth,
            propose_block: snapshot.propose_block,
            sign_block: snapshot.sign_block,
            submit_block: snapshot.submit_block,
        }
    }
}

/// Everything derived on one aggregation tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetFrame {
    pub elapsed: Duration,
    pub current: FleetTotals,
    pub previous: FleetTotals,
    pub current_avg: FleetAverages,
    pub previous_avg: FleetAverages,
    /// Generated transactions per second since start.
    pub generated_rate: f64,
    /// Confirmed transactions per second since start.
    pub confirmed_rate: f64,
    /// Seconds of propose latency per block.
    pub propose_per_block: f64,
    /// Seconds of sign latency per block.
    pub sign_per_block: f64,
    /// Seconds of submit latency per block.
    pub submit_per_block: f64,
    /// Nodes present in `current`, sorted by name.
    pub nodes: Vec<NodeRow>,
}

impl FleetFrame {
    /// Derive a frame from the current and previous snapshot maps.
    pub fn compute(
        current: &BTreeMap<String, Snapshot>,
        previous: &BTreeMap<String, Snapshot>,
        divisors: &Divisors,
        roster: &Roster,
        elapsed: Duration,
    ) -> Result<Self, AggregateError> {
        let current_totals = FleetTotals::sum(current.values());
        let previous_totals = FleetTotals::sum(previous.values());
        let current_avg = divisors.average(&current_totals)?;
        let previous_avg = divisors.average(&previous_totals)?;

        // Latencies are reported in milliseconds.
        let per_block = |latency: f64| latency_per_block(latency, current_avg.chain_depth) / 1000.0;

        let nodes = current
            .iter()
            .map(|(name, snapshot)| NodeRow::new(name, roster.class_of(name), snapshot))
            .collect();

        Ok(Self {
            elapsed,
            current: current_totals,
            previous: previous_totals,
            current_avg,
            previous_avg,
            generated_rate: throughput(current_avg.generated, elapsed),
            confirmed_rate: throughput(current_avg.confirmed, elapsed),
            propose_per_block: per_block(current_avg.propose_latency),
            sign_per_block: per_block(current_avg.sign_latency),
            submit_per_block: per_block(current_avg.submit_latency),
            nodes,
        })
    }

    /// Fleet average chain depth.
    pub fn chain_depth(&self) -> f64 {
        self.current_avg.chain_depth
    }

    /// Fleet-wide gas consumed.
    pub fn gas(&self) -> u128 {
        self.current.gas
    }
}
