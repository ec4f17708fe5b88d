//! Dashboard rendering.
//!
//! The aggregator hands every computed [`FleetFrame`] to a [`Dashboard`].
//! Two renderers exist:
//!
//! - [`TerminalDashboard`]: full-screen ratatui view
//! - [`PlainDashboard`]: clear / move-cursor / print / flush over any writer
//!
//! Both show the same figures, built by [`overview_lines`] and
//! [`node_line`].

pub mod plain;
pub mod terminal;
pub mod theme;

pub use plain::PlainDashboard;
pub use terminal::TerminalDashboard;
pub use theme::Theme;

use crate::data::duration::format_elapsed;
use crate::data::{FleetFrame, NodeRow};

/// A frame-drawing surface.
///
/// Drawing never feeds anything back to the aggregator; a failed draw is
/// logged and the next tick draws again.
pub trait Dashboard: Send {
    fn draw(&mut self, frame: &FleetFrame) -> std::io::Result<()>;
}

/// Overview figures as `(label, value)` pairs.
pub fn overview_lines(frame: &FleetFrame) -> Vec<(&'static str, String)> {
    vec![
        ("Telematics duration", format_elapsed(frame.elapsed)),
        ("Generated transaction", format!("{:8.1} tx/s", frame.generated_rate)),
        ("Confirmed transaction", format!("{:8.1} tx/s", frame.confirmed_rate)),
        ("Chain depth", format!("{:8.1}", frame.chain_depth())),
        ("Gas", format!("{:8}", frame.gas())),
        ("latency - propose", format!("{:8.3} s", frame.propose_per_block)),
        ("latency - sign", format!("{:8.3} s", frame.sign_per_block)),
        ("latency - submit", format!("{:8.3} s", frame.submit_per_block)),
    ]
}

/// Node label with its leadership marker, e.g. `node_1(*)`.
pub fn node_label(row: &NodeRow) -> String {
    format!("{}({})", row.name, if row.leader { "*" } else { " " })
}

/// One plain-text node line.
pub fn node_line(row: &NodeRow) -> String {
    format!(
        "{:<16} {:<6} {:>8} {:>12} {:>12} {:>12}",
        node_label(row),
        row.class.map(|c| c.label()).unwrap_or("-"),
        row.chain_depth,
        row.propose_block,
        row.sign_block,
        row.submit_block,
    )
}

/// Header matching [`node_line`] columns.
pub fn node_header() -> String {
    format!(
        "{:<16} {:<6} {:>8} {:>12} {:>12} {:>12}",
        "Nodes", "Class", "Depth", "Propose(id)", "Sign(id)", "Submit(id)"
    )
}
