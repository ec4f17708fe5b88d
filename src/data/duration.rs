use std::time::Duration;

use anyhow::{bail, Result};

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("m", 60_000_000_000.0),
    ("s", 1_000_000_000.0),
];

/// Parse interval strings like "2", "1.5s", "500ms", "1m".
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    if let Ok(secs) = s.parse::<f64>() {
        return from_secs(secs, s);
    }

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            // "ms" ends with "s"; skip a match that leaves a unit letter behind
            let Ok(val) = val_str.parse::<f64>() else {
                continue;
            };
            return from_secs(val * multiplier / 1_000_000_000.0, s);
        }
    }

    bail!("Unknown duration format: {}", s)
}

fn from_secs(secs: f64, original: &str) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        bail!("Invalid duration: {}", original);
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Format elapsed time for the dashboard header, e.g. "1h 02m 03s".
pub fn format_elapsed(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}
