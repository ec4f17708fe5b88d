//! Offline charts from a node's series store.
//!
//! Counter fields are plotted as per-second rates between consecutive rows,
//! gauges as raw values. The delay chart plots, per role, the latency added
//! between two rows divided by the events completed in that span.

use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use plotters::{
    element::PathElement,
    prelude::{ChartBuilder, IntoDrawingArea, SVGBackend},
    series::LineSeries,
    style::{Color, RGBColor, BLACK, BLUE, GREEN, RED, WHITE},
};

use crate::error::StoreError;
use crate::store::{SeriesData, SeriesRow, SeriesStore};

/// Default time span of a chart, in seconds.
pub const DEFAULT_PLOT_DURATION: u64 = 600;

const PALETTE: [RGBColor; 3] = [RED, BLUE, GREEN];

/// What to chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotContent {
    TxRate,
    Confirm,
    Depth,
    Delay,
    Gas,
}

impl PlotContent {
    pub fn title(&self) -> &'static str {
        match self {
            PlotContent::TxRate => "Generated transactions",
            PlotContent::Confirm => "Confirmed transactions",
            PlotContent::Depth => "Chain depth",
            PlotContent::Delay => "Delay per event",
            PlotContent::Gas => "Gas",
        }
    }

    pub fn y_desc(&self) -> &'static str {
        match self {
            PlotContent::TxRate | PlotContent::Confirm => "tx/s",
            PlotContent::Depth => "blocks",
            PlotContent::Delay => "s",
            PlotContent::Gas => "gas/s",
        }
    }
}

impl FromStr for PlotContent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txrate" => Ok(PlotContent::TxRate),
            "confirm" => Ok(PlotContent::Confirm),
            "depth" => Ok(PlotContent::Depth),
            "delay" => Ok(PlotContent::Delay),
            "gas" => Ok(PlotContent::Gas),
            other => Err(format!(
                "unknown content '{}' (expected txrate, confirm, depth, delay or gas)",
                other
            )),
        }
    }
}

/// One line of a chart. `x` is seconds since the window start.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// Rows with `start <= timestamp < start + duration`.
///
/// Without `start` the window opens at the first stored row.
pub fn window(data: &SeriesData, start: Option<u64>, duration: u64) -> &[SeriesRow] {
    let Some(first) = data.rows.first() else {
        return &[];
    };
    let start = start.unwrap_or(first.timestamp);
    let end = start.saturating_add(duration);

    let lo = data.rows.partition_point(|r| r.timestamp < start);
    let hi = data.rows.partition_point(|r| r.timestamp < end);
    &data.rows[lo..hi.max(lo)]
}

/// Derive the chart lines for `content` over a window of rows.
pub fn derive(
    data: &SeriesData,
    content: PlotContent,
    start: Option<u64>,
    duration: u64,
) -> Result<Vec<PlotSeries>, StoreError> {
    let rows = window(data, start, duration);
    let field = |name: &str| {
        data.header
            .index_of(name)
            .ok_or_else(|| StoreError::Format(format!("store has no field '{}'", name)))
    };

    let series = match content {
        PlotContent::TxRate => vec![counter_rate("generated", rows, field("generated_tx")?)],
        PlotContent::Confirm => vec![counter_rate("confirmed", rows, field("confirmed_tx")?)],
        PlotContent::Gas => vec![counter_rate("gas", rows, field("gas")?)],
        PlotContent::Depth => vec![gauge("chain depth", rows, field("chain_depth")?)],
        PlotContent::Delay => vec![
            delay(
                "propose",
                rows,
                field("propose_latency")?,
                field("propose_num")?,
            ),
            delay("sign", rows, field("sign_latency")?, field("sign_num")?),
            delay("submit", rows, field("submit_latency")?, field("submit_num")?),
        ],
    };
    Ok(series)
}

fn origin(rows: &[SeriesRow]) -> u64 {
    rows.first().map(|r| r.timestamp).unwrap_or_default()
}

fn counter_rate(label: &str, rows: &[SeriesRow], index: usize) -> PlotSeries {
    let t0 = origin(rows);
    let points = rows
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            let dt = b.timestamp.checked_sub(a.timestamp).filter(|dt| *dt > 0)?;
            // A counter that went backwards was reset; leave a gap
            let dv = b.values[index].checked_sub(a.values[index])?;
            Some(((b.timestamp - t0) as f64, dv as f64 / dt as f64))
        })
        .collect();
    PlotSeries {
        label: label.to_string(),
        points,
    }
}

fn gauge(label: &str, rows: &[SeriesRow], index: usize) -> PlotSeries {
    let t0 = origin(rows);
    PlotSeries {
        label: label.to_string(),
        points: rows
            .iter()
            .map(|r| ((r.timestamp - t0) as f64, r.values[index] as f64))
            .collect(),
    }
}

fn delay(label: &str, rows: &[SeriesRow], latency: usize, count: usize) -> PlotSeries {
    let t0 = origin(rows);
    let points = rows
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            let events = b.values[count].checked_sub(a.values[count]).filter(|n| *n > 0)?;
            let added = b.values[latency].checked_sub(a.values[latency])?;
            // Latency is stored in milliseconds
            let seconds = added as f64 / events as f64 / 1000.0;
            Some(((b.timestamp - t0) as f64, seconds))
        })
        .collect();
    PlotSeries {
        label: label.to_string(),
        points,
    }
}

/// Draw `series` as an SVG line chart at `output`.
pub fn render_svg(
    output: &Path,
    caption: &str,
    y_desc: &str,
    series: &[PlotSeries],
) -> Result<()> {
    let x_max = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.0))
        .fold(1.0_f64, f64::max);
    let y_max = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.1))
        .fold(0.0_f64, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let root = SVGBackend::new(output, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.margin(10, 10, 10, 10);

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 20))
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc(y_desc)
        .draw()?;

    for (i, line) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        chart
            .draw_series(LineSeries::new(line.points.iter().copied(), color))?
            .label(line.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()
        .map_err(|e| anyhow!("failed to write {}: {}", output.display(), e))?;
    Ok(())
}

/// Read `<store>`, derive `content` and write the chart to `output`.
pub fn plot_node(
    store: &Path,
    node: &str,
    content: PlotContent,
    start: Option<u64>,
    duration: u64,
    output: &Path,
) -> Result<()> {
    let data = SeriesStore::read(store)
        .with_context(|| format!("cannot read series store {}", store.display()))?;
    let series = derive(&data, content, start, duration)?;
    if series.iter().all(|s| s.points.is_empty()) {
        tracing::warn!(node, "no data points in the requested window");
    }

    let caption = format!("{} - {}", node, content.title());
    render_svg(output, &caption, content.y_desc(), &series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{telemetry_fields, SeriesHeader};
    use tempfile::tempdir;

    fn row(timestamp: u64, generated: u64, depth: u64, sign_lat: u64, sign_num: u64) -> SeriesRow {
        // generated, confirmed, depth, propose/sign/submit latency, gas, propose/sign/submit num
        SeriesRow {
            timestamp,
            values: vec![generated, generated / 2, depth, 0, sign_lat, 0, 0, 0, sign_num, 0],
        }
    }

    fn data(rows: Vec<SeriesRow>) -> SeriesData {
        SeriesData {
            header: SeriesHeader {
                step: 1,
                heartbeat: 2,
                rows: 3600,
                fields: telemetry_fields(),
            },
            rows,
        }
    }

    #[test]
    fn test_parse_content() {
        assert_eq!("txrate".parse::<PlotContent>().unwrap(), PlotContent::TxRate);
        assert_eq!("Delay".parse::<PlotContent>().unwrap(), PlotContent::Delay);
        assert!("mining".parse::<PlotContent>().is_err());
    }

    #[test]
    fn test_window_bounds() {
        let d = data((100..110).map(|t| row(t, 0, 0, 0, 0)).collect());

        let all = window(&d, None, 600);
        assert_eq!(all.len(), 10);

        let part = window(&d, Some(103), 4);
        let ts: Vec<u64> = part.iter().map(|r| r.timestamp).collect();
        assert_eq!(ts, vec![103, 104, 105, 106]);

        assert!(window(&d, Some(500), 10).is_empty());
        assert!(window(&data(vec![]), None, 10).is_empty());
    }

    #[test]
    fn test_counter_rate() {
        let d = data(vec![row(100, 0, 0, 0, 0), row(102, 20, 0, 0, 0), row(103, 25, 0, 0, 0)]);
        let series = derive(&d, PlotContent::TxRate, None, 600).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points, vec![(2.0, 10.0), (3.0, 5.0)]);
    }

    #[test]
    fn test_counter_reset_leaves_gap() {
        let d = data(vec![row(100, 50, 0, 0, 0), row(101, 10, 0, 0, 0), row(102, 12, 0, 0, 0)]);
        let series = derive(&d, PlotContent::TxRate, None, 600).unwrap();
        assert_eq!(series[0].points, vec![(2.0, 2.0)]);
    }

    #[test]
    fn test_depth_is_raw_gauge() {
        let d = data(vec![row(100, 0, 3, 0, 0), row(101, 0, 4, 0, 0)]);
        let series = derive(&d, PlotContent::Depth, None, 600).unwrap();
        assert_eq!(series[0].points, vec![(0.0, 3.0), (1.0, 4.0)]);
    }

    #[test]
    fn test_delay_per_event() {
        let d = data(vec![
            row(100, 0, 0, 1000, 1),
            row(101, 0, 0, 4000, 3),
            // No new sign events: no point
            row(102, 0, 0, 4000, 3),
        ]);
        let series = derive(&d, PlotContent::Delay, None, 600).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[1].label, "sign");
        // 3000ms over 2 events
        assert_eq!(series[1].points, vec![(1.0, 1.5)]);
        assert!(series[0].points.is_empty());
    }

    #[test]
    fn test_missing_field_is_error() {
        let mut d = data(vec![]);
        d.header.fields.truncate(2);
        assert!(derive(&d, PlotContent::Gas, None, 600).is_err());
    }

    #[test]
    fn test_render_svg() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("chart.svg");
        let series = vec![PlotSeries {
            label: "generated".to_string(),
            points: vec![(1.0, 2.0), (2.0, 4.0)],
        }];

        render_svg(&output, "node_1 - Generated transactions", "tx/s", &series).unwrap();

        let svg = std::fs::read_to_string(&output).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("node_1"));
    }
}
