//! Text mirror of the latest measurement for the on-device display.
//!
//! The panel is a 128x64 OLED: four rows of 21 characters. Rendering is kept
//! separate from the sink so the same lines can go to the log or to a panel.

use crate::error::Result;
use crate::sensors::data::{DataSource, LastMeasurement, Sample};
use tracing::info;

/// Characters per display row.
pub const DISPLAY_COLUMNS: usize = 21;

/// Rows on the display.
pub const DISPLAY_ROWS: usize = 4;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARK_MISSING: char = '·';

/// Destination for rendered display rows.
pub trait DisplaySink: Send {
    fn show(&mut self, lines: &[String]) -> Result<()>;
}

/// Sink that writes rows to the log.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn show(&mut self, lines: &[String]) -> Result<()> {
        info!(target: "display", "{}", lines.join(" | "));
        Ok(())
    }
}

/// Render a measurement into at most [`DISPLAY_ROWS`] rows.
pub fn render(measurement: &LastMeasurement) -> Vec<String> {
    let marker = match measurement.source() {
        DataSource::Measured => "",
        DataSource::Simulated => " (sim)",
        DataSource::Degraded => " (degraded)",
    };

    let lines = match measurement {
        LastMeasurement::Distance(r) => vec![
            format!("DISTANCE{}", marker),
            format!("{:.2} cm", r.mean_cm),
            format!("s {:.2} T {:.1}C", r.stddev_cm, r.ambient_temp_c),
            sparkline(&r.samples),
        ],
        LastMeasurement::Shape(r) => vec![
            format!("SHAPE{}", marker),
            r.label.to_string(),
            format!("m {:.2} s {:.2}", r.mean_cm, r.stddev_cm),
            sparkline(&r.samples),
        ],
        LastMeasurement::Material(r) => vec![
            format!("MATERIAL{}", marker),
            r.label.to_string(),
            format!("s {:.2} acc {:.0}%", r.stddev_cm, r.accuracy),
            sparkline(&r.samples),
        ],
    };

    lines
        .into_iter()
        .take(DISPLAY_ROWS)
        .map(|line| line.chars().take(DISPLAY_COLUMNS).collect())
        .collect()
}

/// One block character per sample, scaled between the batch minimum and
/// maximum. Only the most recent samples that fit on a row are drawn.
pub fn sparkline(samples: &[Sample]) -> String {
    let shown = &samples[samples.len().saturating_sub(DISPLAY_COLUMNS)..];
    let values: Vec<f64> = shown.iter().filter_map(Sample::value).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    let top = (SPARK_LEVELS.len() - 1) as f64;

    shown
        .iter()
        .map(|sample| match sample.value() {
            None => SPARK_MISSING,
            Some(_) if span <= f64::EPSILON => SPARK_LEVELS[0],
            Some(v) => SPARK_LEVELS[(((v - min) / span) * top).round() as usize],
        })
        .collect()
}
