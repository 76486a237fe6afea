//! Chart-ready series for a sensor's readings.
//!
//! The detail view publishes a `ChartData` once per completed readings fetch;
//! renderers (the terminal sparklines here) only ever draw from that value.

#[cfg(test)]
#[path = "chart_test.rs"]
mod chart_test;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::net::types::Reading;

pub const TEMPERATURE_LABEL: &str = "Temperature (°C)";
pub const HUMIDITY_LABEL: &str = "Humidity (%)";

const AXIS_FORMAT: &str = "%m-%d %H:%M";
const TOOLTIP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";
const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: &'static str,
    pub values: Vec<f64>,
}

impl Series {
    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// One block character per value, scaled between the series min and max.
    /// A flat series renders at mid height.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn sparkline(&self) -> String {
        let (Some(min), Some(max)) = (self.min(), self.max()) else {
            return String::new();
        };
        let span = max - min;
        self.values
            .iter()
            .map(|value| {
                if span <= f64::EPSILON {
                    return BARS[BARS.len() / 2];
                }
                let scaled = ((value - min) / span * (BARS.len() - 1) as f64).round();
                let idx = (scaled as usize).min(BARS.len() - 1);
                BARS[idx]
            })
            .collect()
    }
}

/// Readings in ascending time order, split into the two plotted series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub timestamps: Vec<DateTime<Utc>>,
    pub temperature: Series,
    pub humidity: Series,
}

impl ChartData {
    /// Build from readings in any order; points are sorted by timestamp.
    pub fn from_readings(readings: &[Reading]) -> Self {
        let mut sorted: Vec<&Reading> = readings.iter().collect();
        sorted.sort_by_key(|r| r.timestamp);
        Self {
            labels: sorted.iter().map(|r| r.timestamp.format(AXIS_FORMAT).to_string()).collect(),
            timestamps: sorted.iter().map(|r| r.timestamp).collect(),
            temperature: Series { label: TEMPERATURE_LABEL, values: sorted.iter().map(|r| r.temperature).collect() },
            humidity: Series { label: HUMIDITY_LABEL, values: sorted.iter().map(|r| r.humidity).collect() },
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Hover title for point `index`.
    pub fn tooltip_title(&self, index: usize) -> Option<String> {
        self.timestamps.get(index).map(|ts| ts.format(TOOLTIP_FORMAT).to_string())
    }

    /// Multi-line text chart: one sparkline per series with its range.
    pub fn render_text(&self) -> String {
        if self.is_empty() {
            return "No readings to chart.".to_owned();
        }
        let mut out = String::new();
        for series in [&self.temperature, &self.humidity] {
            let (min, max) = (series.min().unwrap_or_default(), series.max().unwrap_or_default());
            out.push_str(&format!("{:<18} {}  [{min:.1} .. {max:.1}]\n", series.label, series.sparkline()));
        }
        if let (Some(first), Some(last)) = (self.labels.first(), self.labels.last()) {
            out.push_str(&format!("{:<18} {first} -> {last}\n", "Time (UTC)"));
        }
        out
    }
}
