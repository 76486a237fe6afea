use chrono::TimeZone;

use super::*;

fn reading(id: i64, temperature: f64, humidity: f64, hour: u32) -> Reading {
    Reading {
        id,
        sensor_id: 7,
        temperature,
        humidity,
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
    }
}

#[test]
fn points_are_sorted_ascending_by_timestamp() {
    let data = ChartData::from_readings(&[reading(3, 23.0, 50.0, 12), reading(1, 21.0, 40.0, 10), reading(2, 22.0, 45.0, 11)]);
    assert_eq!(data.len(), 3);
    assert_eq!(data.temperature.values, vec![21.0, 22.0, 23.0]);
    assert_eq!(data.humidity.values, vec![40.0, 45.0, 50.0]);
    assert_eq!(data.labels, vec!["03-01 10:00", "03-01 11:00", "03-01 12:00"]);
    assert!(data.timestamps.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn series_labels_and_tooltips() {
    let data = ChartData::from_readings(&[reading(1, 21.0, 40.0, 10)]);
    assert_eq!(data.temperature.label, "Temperature (°C)");
    assert_eq!(data.humidity.label, "Humidity (%)");
    assert_eq!(data.tooltip_title(0).as_deref(), Some("2024-03-01 10:00:00 UTC"));
    assert_eq!(data.tooltip_title(1), None);
}

#[test]
fn sparkline_spans_min_to_max() {
    let series = Series { label: TEMPERATURE_LABEL, values: vec![0.0, 7.0, 3.5] };
    let line = series.sparkline();
    assert_eq!(line.chars().count(), 3);
    assert_eq!(line.chars().next(), Some('▁'));
    assert_eq!(line.chars().nth(1), Some('█'));
}

#[test]
fn flat_series_renders_mid_height() {
    let series = Series { label: HUMIDITY_LABEL, values: vec![40.0, 40.0] };
    assert_eq!(series.sparkline(), "▅▅");
}

#[test]
fn empty_chart_renders_placeholder() {
    let data = ChartData::from_readings(&[]);
    assert!(data.is_empty());
    assert_eq!(data.temperature.sparkline(), "");
    assert_eq!(data.render_text(), "No readings to chart.");
}

#[test]
fn render_text_includes_both_series() {
    let data = ChartData::from_readings(&[reading(1, 21.0, 40.0, 10), reading(2, 25.0, 60.0, 11)]);
    let text = data.render_text();
    assert!(text.contains("Temperature (°C)"));
    assert!(text.contains("[21.0 .. 25.0]"));
    assert!(text.contains("Humidity (%)"));
    assert!(text.contains("03-01 10:00 -> 03-01 11:00"));
}
