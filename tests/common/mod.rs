#![allow(dead_code)]

use barcalc::domain::ohlcv::{Bar, BarSeries};
use std::io::Write;

pub const DAY_MS: i64 = 86_400_000;

/// Bars with open = high = low = close, one per day from the epoch.
pub fn make_bars(closes: &[f64]) -> BarSeries {
    BarSeries::from_bars(closes.iter().enumerate().map(|(i, &c)| {
        Bar::new(i as i64 * DAY_MS, c as f32, c as f32, c as f32, c as f32, 1000.0)
    }))
    .unwrap()
}

/// Bars from (high, low, close) rows with open = close.
pub fn make_hlc_bars(rows: &[(f64, f64, f64)]) -> BarSeries {
    BarSeries::from_bars(rows.iter().enumerate().map(|(i, &(h, l, c))| {
        Bar::new(i as i64 * DAY_MS, c as f32, h as f32, l as f32, c as f32, 1000.0)
    }))
    .unwrap()
}

/// Deterministic trending, oscillating series with varying volume.
pub fn wave_bars(len: usize) -> BarSeries {
    BarSeries::from_bars((0..len).map(|i| {
        let x = i as f64;
        let close = 100.0 + (x * 0.45).sin() * 6.0 + (x * 0.13).cos() * 3.0 + x * 0.05;
        let high = close + 0.8 + (x * 1.7).sin().abs();
        let low = close - 0.8 - (x * 1.1).cos().abs();
        let open = low + (high - low) * (0.5 + 0.4 * (x * 0.6).sin());
        Bar::new(
            i as i64 * DAY_MS,
            open as f32,
            high as f32,
            low as f32,
            close as f32,
            800.0 + ((i * 37) % 11) as f32 * 120.0,
        )
    }))
    .unwrap()
}

/// Bars built from closes, with highs and lows spread around them.
pub fn bars_from_closes(closes: &[f64]) -> BarSeries {
    BarSeries::from_bars(closes.iter().enumerate().map(|(i, &c)| {
        let spread = 1.0 + (i % 3) as f64 * 0.5;
        Bar::new(
            i as i64 * DAY_MS,
            c as f32,
            (c + spread) as f32,
            (c - spread) as f32,
            c as f32,
            500.0 + i as f32,
        )
    }))
    .unwrap()
}

pub fn prefix(source: &BarSeries, n: usize) -> BarSeries {
    BarSeries::from_bars((0..n).filter_map(|i| source.bar(i))).unwrap()
}

/// Bit-for-bit equality treating NaN == NaN.
pub fn same_values(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x.to_bits() == y.to_bits() || (x.is_nan() && y.is_nan()))
}

/// Element-wise closeness with matching NaN positions.
pub fn assert_values_close(actual: &[f64], expected: &[f64], context: &str) {
    assert_eq!(actual.len(), expected.len(), "{context}: length");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        if e.is_nan() {
            assert!(a.is_nan(), "{context}[{i}]: expected NaN, got {a}");
        } else {
            assert!(
                approx::relative_eq!(*a, *e, epsilon = 1e-9, max_relative = 1e-9),
                "{context}[{i}]: {a} != {e}"
            );
        }
    }
}

/// CSV text in the loader's millisecond format.
pub fn bars_csv(source: &BarSeries) -> String {
    let mut text = String::from("timestamp,open,high,low,close,volume\n");
    for i in 0..source.len() {
        if let Some(bar) = source.bar(i) {
            text.push_str(&format!(
                "{},{},{},{},{},{}\n",
                bar.timestamp, bar.open, bar.high, bar.low, bar.close, bar.volume
            ));
        }
    }
    text
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
