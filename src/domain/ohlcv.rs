//! OHLCV bars and the columnar bar container indicators read from.

use crate::domain::error::BarError;

/// One OHLCV record. Prices and volume are stored single precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f32,
    pub high: f32,
    pub low: f32,
    pub close: f32,
    pub volume: f32,
}

impl Bar {
    pub fn new(timestamp: i64, open: f32, high: f32, low: f32, close: f32, volume: f32) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high as f64 + self.low as f64 + self.close as f64) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high as f64 - self.low as f64;
        let hc = (self.high as f64 - prev_close).abs();
        let lc = (self.low as f64 - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Append-only bar sequence stored column by column.
///
/// Timestamps are strictly increasing. Indicators only read from it; the
/// owner appends closed bars with [`BarSeries::push`] and refreshes a
/// still-forming bar with [`BarSeries::update_last`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    timestamps: Vec<i64>,
    open: Vec<f32>,
    high: Vec<f32>,
    low: Vec<f32>,
    close: Vec<f32>,
    volume: Vec<f32>,
}

impl BarSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            open: Vec::with_capacity(capacity),
            high: Vec::with_capacity(capacity),
            low: Vec::with_capacity(capacity),
            close: Vec::with_capacity(capacity),
            volume: Vec::with_capacity(capacity),
        }
    }

    pub fn from_bars<I>(bars: I) -> Result<Self, BarError>
    where
        I: IntoIterator<Item = Bar>,
    {
        let iter = bars.into_iter();
        let mut series = Self::with_capacity(iter.size_hint().0);
        for bar in iter {
            series.push(bar)?;
        }
        Ok(series)
    }

    pub fn push(&mut self, bar: Bar) -> Result<(), BarError> {
        if let Some(&last) = self.timestamps.last() {
            if bar.timestamp <= last {
                return Err(BarError::NonIncreasingTimestamp {
                    timestamp: bar.timestamp,
                    last,
                });
            }
        }
        self.timestamps.push(bar.timestamp);
        self.open.push(bar.open);
        self.high.push(bar.high);
        self.low.push(bar.low);
        self.close.push(bar.close);
        self.volume.push(bar.volume);
        Ok(())
    }

    /// Replace the prices of the last bar. The timestamp must match.
    pub fn update_last(&mut self, bar: Bar) -> Result<(), BarError> {
        let last = *self.timestamps.last().ok_or(BarError::Empty)?;
        if bar.timestamp != last {
            return Err(BarError::TimestampMismatch {
                timestamp: bar.timestamp,
                last,
            });
        }
        let i = self.timestamps.len() - 1;
        self.open[i] = bar.open;
        self.high[i] = bar.high;
        self.low[i] = bar.low;
        self.close[i] = bar.close;
        self.volume[i] = bar.volume;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn bar(&self, index: usize) -> Option<Bar> {
        Some(Bar {
            timestamp: *self.timestamps.get(index)?,
            open: self.open[index],
            high: self.high[index],
            low: self.low[index],
            close: self.close[index],
            volume: self.volume[index],
        })
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn opens(&self) -> &[f32] {
        &self.open
    }

    pub fn highs(&self) -> &[f32] {
        &self.high
    }

    pub fn lows(&self) -> &[f32] {
        &self.low
    }

    pub fn closes(&self) -> &[f32] {
        &self.close
    }

    pub fn volumes(&self) -> &[f32] {
        &self.volume
    }

    pub fn open(&self, index: usize) -> f64 {
        column_value(&self.open, index)
    }

    pub fn high(&self, index: usize) -> f64 {
        column_value(&self.high, index)
    }

    pub fn low(&self, index: usize) -> f64 {
        column_value(&self.low, index)
    }

    pub fn close(&self, index: usize) -> f64 {
        column_value(&self.close, index)
    }

    pub fn volume(&self, index: usize) -> f64 {
        column_value(&self.volume, index)
    }

    pub fn typical_price(&self, index: usize) -> f64 {
        (self.high(index) + self.low(index) + self.close(index)) / 3.0
    }

    /// True range against the previous close; NaN at bar 0.
    pub fn true_range(&self, index: usize) -> f64 {
        if index == 0 {
            return f64::NAN;
        }
        match self.bar(index) {
            Some(bar) => bar.true_range(self.close(index - 1)),
            None => f64::NAN,
        }
    }

    /// Last bar whose timestamp is `<= timestamp`.
    pub fn index_at_or_before(&self, timestamp: i64) -> Option<usize> {
        let after = self.timestamps.partition_point(|&t| t <= timestamp);
        after.checked_sub(1)
    }

    /// First bar whose timestamp is `>= timestamp`.
    pub fn index_at_or_after(&self, timestamp: i64) -> Option<usize> {
        let at = self.timestamps.partition_point(|&t| t < timestamp);
        (at < self.timestamps.len()).then_some(at)
    }
}

fn column_value(column: &[f32], index: usize) -> f64 {
    column.get(index).map_or(f64::NAN, |&v| v as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar::new(1_700_000_000_000, 100.0, 110.0, 90.0, 105.0, 50_000.0)
    }

    fn series_at(timestamps: &[i64]) -> BarSeries {
        BarSeries::from_bars(
            timestamps
                .iter()
                .map(|&t| Bar::new(t, 1.0, 2.0, 0.5, 1.5, 10.0)),
        )
        .unwrap()
    }

    #[test]
    fn typical_price() {
        let bar = sample_bar();
        let expected = (110.0 + 90.0 + 105.0) / 3.0;
        assert!((bar.typical_price() - expected).abs() < 1e-10);
    }

    #[test]
    fn true_range_hl_dominates() {
        assert!((sample_bar().true_range(100.0) - 20.0).abs() < 1e-10);
    }

    #[test]
    fn true_range_gap_up() {
        // |110-70|=40 beats high-low=20
        assert!((sample_bar().true_range(70.0) - 40.0).abs() < 1e-10);
    }

    #[test]
    fn true_range_gap_down() {
        assert!((sample_bar().true_range(130.0) - 40.0).abs() < 1e-10);
    }

    #[test]
    fn push_rejects_non_increasing_timestamp() {
        let mut series = series_at(&[10, 20]);
        let err = series
            .push(Bar::new(20, 1.0, 1.0, 1.0, 1.0, 1.0))
            .unwrap_err();
        assert_eq!(
            err,
            BarError::NonIncreasingTimestamp {
                timestamp: 20,
                last: 20
            }
        );
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn update_last_replaces_prices() {
        let mut series = series_at(&[10, 20]);
        series
            .update_last(Bar::new(20, 3.0, 4.0, 2.0, 3.5, 99.0))
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.close(1), 3.5);
        assert_eq!(series.volume(1), 99.0);
        assert_eq!(series.close(0), 1.5);
    }

    #[test]
    fn update_last_requires_matching_timestamp() {
        let mut series = series_at(&[10]);
        assert!(matches!(
            series.update_last(Bar::new(11, 1.0, 1.0, 1.0, 1.0, 1.0)),
            Err(BarError::TimestampMismatch { .. })
        ));
        let mut empty = BarSeries::new();
        assert_eq!(
            empty.update_last(Bar::new(11, 1.0, 1.0, 1.0, 1.0, 1.0)),
            Err(BarError::Empty)
        );
    }

    #[test]
    fn out_of_range_access_is_nan() {
        let series = series_at(&[10]);
        assert!(series.close(5).is_nan());
        assert!(series.bar(5).is_none());
    }

    #[test]
    fn true_range_bar_zero_is_nan() {
        let series = series_at(&[10, 20]);
        assert!(series.true_range(0).is_nan());
        assert!((series.true_range(1) - 1.5).abs() < 1e-10);
    }

    #[test]
    fn timestamp_search() {
        let series = series_at(&[10, 20, 30]);
        assert_eq!(series.index_at_or_before(5), None);
        assert_eq!(series.index_at_or_before(10), Some(0));
        assert_eq!(series.index_at_or_before(25), Some(1));
        assert_eq!(series.index_at_or_before(99), Some(2));
        assert_eq!(series.index_at_or_after(5), Some(0));
        assert_eq!(series.index_at_or_after(20), Some(1));
        assert_eq!(series.index_at_or_after(21), Some(2));
        assert_eq!(series.index_at_or_after(31), None);
    }
}
