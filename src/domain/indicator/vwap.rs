//! Volume Weighted Average Price.
//!
//! VWAP = Σ(TP × V) / ΣV with TP = (H + L + C) / 3, falling back to TP while
//! the accumulated volume is zero.
//!
//! - [`Vwap`] restarts the sums at each session, a UTC calendar day shifted by
//!   a configurable offset.
//! - [`AnchoredVwap`] accumulates from the first bar at or after an anchor
//!   timestamp; earlier rows are NaN.

use crate::domain::indicator::{Indicator, adopt_line_tail, begin_update};
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::{Carry, LineSeries};

pub const DAY_MS: i64 = 86_400_000;
const HOUR_MS: i64 = 3_600_000;

/// Running sums of the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VwapState {
    session: Option<i64>,
    pv: f64,
    volume: f64,
}

impl VwapState {
    fn accumulate(&mut self, source: &BarSeries, index: usize) -> f64 {
        let tp = source.typical_price(index);
        let volume = source.volume(index);
        self.pv += tp * volume;
        self.volume += volume;
        if self.volume > 0.0 {
            self.pv / self.volume
        } else {
            tp
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vwap {
    session_offset_ms: i64,
    name: String,
}

impl Default for Vwap {
    fn default() -> Self {
        Self::new()
    }
}

impl Vwap {
    pub fn new() -> Self {
        Self {
            session_offset_ms: 0,
            name: "VWAP".to_string(),
        }
    }

    /// Shift session boundaries, e.g. `-5 * 3_600_000` for sessions starting
    /// at 05:00 UTC.
    pub fn with_session_offset(mut self, offset_ms: i64) -> Self {
        self.session_offset_ms = offset_ms;
        self.name = match offset_ms {
            0 => "VWAP".to_string(),
            ms if ms % HOUR_MS == 0 => format!("VWAP({:+}h)", ms / HOUR_MS),
            ms => format!("VWAP({ms:+}ms)"),
        };
        self
    }

    fn session_of(&self, timestamp: i64) -> i64 {
        timestamp.saturating_add(self.session_offset_ms).div_euclid(DAY_MS)
    }

    fn run(&self, output: &mut LineSeries, source: &BarSeries, start: usize, mut state: VwapState) {
        for i in start..source.len() {
            let timestamp = source.timestamps()[i];
            let session = self.session_of(timestamp);
            if state.session != Some(session) {
                state = VwapState {
                    session: Some(session),
                    ..VwapState::default()
                };
            }
            output.push_row(timestamp, state.accumulate(source, i));
        }
        output.set_carry(Carry::Vwap(state));
    }
}

impl Indicator for Vwap {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        1
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let mut output = LineSeries::new(&self.name);
        self.run(&mut output, source, 0, VwapState::default());
        output
    }

    fn update(&self, output: &mut LineSeries, source: &BarSeries, from_index: usize) {
        let Some(start) = begin_update(output, source, from_index) else {
            return;
        };
        match output.take_carry() {
            Some(Carry::Vwap(state)) if output.name() == self.name => {
                self.run(output, source, start, state)
            }
            _ => adopt_line_tail(output, &self.calculate(source), start),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnchoredVwap {
    anchor: i64,
    name: String,
}

impl AnchoredVwap {
    pub fn new(anchor_timestamp: i64) -> Self {
        Self {
            anchor: anchor_timestamp,
            name: format!("AVWAP({anchor_timestamp})"),
        }
    }

    fn run(&self, output: &mut LineSeries, source: &BarSeries, start: usize, mut state: VwapState) {
        let anchor = source.index_at_or_after(self.anchor).unwrap_or(source.len());
        for i in start..source.len() {
            let value = if i < anchor {
                f64::NAN
            } else {
                state.accumulate(source, i)
            };
            output.push_row(source.timestamps()[i], value);
        }
        output.set_carry(Carry::Vwap(state));
    }
}

impl Indicator for AnchoredVwap {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        1
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let mut output = LineSeries::new(&self.name);
        self.run(&mut output, source, 0, VwapState::default());
        output
    }

    fn update(&self, output: &mut LineSeries, source: &BarSeries, from_index: usize) {
        let Some(start) = begin_update(output, source, from_index) else {
            return;
        };
        match output.take_carry() {
            Some(Carry::Vwap(state)) if output.name() == self.name => {
                self.run(output, source, start, state)
            }
            _ => adopt_line_tail(output, &self.calculate(source), start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::wave_bars;
    use crate::domain::indicator::test_support::{prefix, same_values};
    use crate::domain::ohlcv::Bar;

    fn bar(timestamp: i64, price: f32, volume: f32) -> Bar {
        Bar::new(timestamp, price, price, price, price, volume)
    }

    #[test]
    fn vwap_weights_by_volume() {
        let source = BarSeries::from_bars([bar(0, 10.0, 100.0), bar(HOUR_MS, 20.0, 300.0)]).unwrap();
        let series = Vwap::new().calculate(&source);
        assert_eq!(series.values()[0], 10.0);
        assert!((series.values()[1] - 17.5).abs() < 1e-10);
    }

    #[test]
    fn vwap_resets_each_day() {
        let source = BarSeries::from_bars([
            bar(20 * HOUR_MS, 10.0, 100.0),
            bar(23 * HOUR_MS, 20.0, 100.0),
            bar(25 * HOUR_MS, 40.0, 100.0),
        ])
        .unwrap();
        let series = Vwap::new().calculate(&source);
        assert!((series.values()[1] - 15.0).abs() < 1e-10);
        assert_eq!(series.values()[2], 40.0);
    }

    #[test]
    fn vwap_session_offset_moves_boundary() {
        let source = BarSeries::from_bars([
            bar(20 * HOUR_MS, 10.0, 100.0),
            bar(25 * HOUR_MS, 40.0, 100.0),
        ])
        .unwrap();
        // both bars fall in the same session once it starts at 18:00 UTC
        let series = Vwap::new()
            .with_session_offset(6 * HOUR_MS)
            .calculate(&source);
        assert!((series.values()[1] - 25.0).abs() < 1e-10);
    }

    #[test]
    fn vwap_zero_volume_uses_typical_price() {
        let source = BarSeries::from_bars([bar(0, 12.0, 0.0)]).unwrap();
        assert_eq!(Vwap::new().calculate(&source).values(), &[12.0]);
    }

    #[test]
    fn anchored_vwap_starts_at_anchor() {
        let source = BarSeries::from_bars([
            bar(0, 5.0, 100.0),
            bar(10, 10.0, 100.0),
            bar(20, 20.0, 100.0),
        ])
        .unwrap();
        let series = AnchoredVwap::new(5).calculate(&source);
        assert!(series.values()[0].is_nan());
        assert_eq!(series.values()[1], 10.0);
        assert!((series.values()[2] - 15.0).abs() < 1e-10);
    }

    #[test]
    fn anchored_vwap_after_last_bar_is_nan() {
        let source = BarSeries::from_bars([bar(0, 5.0, 100.0)]).unwrap();
        let series = AnchoredVwap::new(100).calculate(&source);
        assert!(series.values()[0].is_nan());
    }

    #[test]
    fn update_matches_calculate() {
        let full = wave_bars(40);
        for vwap in [Vwap::new(), Vwap::new().with_session_offset(12 * HOUR_MS)] {
            let mut output = vwap.calculate(&prefix(&full, 1));
            for n in 2..=40 {
                let len = output.len();
                vwap.update(&mut output, &prefix(&full, n), len);
            }
            assert!(same_values(output.values(), vwap.calculate(&full).values()));
        }

        let anchored = AnchoredVwap::new(full.timestamps()[15]);
        let mut output = anchored.calculate(&prefix(&full, 10));
        anchored.update(&mut output, &full, 10);
        assert!(same_values(output.values(), anchored.calculate(&full).values()));
    }

    #[test]
    fn name_carries_session_offset() {
        assert_eq!(Vwap::new().name(), "VWAP");
        assert_eq!(Vwap::new().with_session_offset(0).name(), "VWAP");
        assert_eq!(Vwap::new().with_session_offset(5 * HOUR_MS).name(), "VWAP(+5h)");
        assert_eq!(Vwap::new().with_session_offset(-3 * HOUR_MS).name(), "VWAP(-3h)");
        assert_eq!(Vwap::new().with_session_offset(90 * 60_000).name(), "VWAP(+5400000ms)");
    }

    #[test]
    fn update_with_other_offset_recomputes() {
        let full = wave_bars(40);
        let utc = Vwap::new();
        let shifted = Vwap::new().with_session_offset(12 * HOUR_MS);
        let mut output = utc.calculate(&prefix(&full, 20));
        shifted.update(&mut output, &full, 20);
        assert!(same_values(&output.values()[20..], &shifted.calculate(&full).values()[20..]));
    }

    #[test]
    fn session_offset_near_timestamp_limit() {
        let source = BarSeries::from_bars([
            bar(i64::MAX - 2 * HOUR_MS, 10.0, 100.0),
            bar(i64::MAX - HOUR_MS, 20.0, 100.0),
        ])
        .unwrap();
        let series = Vwap::new().with_session_offset(23 * HOUR_MS).calculate(&source);
        assert_eq!(series.len(), 2);
        assert!(series.values().iter().all(|v| v.is_finite()));

        let early = BarSeries::from_bars([bar(i64::MIN, 10.0, 100.0)]).unwrap();
        let series = Vwap::new().with_session_offset(-23 * HOUR_MS).calculate(&early);
        assert_eq!(series.values(), &[10.0]);
    }
}
