//! Volume delta and cumulative delta.
//!
//! Each bar's volume is split into buying and selling by where the close sits
//! in the bar's range; see [`volume_delta`]. Cumulative delta is the running
//! sum from bar 0.

use crate::domain::indicator::{Indicator, adopt_line_tail, begin_update, extend_line};
use crate::domain::indicator_helpers::volume_delta;
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::{Carry, LineSeries};

#[derive(Debug, Clone, Default)]
pub struct VolumeDelta;

impl VolumeDelta {
    pub fn new() -> Self {
        Self
    }
}

impl Indicator for VolumeDelta {
    type Output = LineSeries;

    fn name(&self) -> &str {
        "Volume Delta"
    }

    fn minimum_bars(&self) -> usize {
        1
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let mut output = LineSeries::new(self.name());
        extend_line(&mut output, source, 0, |i| volume_delta(source, i));
        output
    }

    fn update(&self, output: &mut LineSeries, source: &BarSeries, from_index: usize) {
        if let Some(start) = begin_update(output, source, from_index) {
            extend_line(output, source, start, |i| volume_delta(source, i));
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CumulativeDelta;

impl CumulativeDelta {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, output: &mut LineSeries, source: &BarSeries, start: usize, mut total: f64) {
        for i in start..source.len() {
            total += volume_delta(source, i);
            output.push_row(source.timestamps()[i], total);
        }
        output.set_carry(Carry::Total(total));
    }
}

impl Indicator for CumulativeDelta {
    type Output = LineSeries;

    fn name(&self) -> &str {
        "Cumulative Delta"
    }

    fn minimum_bars(&self) -> usize {
        1
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let mut output = LineSeries::new(self.name());
        self.run(&mut output, source, 0, 0.0);
        output
    }

    fn update(&self, output: &mut LineSeries, source: &BarSeries, from_index: usize) {
        let Some(start) = begin_update(output, source, from_index) else {
            return;
        };
        match output.take_carry() {
            Some(Carry::Total(total)) if output.name() == self.name() => {
                self.run(output, source, start, total)
            }
            _ => adopt_line_tail(output, &self.calculate(source), start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::*;
    use crate::domain::ohlcv::Bar;

    fn delta_bars() -> BarSeries {
        BarSeries::from_bars([
            Bar::new(0, 10.0, 12.0, 8.0, 11.0, 400.0),
            Bar::new(1, 11.0, 11.0, 11.0, 11.0, 100.0),
            Bar::new(2, 11.0, 12.0, 10.0, 10.0, 200.0),
        ])
        .unwrap()
    }

    #[test]
    fn volume_delta_per_bar() {
        let series = VolumeDelta::new().calculate(&delta_bars());
        assert!((series.values()[0] - 200.0).abs() < 1e-9);
        // flat bar, close unchanged: all buying
        assert_eq!(series.values()[1], 100.0);
        assert!((series.values()[2] + 200.0).abs() < 1e-9);
    }

    #[test]
    fn cumulative_delta_sums() {
        let series = CumulativeDelta::new().calculate(&delta_bars());
        assert!((series.values()[1] - 300.0).abs() < 1e-9);
        assert!((series.values()[2] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn update_matches_calculate() {
        let full = wave_bars(30);
        let cd = CumulativeDelta::new();
        let mut output = cd.calculate(&prefix(&full, 1));
        for n in 2..=30 {
            let len = output.len();
            cd.update(&mut output, &prefix(&full, n), len);
        }
        assert!(same_values(output.values(), cd.calculate(&full).values()));

        let vd = VolumeDelta::new();
        let mut output = vd.calculate(&prefix(&full, 12));
        vd.update(&mut output, &full, 12);
        assert!(same_values(output.values(), vd.calculate(&full).values()));
    }
}
