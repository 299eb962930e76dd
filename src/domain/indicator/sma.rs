//! Simple Moving Average.
//!
//! Running window sum divided by the period. Warmup: first (n-1) bars are NaN.
//! Updates resume the window sum in O(1) per new bar.

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::{Indicator, adopt_line_tail, begin_update, period_name};
use crate::domain::indicator_helpers::{WindowSum, sma_step};
use crate::domain::ohlcv::BarSeries;
use crate::domain::price_field::PriceField;
use crate::domain::series::{Carry, LineSeries};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: PriceField,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("SMA", "period", period)?;
        Ok(Self {
            period,
            source: PriceField::Close,
            name: period_name("SMA", period, PriceField::Close),
        })
    }

    pub fn with_source(mut self, source: PriceField) -> Self {
        self.source = source;
        self.name = period_name("SMA", self.period, source);
        self
    }

    pub fn period(&self) -> usize {
        self.period
    }

    fn run(&self, output: &mut LineSeries, source: &BarSeries, start: usize, mut state: WindowSum) {
        let value = |i| self.source.value_at(source, i);
        for i in start..source.len() {
            let v = sma_step(&mut state, self.period, i, &value);
            output.push_row(source.timestamps()[i], v);
        }
        output.set_carry(Carry::Sma(state));
    }
}

impl Indicator for Sma {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.period
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let mut output = LineSeries::new(&self.name);
        self.run(&mut output, source, 0, WindowSum::default());
        output
    }

    fn update(&self, output: &mut LineSeries, source: &BarSeries, from_index: usize) {
        let Some(start) = begin_update(output, source, from_index) else {
            return;
        };
        match output.take_carry() {
            Some(Carry::Sma(state)) if output.name() == self.name => {
                self.run(output, source, start, state)
            }
            _ => adopt_line_tail(output, &self.calculate(source), start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::*;

    #[test]
    fn sma_constant_series() {
        let source = make_bars(&[100.0; 20]);
        let series = Sma::new(10).unwrap().calculate(&source);
        assert_eq!(series.len(), 20);
        assert!(series.values()[8].is_nan());
        assert_eq!(series.values()[9], 100.0);
    }

    #[test]
    fn sma_values() {
        let source = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let series = Sma::new(3).unwrap().calculate(&source);
        assert!((series.values()[2] - 2.0).abs() < 1e-10);
        assert!((series.values()[3] - 3.0).abs() < 1e-10);
        assert!((series.values()[4] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn sma_shorter_than_period_is_all_nan() {
        let source = make_bars(&[1.0, 2.0]);
        let series = Sma::new(5).unwrap().calculate(&source);
        assert_eq!(series.len(), 2);
        assert!(series.values().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn sma_empty_source() {
        let series = Sma::new(5).unwrap().calculate(&BarSeries::new());
        assert!(series.values().is_empty());
    }

    #[test]
    fn sma_zero_period_rejected() {
        assert!(Sma::new(0).is_err());
    }

    #[test]
    fn sma_with_source_field() {
        let source = make_hlc_bars(&[(12.0, 8.0, 10.0), (14.0, 10.0, 12.0)]);
        let sma = Sma::new(2).unwrap().with_source(PriceField::High);
        assert_eq!(sma.name(), "SMA(2, high)");
        assert_eq!(sma.calculate(&source).values()[1], 13.0);
    }

    #[test]
    fn update_matches_calculate() {
        let full = wave_bars(60);
        let sma = Sma::new(7).unwrap();
        let mut output = sma.calculate(&prefix(&full, 20));
        for n in 21..=60 {
            sma.update(&mut output, &prefix(&full, n), n - 1);
        }
        assert!(same_values(output.values(), sma.calculate(&full).values()));
        assert!(matches!(output.carry(), Some(Carry::Sma(_))));
    }

    #[test]
    fn update_without_growth_is_noop() {
        let source = make_bars(&[1.0, 2.0, 3.0]);
        let sma = Sma::new(2).unwrap();
        let mut output = sma.calculate(&source);
        let before = output.clone();
        sma.update(&mut output, &source, 3);
        assert_eq!(output, before);
    }

    #[test]
    fn update_refreshes_rows_from_index() {
        let mut source = make_bars(&[1.0, 2.0, 3.0]);
        let sma = Sma::new(2).unwrap();
        let mut output = sma.calculate(&source);
        let mut last = source.bar(2).unwrap();
        last.close = 5.0;
        source.update_last(last).unwrap();
        sma.update(&mut output, &source, 2);
        assert_eq!(output.len(), 3);
        assert!((output.values()[2] - 3.5).abs() < 1e-10);
    }
}
