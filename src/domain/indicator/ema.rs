//! Exponential Moving Average.
//!
//! Seed with the SMA of the first n values, then
//! EMA[i] = (C[i] - EMA[i-1]) * 2/(n+1) + EMA[i-1].
//! Warmup: first (n-1) bars are NaN.

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::{Indicator, adopt_line_tail, begin_update, period_name};
use crate::domain::indicator_helpers::EmaState;
use crate::domain::ohlcv::BarSeries;
use crate::domain::price_field::PriceField;
use crate::domain::series::{Carry, LineSeries};

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    source: PriceField,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("EMA", "period", period)?;
        Ok(Self {
            period,
            source: PriceField::Close,
            name: period_name("EMA", period, PriceField::Close),
        })
    }

    pub fn with_source(mut self, source: PriceField) -> Self {
        self.source = source;
        self.name = period_name("EMA", self.period, source);
        self
    }

    pub fn period(&self) -> usize {
        self.period
    }

    fn run(&self, output: &mut LineSeries, source: &BarSeries, start: usize, mut state: EmaState) {
        for i in start..source.len() {
            let v = state.step(self.source.value_at(source, i), self.period);
            output.push_row(source.timestamps()[i], v);
        }
        output.set_carry(Carry::Ema(state));
    }
}

impl Indicator for Ema {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.period
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let mut output = LineSeries::new(&self.name);
        self.run(&mut output, source, 0, EmaState::default());
        output
    }

    fn update(&self, output: &mut LineSeries, source: &BarSeries, from_index: usize) {
        let Some(start) = begin_update(output, source, from_index) else {
            return;
        };
        match output.take_carry() {
            Some(Carry::Ema(state)) if output.name() == self.name => {
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
    fn ema_warmup() {
        let source = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = Ema::new(3).unwrap().calculate(&source);
        assert!(series.values()[0].is_nan());
        assert!(series.values()[1].is_nan());
        assert!(series.values()[2..].iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn ema_period_1_tracks_input() {
        let source = make_bars(&[10.0, 20.0, 30.0]);
        let series = Ema::new(1).unwrap().calculate(&source);
        assert_eq!(series.values(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn ema_recursive_calculation() {
        let source = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = Ema::new(3).unwrap().calculate(&source);
        let sma = 20.0;
        let ema3 = (40.0 - sma) * 0.5 + sma;
        let ema4 = (50.0 - ema3) * 0.5 + ema3;
        assert!((series.values()[2] - sma).abs() < 1e-10);
        assert!((series.values()[3] - ema3).abs() < 1e-10);
        assert!((series.values()[4] - ema4).abs() < 1e-10);
    }

    #[test]
    fn ema_equal_prices() {
        let source = make_bars(&[100.0; 5]);
        let series = Ema::new(3).unwrap().calculate(&source);
        for v in &series.values()[2..] {
            assert!((v - 100.0).abs() < 1e-10);
        }
    }

    #[test]
    fn ema_zero_period_rejected() {
        assert!(Ema::new(0).is_err());
    }

    #[test]
    fn update_matches_calculate() {
        let full = wave_bars(50);
        let ema = Ema::new(9).unwrap();
        let mut output = ema.calculate(&prefix(&full, 5));
        for n in [6, 12, 13, 30, 50] {
            let len = output.len();
            ema.update(&mut output, &prefix(&full, n), len);
        }
        assert!(same_values(output.values(), ema.calculate(&full).values()));
    }
}
