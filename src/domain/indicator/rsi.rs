//! RSI (Relative Strength Index).
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are NaN (n price changes are needed for the first average).

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::{
    Indicator, Oscillator, OscillatorLevels, adopt_line_tail, begin_update, period_name,
};
use crate::domain::indicator_helpers::RsiState;
use crate::domain::ohlcv::BarSeries;
use crate::domain::price_field::PriceField;
use crate::domain::series::{Carry, LineSeries};

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    source: PriceField,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("RSI", "period", period)?;
        Ok(Self {
            period,
            source: PriceField::Close,
            name: period_name("RSI", period, PriceField::Close),
        })
    }

    pub fn with_source(mut self, source: PriceField) -> Self {
        self.source = source;
        self.name = period_name("RSI", self.period, source);
        self
    }

    fn run(&self, output: &mut LineSeries, source: &BarSeries, start: usize, mut state: RsiState) {
        for i in start..source.len() {
            let v = state.step(self.source.value_at(source, i), self.period);
            output.push_row(source.timestamps()[i], v);
        }
        output.set_carry(Carry::Rsi(state));
    }
}

impl Indicator for Rsi {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let mut output = LineSeries::new(&self.name);
        self.run(&mut output, source, 0, RsiState::default());
        output
    }

    fn update(&self, output: &mut LineSeries, source: &BarSeries, from_index: usize) {
        let Some(start) = begin_update(output, source, from_index) else {
            return;
        };
        match output.take_carry() {
            Some(Carry::Rsi(state)) if output.name() == self.name => {
                self.run(output, source, start, state)
            }
            _ => adopt_line_tail(output, &self.calculate(source), start),
        }
    }
}

impl Oscillator for Rsi {
    fn levels(&self) -> OscillatorLevels {
        OscillatorLevels::bounded(70.0, 30.0, 50.0, (0.0, 100.0))
    }
}
