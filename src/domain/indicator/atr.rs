//! Average True Range.
//!
//! TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|), defined from bar 1.
//! ATR seeds with the mean of TR[1..=n] at bar n, then Wilder-smooths.

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::{Indicator, adopt_line_tail, begin_update};
use crate::domain::indicator_helpers::WilderState;
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::{Carry, LineSeries};

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("ATR", "period", period)?;
        Ok(Self {
            period,
            name: format!("ATR({period})"),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    fn run(&self, output: &mut LineSeries, source: &BarSeries, start: usize, mut state: WilderState) {
        for i in start..source.len() {
            let v = state.step(source.true_range(i), self.period);
            output.push_row(source.timestamps()[i], v);
        }
        output.set_carry(Carry::Wilder(state));
    }
}

impl Indicator for Atr {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let mut output = LineSeries::new(&self.name);
        self.run(&mut output, source, 0, WilderState::default());
        output
    }

    fn update(&self, output: &mut LineSeries, source: &BarSeries, from_index: usize) {
        let Some(start) = begin_update(output, source, from_index) else {
            return;
        };
        match output.take_carry() {
            Some(Carry::Wilder(state)) if output.name() == self.name => {
                self.run(output, source, start, state)
            }
            _ => adopt_line_tail(output, &self.calculate(source), start),
        }
    }
}
