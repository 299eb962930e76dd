//! On-Balance Volume.
//!
//! OBV[0] = 0
//! If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
//! If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
//! Otherwise OBV[i] = OBV[i-1]
//!
//! No warmup period; every bar has a value.

use crate::domain::indicator::{Indicator, adopt_line_tail, begin_update};
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::{Carry, LineSeries};

#[derive(Debug, Clone, Default)]
pub struct Obv;

impl Obv {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, output: &mut LineSeries, source: &BarSeries, start: usize, mut total: f64) {
        for i in start..source.len() {
            if i > 0 {
                let close = source.close(i);
                let prev = source.close(i - 1);
                if close > prev {
                    total += source.volume(i);
                } else if close < prev {
                    total -= source.volume(i);
                }
            }
            output.push_row(source.timestamps()[i], total);
        }
        output.set_carry(Carry::Total(total));
    }
}

impl Indicator for Obv {
    type Output = LineSeries;

    fn name(&self) -> &str {
        "OBV"
    }

    fn minimum_bars(&self) -> usize {
        1
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let mut output = LineSeries::new("OBV");
        self.run(&mut output, source, 0, 0.0);
        output
    }

    fn update(&self, output: &mut LineSeries, source: &BarSeries, from_index: usize) {
        let Some(start) = begin_update(output, source, from_index) else {
            return;
        };
        match output.take_carry() {
            Some(Carry::Total(total)) if output.name() == "OBV" => {
                self.run(output, source, start, total)
            }
            _ => adopt_line_tail(output, &self.calculate(source), start),
        }
    }
}
