//! Williams %R.
//!
//! %R = (HH(n) - C) / (HH(n) - LL(n)) * -100, -50 when the range is zero.
//! Ranges from -100 (close at the low) to 0 (close at the high).

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::{
    Indicator, Oscillator, OscillatorLevels, begin_update, extend_line,
};
use crate::domain::indicator_helpers::{highest_at, lowest_at};
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::LineSeries;

pub const DEFAULT_PERIOD: usize = 14;

const LEVELS: OscillatorLevels = OscillatorLevels::bounded(-20.0, -80.0, -50.0, (-100.0, 0.0));

#[derive(Debug, Clone)]
pub struct WilliamsR {
    period: usize,
    name: String,
}

impl WilliamsR {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("Williams %R", "period", period)?;
        Ok(Self {
            period,
            name: format!("Williams %R({period})"),
        })
    }

    fn value_at(&self, source: &BarSeries, index: usize) -> f64 {
        let hh = highest_at(index, self.period, &|i| source.high(i));
        let ll = lowest_at(index, self.period, &|i| source.low(i));
        let range = hh - ll;
        if range == 0.0 {
            -50.0
        } else {
            (hh - source.close(index)) / range * -100.0
        }
    }
}

impl Indicator for WilliamsR {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.period
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let mut output = LineSeries::new(&self.name);
        extend_line(&mut output, source, 0, |i| self.value_at(source, i));
        output
    }

    fn update(&self, output: &mut LineSeries, source: &BarSeries, from_index: usize) {
        if let Some(start) = begin_update(output, source, from_index) {
            extend_line(output, source, start, |i| self.value_at(source, i));
        }
    }
}

impl Oscillator for WilliamsR {
    fn levels(&self) -> OscillatorLevels {
        LEVELS
    }
}
