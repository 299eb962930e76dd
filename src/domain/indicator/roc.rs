//! Rate of Change and Momentum.
//!
//! ROC(n)[i] = ((C[i] - C[i-n]) / C[i-n]) * 100, and 0 when C[i-n] == 0.
//! MOM(n)[i] = C[i] - C[i-n]
//! Warmup: the first n bars are NaN.

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::{
    Indicator, Oscillator, OscillatorLevels, begin_update, extend_line, period_name,
};
use crate::domain::ohlcv::BarSeries;
use crate::domain::price_field::PriceField;
use crate::domain::series::LineSeries;

/// Shared lookback of ROC and Momentum.
#[derive(Debug, Clone)]
struct Lookback {
    period: usize,
    source: PriceField,
}

impl Lookback {
    fn pair(&self, source: &BarSeries, index: usize) -> Option<(f64, f64)> {
        let back = index.checked_sub(self.period)?;
        Some((
            self.source.value_at(source, index),
            self.source.value_at(source, back),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct Roc {
    lookback: Lookback,
    name: String,
}

impl Roc {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("ROC", "period", period)?;
        Ok(Self {
            lookback: Lookback {
                period,
                source: PriceField::Close,
            },
            name: period_name("ROC", period, PriceField::Close),
        })
    }

    pub fn with_source(mut self, source: PriceField) -> Self {
        self.lookback.source = source;
        self.name = period_name("ROC", self.lookback.period, source);
        self
    }

    fn value_at(&self, source: &BarSeries, index: usize) -> f64 {
        match self.lookback.pair(source, index) {
            Some((_, prev)) if prev == 0.0 => 0.0,
            Some((current, prev)) => (current - prev) / prev * 100.0,
            None => f64::NAN,
        }
    }
}

impl Indicator for Roc {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.lookback.period + 1
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

impl Oscillator for Roc {
    fn levels(&self) -> OscillatorLevels {
        OscillatorLevels::unbounded(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct Momentum {
    lookback: Lookback,
    name: String,
}

impl Momentum {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("Momentum", "period", period)?;
        Ok(Self {
            lookback: Lookback {
                period,
                source: PriceField::Close,
            },
            name: period_name("MOM", period, PriceField::Close),
        })
    }

    pub fn with_source(mut self, source: PriceField) -> Self {
        self.lookback.source = source;
        self.name = period_name("MOM", self.lookback.period, source);
        self
    }

    fn value_at(&self, source: &BarSeries, index: usize) -> f64 {
        self.lookback
            .pair(source, index)
            .map_or(f64::NAN, |(current, prev)| current - prev)
    }
}

impl Indicator for Momentum {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.lookback.period + 1
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

impl Oscillator for Momentum {
    fn levels(&self) -> OscillatorLevels {
        OscillatorLevels::unbounded(0.0)
    }
}
