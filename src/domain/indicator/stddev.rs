//! Standard Deviation.
//!
//! Population standard deviation over n values.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n) / n)
//! Warmup: first (n-1) bars are NaN.

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::{Indicator, begin_update, extend_line, period_name};
use crate::domain::indicator_helpers::stdev_at;
use crate::domain::ohlcv::BarSeries;
use crate::domain::price_field::PriceField;
use crate::domain::series::LineSeries;

#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
    source: PriceField,
    name: String,
}

impl StdDev {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("StdDev", "period", period)?;
        Ok(Self {
            period,
            source: PriceField::Close,
            name: period_name("StdDev", period, PriceField::Close),
        })
    }

    pub fn with_source(mut self, source: PriceField) -> Self {
        self.source = source;
        self.name = period_name("StdDev", self.period, source);
        self
    }

    fn value_at(&self, source: &BarSeries, index: usize) -> f64 {
        stdev_at(index, self.period, &|i| self.source.value_at(source, i))
    }
}

impl Indicator for StdDev {
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
