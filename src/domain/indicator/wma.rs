//! Weighted Moving Average.
//!
//! Linearly weighted, weights 1..n from oldest to newest:
//! WMA = sum(C[i-n+1+j] * (j+1)) / (n*(n+1)/2).
//! Updates rescan the window for the new rows only.

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::{Indicator, begin_update, extend_line, period_name};
use crate::domain::indicator_helpers::wma_at;
use crate::domain::ohlcv::BarSeries;
use crate::domain::price_field::PriceField;
use crate::domain::series::LineSeries;

#[derive(Debug, Clone)]
pub struct Wma {
    period: usize,
    source: PriceField,
    name: String,
}

impl Wma {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("WMA", "period", period)?;
        Ok(Self {
            period,
            source: PriceField::Close,
            name: period_name("WMA", period, PriceField::Close),
        })
    }

    pub fn with_source(mut self, source: PriceField) -> Self {
        self.source = source;
        self.name = period_name("WMA", self.period, source);
        self
    }

    fn value_at(&self, source: &BarSeries, index: usize) -> f64 {
        wma_at(index, self.period, &|i| self.source.value_at(source, i))
    }
}

impl Indicator for Wma {
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
