//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N, not N-1).
//! Default parameters: period=20, multiplier=2.0. Warmup: first (n-1) bars are NaN.

use crate::domain::error::{InvalidParameterError, require_period, require_positive};
use crate::domain::indicator::{Indicator, begin_update};
use crate::domain::indicator_helpers::stdev_at;
use crate::domain::ohlcv::BarSeries;
use crate::domain::price_field::PriceField;
use crate::domain::series::{BandSeries, BandValue};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    multiplier: f64,
    source: PriceField,
    name: String,
}

impl BollingerBands {
    pub fn new(period: usize, multiplier: f64) -> Result<Self, InvalidParameterError> {
        let period = require_period("Bollinger", "period", period)?;
        let multiplier = require_positive("Bollinger", "multiplier", multiplier)?;
        Ok(Self {
            period,
            multiplier,
            source: PriceField::Close,
            name: format!("Bollinger({period}, {multiplier})"),
        })
    }

    pub fn with_source(mut self, source: PriceField) -> Self {
        self.source = source;
        if source != PriceField::Close {
            self.name = format!("Bollinger({}, {}, {source})", self.period, self.multiplier);
        }
        self
    }

    fn row_at(&self, source: &BarSeries, index: usize) -> BandValue {
        let value = |i| self.source.value_at(source, i);
        let Some(start) = (index + 1).checked_sub(self.period) else {
            return BandValue::NAN;
        };
        let middle = (start..=index).map(value).sum::<f64>() / self.period as f64;
        let sd = stdev_at(index, self.period, &value);
        BandValue::around(middle, self.multiplier * sd)
    }

    fn extend(&self, output: &mut BandSeries, source: &BarSeries, start: usize) {
        for i in start..source.len() {
            output.push_row(source.timestamps()[i], self.row_at(source, i));
        }
    }
}

impl Indicator for BollingerBands {
    type Output = BandSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.period
    }

    fn calculate(&self, source: &BarSeries) -> BandSeries {
        let mut output = BandSeries::new(&self.name);
        self.extend(&mut output, source, 0);
        output
    }

    fn update(&self, output: &mut BandSeries, source: &BarSeries, from_index: usize) {
        if let Some(start) = begin_update(output, source, from_index) {
            self.extend(output, source, start);
        }
    }
}
