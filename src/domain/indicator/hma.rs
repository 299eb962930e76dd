//! Hull Moving Average: WMA(sqrt n) of 2*WMA(n/2) - WMA(n).

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::{Indicator, period_name};
use crate::domain::indicator_helpers::{wma, wma_at};
use crate::domain::ohlcv::BarSeries;
use crate::domain::price_field::PriceField;
use crate::domain::series::LineSeries;

#[derive(Debug, Clone)]
pub struct Hma {
    period: usize,
    half_period: usize,
    sqrt_period: usize,
    source: PriceField,
    name: String,
}

impl Hma {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("HMA", "period", period)?;
        if period < 4 {
            return Err(InvalidParameterError::new(
                "HMA",
                "period",
                "must be at least 4",
            ));
        }
        Ok(Self {
            period,
            half_period: period / 2,
            sqrt_period: (period as f64).sqrt().floor() as usize,
            source: PriceField::Close,
            name: period_name("HMA", period, PriceField::Close),
        })
    }

    pub fn with_source(mut self, source: PriceField) -> Self {
        self.source = source;
        self.name = period_name("HMA", self.period, source);
        self
    }
}

impl Indicator for Hma {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.period + self.sqrt_period - 1
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let len = source.len();
        let value = |i| self.source.value_at(source, i);
        let half = wma(len, self.half_period, value);
        let full = wma(len, self.period, value);
        let raw: Vec<f64> = half.iter().zip(&full).map(|(h, f)| 2.0 * h - f).collect();
        let values = (0..len)
            .map(|i| wma_at(i, self.sqrt_period, &|j| raw[j]))
            .collect();
        LineSeries::from_values(&self.name, source.timestamps(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::*;

    #[test]
    fn hma_rejects_short_period() {
        assert!(Hma::new(3).is_err());
        assert!(Hma::new(4).is_ok());
    }

    #[test]
    fn hma_first_valid_index() {
        let source = wave_bars(30);
        let hma = Hma::new(9).unwrap();
        let series = hma.calculate(&source);
        // 9 + 3 - 1 bars needed
        assert_eq!(hma.minimum_bars(), 11);
        assert!(series.values()[9].is_nan());
        assert!(!series.values()[10].is_nan());
    }

    #[test]
    fn hma_of_constant_is_constant() {
        let source = make_bars(&[50.0; 20]);
        let series = Hma::new(4).unwrap().calculate(&source);
        for v in &series.values()[4..] {
            assert!((v - 50.0).abs() < 1e-9);
        }
    }

    #[test]
    fn hma_lags_less_than_wma() {
        let closes: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let source = make_bars(&closes);
        let hma = Hma::new(16).unwrap().calculate(&source);
        let wma = crate::domain::indicator::wma::Wma::new(16)
            .unwrap()
            .calculate(&source);
        // linear input: WMA(16) lags by 5, HMA(16) by 2/3
        assert!((wma.values()[29] - 24.0).abs() < 1e-9);
        assert!((hma.values()[29] - (29.0 - 2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn update_appends_new_rows() {
        let full = wave_bars(40);
        let hma = Hma::new(9).unwrap();
        let mut output = hma.calculate(&prefix(&full, 20));
        hma.update(&mut output, &full, 20);
        assert!(same_values(output.values(), hma.calculate(&full).values()));
    }
}
