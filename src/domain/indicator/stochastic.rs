//! Stochastic oscillator (slow).
//!
//! raw %K = 100 * (C - LL(k)) / (HH(k) - LL(k)), 50 when the range is zero
//! %K = SMA(slowing) of raw %K
//! %D = SMA(d) of %K
//!
//! Default parameters: k=14, d=3, slowing=3.
//! Warmup: %K starts at k + slowing - 2, %D at k + slowing + d - 3.

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::Indicator;
use crate::domain::indicator_helpers::{highest_at, lowest_at, sma};
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::MultiLineSeries;

pub const DEFAULT_K: usize = 14;
pub const DEFAULT_D: usize = 3;
pub const DEFAULT_SLOWING: usize = 3;

pub const LINE_NAMES: [&str; 2] = ["%K", "%D"];

#[derive(Debug, Clone)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
    slowing: usize,
    name: String,
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize, slowing: usize) -> Result<Self, InvalidParameterError> {
        let k_period = require_period("Stochastic", "k", k_period)?;
        let d_period = require_period("Stochastic", "d", d_period)?;
        let slowing = require_period("Stochastic", "slowing", slowing)?;
        Ok(Self {
            k_period,
            d_period,
            slowing,
            name: format!("Stoch({k_period}, {d_period}, {slowing})"),
        })
    }

    fn raw_k(&self, source: &BarSeries, index: usize) -> f64 {
        let hh = highest_at(index, self.k_period, &|i| source.high(i));
        let ll = lowest_at(index, self.k_period, &|i| source.low(i));
        let range = hh - ll;
        if range.is_nan() {
            f64::NAN
        } else if range > 0.0 {
            100.0 * (source.close(index) - ll) / range
        } else {
            50.0
        }
    }
}

impl Indicator for Stochastic {
    type Output = MultiLineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.k_period + self.slowing + self.d_period - 2
    }

    fn calculate(&self, source: &BarSeries) -> MultiLineSeries {
        let len = source.len();
        let raw: Vec<f64> = (0..len).map(|i| self.raw_k(source, i)).collect();
        let k = sma(len, self.slowing, |i| raw[i]);
        let d = sma(len, self.d_period, |i| k[i]);
        MultiLineSeries::from_lines(&self.name, &LINE_NAMES, source.timestamps(), vec![k, d])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::*;

    #[test]
    fn stochastic_warmup_boundaries() {
        let source = wave_bars(40);
        let stoch = Stochastic::new(DEFAULT_K, DEFAULT_D, DEFAULT_SLOWING).unwrap();
        let series = stoch.calculate(&source);
        let k = series.line("%K").unwrap();
        let d = series.line("%D").unwrap();
        assert!(k[14].is_nan());
        assert!(!k[15].is_nan());
        assert!(d[16].is_nan());
        assert!(!d[17].is_nan());
        assert_eq!(stoch.minimum_bars(), 18);
    }

    #[test]
    fn stochastic_flat_range_is_neutral() {
        let source = make_bars(&[10.0; 8]);
        let series = Stochastic::new(3, 2, 2).unwrap().calculate(&source);
        assert!((series.value("%K", 7).unwrap() - 50.0).abs() < 1e-10);
        assert!((series.value("%D", 7).unwrap() - 50.0).abs() < 1e-10);
    }

    #[test]
    fn stochastic_close_at_high_is_100() {
        let rows: Vec<(f64, f64, f64)> = (0..6)
            .map(|i| {
                let c = 10.0 + i as f64;
                (c, c - 1.0, c)
            })
            .collect();
        let source = make_hlc_bars(&rows);
        let series = Stochastic::new(3, 1, 1).unwrap().calculate(&source);
        assert!((series.value("%K", 5).unwrap() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn stochastic_stays_in_range() {
        let source = wave_bars(80);
        let series = Stochastic::new(14, 3, 3).unwrap().calculate(&source);
        for line in series.lines() {
            assert!(line.iter().filter(|v| !v.is_nan()).all(|v| (0.0..=100.0).contains(v)));
        }
    }

    #[test]
    fn stochastic_rejects_zero_periods() {
        assert!(Stochastic::new(0, 3, 3).is_err());
        assert!(Stochastic::new(14, 3, 0).is_err());
    }
}
