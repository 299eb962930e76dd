//! Commodity Channel Index.
//!
//! TP = (H + L + C) / 3
//! CCI = (TP - SMA(TP)) / (0.015 * MeanDeviation), 0 when the deviation is 0.
//! Warmup: first (n-1) bars are NaN.

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::{
    Indicator, Oscillator, OscillatorLevels, begin_update, extend_line,
};
use crate::domain::indicator_helpers::mean_deviation_at;
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::LineSeries;

pub const DEFAULT_PERIOD: usize = 20;

const CONSTANT: f64 = 0.015;

#[derive(Debug, Clone)]
pub struct Cci {
    period: usize,
    name: String,
}

impl Cci {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("CCI", "period", period)?;
        Ok(Self {
            period,
            name: format!("CCI({period})"),
        })
    }

    fn value_at(&self, source: &BarSeries, index: usize) -> f64 {
        let Some(start) = (index + 1).checked_sub(self.period) else {
            return f64::NAN;
        };
        let tp = |i| source.typical_price(i);
        let mean = (start..=index).map(tp).sum::<f64>() / self.period as f64;
        let deviation = mean_deviation_at(index, self.period, mean, &tp);
        if deviation == 0.0 {
            0.0
        } else {
            (tp(index) - mean) / (CONSTANT * deviation)
        }
    }
}

impl Indicator for Cci {
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

impl Oscillator for Cci {
    /// ±100 reference levels; values routinely exceed them.
    fn levels(&self) -> OscillatorLevels {
        OscillatorLevels {
            overbought: Some(100.0),
            oversold: Some(-100.0),
            ..OscillatorLevels::unbounded(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::*;

    #[test]
    fn cci_zero_mean_deviation_is_zero() {
        let source = make_bars(&[50.0; 25]);
        let series = Cci::new(DEFAULT_PERIOD).unwrap().calculate(&source);
        assert!(series.values()[18].is_nan());
        assert_eq!(series.values()[19], 0.0);
        assert_eq!(series.values()[24], 0.0);
    }

    #[test]
    fn cci_known_value() {
        // typical prices 1, 2, 3: mean 2, mean deviation 2/3
        let source = make_bars(&[1.0, 2.0, 3.0]);
        let series = Cci::new(3).unwrap().calculate(&source);
        let expected = (3.0 - 2.0) / (0.015 * (2.0 / 3.0));
        assert!((series.values()[2] - expected).abs() < 1e-9);
    }

    #[test]
    fn cci_levels_are_unbounded() {
        let cci = Cci::new(20).unwrap();
        assert!(!cci.levels().is_bounded());
        assert!(cci.is_overbought(150.0));
        assert!(cci.is_oversold(-100.0));
        assert!(!cci.is_overbought(f64::NAN));
    }

    #[test]
    fn update_matches_calculate() {
        let full = wave_bars(50);
        let cci = Cci::new(20).unwrap();
        let mut output = cci.calculate(&prefix(&full, 21));
        cci.update(&mut output, &full, 21);
        assert!(same_values(output.values(), cci.calculate(&full).values()));
    }
}
