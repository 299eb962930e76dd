//! Donchian Channels: highest high, lowest low and their midpoint over n bars.

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::{Indicator, begin_update};
use crate::domain::indicator_helpers::{highest_at, lowest_at};
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::{BandSeries, BandValue};

pub const DEFAULT_PERIOD: usize = 20;

#[derive(Debug, Clone)]
pub struct DonchianChannels {
    period: usize,
    name: String,
}

impl DonchianChannels {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("Donchian", "period", period)?;
        Ok(Self {
            period,
            name: format!("Donchian({period})"),
        })
    }

    fn row_at(&self, source: &BarSeries, index: usize) -> BandValue {
        let upper = highest_at(index, self.period, &|i| source.high(i));
        let lower = lowest_at(index, self.period, &|i| source.low(i));
        if upper.is_nan() || lower.is_nan() {
            return BandValue::NAN;
        }
        BandValue {
            upper,
            middle: (upper + lower) / 2.0,
            lower,
        }
    }

    fn extend(&self, output: &mut BandSeries, source: &BarSeries, start: usize) {
        for i in start..source.len() {
            output.push_row(source.timestamps()[i], self.row_at(source, i));
        }
    }
}

impl Indicator for DonchianChannels {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::*;

    #[test]
    fn donchian_tracks_extremes() {
        let source = make_hlc_bars(&[
            (10.0, 8.0, 9.0),
            (12.0, 9.0, 11.0),
            (11.0, 7.0, 8.0),
            (9.0, 8.5, 9.0),
        ]);
        let bands = DonchianChannels::new(3).unwrap().calculate(&source);
        assert!(bands.row(1).unwrap().upper.is_nan());
        let row = bands.row(2).unwrap();
        assert_eq!((row.upper, row.middle, row.lower), (12.0, 9.5, 7.0));
        let row = bands.row(3).unwrap();
        assert_eq!((row.upper, row.lower), (12.0, 7.0));
    }

    #[test]
    fn update_matches_calculate() {
        let full = wave_bars(40);
        let donchian = DonchianChannels::new(DEFAULT_PERIOD).unwrap();
        let mut output = donchian.calculate(&prefix(&full, 30));
        donchian.update(&mut output, &full, 30);
        let fresh = donchian.calculate(&full);
        assert!(same_values(output.upper(), fresh.upper()));
        assert!(same_values(output.lower(), fresh.lower()));
    }
}
