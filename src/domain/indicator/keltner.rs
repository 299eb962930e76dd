//! Keltner Channels.
//!
//! Middle = EMA(close, ema_period)
//! Upper/Lower = Middle ± multiplier × ATR(atr_period)
//!
//! Default parameters: ema=20, atr=10, multiplier=2.0.
//! Warmup: first valid bar is max(ema - 1, atr).

use crate::domain::error::{InvalidParameterError, require_period, require_positive};
use crate::domain::indicator::{Indicator, adopt_band_tail, begin_update};
use crate::domain::indicator_helpers::{EmaState, WilderState};
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::{BandSeries, BandValue, Carry};

pub const DEFAULT_EMA_PERIOD: usize = 20;
pub const DEFAULT_ATR_PERIOD: usize = 10;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct KeltnerChannels {
    ema_period: usize,
    atr_period: usize,
    multiplier: f64,
    name: String,
}

impl KeltnerChannels {
    pub fn new(
        ema_period: usize,
        atr_period: usize,
        multiplier: f64,
    ) -> Result<Self, InvalidParameterError> {
        let ema_period = require_period("Keltner", "ema_period", ema_period)?;
        let atr_period = require_period("Keltner", "atr_period", atr_period)?;
        let multiplier = require_positive("Keltner", "multiplier", multiplier)?;
        Ok(Self {
            ema_period,
            atr_period,
            multiplier,
            name: format!("Keltner({ema_period}, {atr_period}, {multiplier})"),
        })
    }

    fn run(
        &self,
        output: &mut BandSeries,
        source: &BarSeries,
        start: usize,
        mut ema: EmaState,
        mut atr: WilderState,
    ) {
        for i in start..source.len() {
            let middle = ema.step(source.close(i), self.ema_period);
            let range = atr.step(source.true_range(i), self.atr_period);
            output.push_row(
                source.timestamps()[i],
                BandValue::around(middle, self.multiplier * range),
            );
        }
        output.set_carry(Carry::Keltner { ema, atr });
    }
}

impl Indicator for KeltnerChannels {
    type Output = BandSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.ema_period.max(self.atr_period + 1)
    }

    fn calculate(&self, source: &BarSeries) -> BandSeries {
        let mut output = BandSeries::new(&self.name);
        self.run(&mut output, source, 0, EmaState::default(), WilderState::default());
        output
    }

    fn update(&self, output: &mut BandSeries, source: &BarSeries, from_index: usize) {
        let Some(start) = begin_update(output, source, from_index) else {
            return;
        };
        match output.take_carry() {
            Some(Carry::Keltner { ema, atr }) if output.name() == self.name => {
                self.run(output, source, start, ema, atr)
            }
            _ => adopt_band_tail(output, &self.calculate(source), start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::*;
    use crate::domain::indicator_helpers::{atr, ema};

    #[test]
    fn keltner_matches_ema_and_atr() {
        let source = wave_bars(60);
        let keltner =
            KeltnerChannels::new(DEFAULT_EMA_PERIOD, DEFAULT_ATR_PERIOD, DEFAULT_MULTIPLIER)
                .unwrap();
        let bands = keltner.calculate(&source);
        let middle = ema(source.len(), 20, |i| source.close(i));
        let range = atr(&source, 10);
        let row = bands.row(40).unwrap();
        assert!((row.middle - middle[40]).abs() < 1e-12);
        assert!((row.upper - (middle[40] + 2.0 * range[40])).abs() < 1e-12);
    }

    #[test]
    fn keltner_warmup_follows_slower_component() {
        let source = wave_bars(30);
        let bands = KeltnerChannels::new(3, 10, 1.5).unwrap().calculate(&source);
        assert!(bands.middle()[9].is_nan());
        assert!(!bands.middle()[10].is_nan());
        let bands = KeltnerChannels::new(12, 3, 1.5).unwrap().calculate(&source);
        assert!(bands.upper()[10].is_nan());
        assert!(!bands.upper()[11].is_nan());
    }

    #[test]
    fn keltner_rejects_bad_multiplier() {
        assert!(KeltnerChannels::new(20, 10, 0.0).is_err());
        assert!(KeltnerChannels::new(20, 10, f64::NAN).is_err());
    }

    #[test]
    fn update_matches_calculate() {
        let full = wave_bars(50);
        let keltner = KeltnerChannels::new(20, 10, 2.0).unwrap();
        let mut output = keltner.calculate(&prefix(&full, 10));
        for n in 11..=50 {
            let len = output.len();
            keltner.update(&mut output, &prefix(&full, n), len);
        }
        let fresh = keltner.calculate(&full);
        assert!(same_values(output.upper(), fresh.upper()));
        assert!(same_values(output.middle(), fresh.middle()));
        assert!(same_values(output.lower(), fresh.lower()));
    }
}
