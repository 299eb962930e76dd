//! Parabolic SAR (Stop and Reverse).
//!
//! The trend direction is taken from the first two bars. Each bar moves the
//! SAR towards the extreme point by the acceleration factor, clamped so it
//! never crosses the previous two lows (uptrend) or highs (downtrend). When
//! price pierces the SAR the trend reverses: the SAR jumps to the old extreme
//! point and the factor resets.
//!
//! Default parameters: start=0.02, step=0.02, max=0.2. Bar 0 is NaN.

use crate::domain::error::{InvalidParameterError, require_positive};
use crate::domain::indicator::{Indicator, adopt_line_tail, begin_update};
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::{Carry, LineSeries};

pub const DEFAULT_START: f64 = 0.02;
pub const DEFAULT_STEP: f64 = 0.02;
pub const DEFAULT_MAX: f64 = 0.2;

/// Trend state after the last computed bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SarState {
    uptrend: bool,
    sar: f64,
    extreme: f64,
    af: f64,
}

impl SarState {
    fn initial(source: &BarSeries, af: f64) -> Self {
        let uptrend = source.high(1) > source.high(0) || source.low(1) > source.low(0);
        if uptrend {
            Self {
                uptrend,
                sar: source.low(0),
                extreme: source.high(0),
                af,
            }
        } else {
            Self {
                uptrend,
                sar: source.high(0),
                extreme: source.low(0),
                af,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParabolicSar {
    af_start: f64,
    af_step: f64,
    af_max: f64,
    name: String,
}

impl ParabolicSar {
    pub fn new(af_start: f64, af_step: f64, af_max: f64) -> Result<Self, InvalidParameterError> {
        let af_start = require_positive("PSAR", "start", af_start)?;
        let af_step = require_positive("PSAR", "step", af_step)?;
        let af_max = require_positive("PSAR", "max", af_max)?;
        if af_start > af_max {
            return Err(InvalidParameterError::new(
                "PSAR",
                "start",
                format!("must not exceed max ({af_start} > {af_max})"),
            ));
        }
        Ok(Self {
            af_start,
            af_step,
            af_max,
            name: format!("PSAR({af_start}, {af_step}, {af_max})"),
        })
    }

    fn step(&self, state: &mut SarState, source: &BarSeries, i: usize) -> f64 {
        let high = source.high(i);
        let low = source.low(i);
        let mut next = state.sar + state.af * (state.extreme - state.sar);

        if state.uptrend {
            next = next.min(source.low(i - 1));
            if i >= 2 {
                next = next.min(source.low(i - 2));
            }
            if low < next {
                state.uptrend = false;
                state.sar = state.extreme;
                state.extreme = low;
                state.af = self.af_start;
            } else {
                state.sar = next;
                if high > state.extreme {
                    state.extreme = high;
                    state.af = (state.af + self.af_step).min(self.af_max);
                }
            }
        } else {
            next = next.max(source.high(i - 1));
            if i >= 2 {
                next = next.max(source.high(i - 2));
            }
            if high > next {
                state.uptrend = true;
                state.sar = state.extreme;
                state.extreme = high;
                state.af = self.af_start;
            } else {
                state.sar = next;
                if low < state.extreme {
                    state.extreme = low;
                    state.af = (state.af + self.af_step).min(self.af_max);
                }
            }
        }
        state.sar
    }

    fn run(
        &self,
        output: &mut LineSeries,
        source: &BarSeries,
        start: usize,
        mut state: Option<SarState>,
    ) {
        for i in start..source.len() {
            if i == 0 {
                output.push_row(source.timestamps()[i], f64::NAN);
                continue;
            }
            let current = state.get_or_insert_with(|| SarState::initial(source, self.af_start));
            let sar = self.step(current, source, i);
            output.push_row(source.timestamps()[i], sar);
        }
        if let Some(state) = state {
            output.set_carry(Carry::Sar(state));
        }
    }
}

impl Indicator for ParabolicSar {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        2
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let mut output = LineSeries::new(&self.name);
        self.run(&mut output, source, 0, None);
        output
    }

    fn update(&self, output: &mut LineSeries, source: &BarSeries, from_index: usize) {
        let Some(start) = begin_update(output, source, from_index) else {
            return;
        };
        match output.take_carry() {
            Some(Carry::Sar(state)) if output.name() == self.name => {
                self.run(output, source, start, Some(state))
            }
            _ => adopt_line_tail(output, &self.calculate(source), start),
        }
    }
}
