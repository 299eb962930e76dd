//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9.
//! Warmup: the MACD line starts at slow - 1, signal and histogram at slow + signal - 2.

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::Indicator;
use crate::domain::indicator_helpers::{EmaState, ema};
use crate::domain::ohlcv::BarSeries;
use crate::domain::price_field::PriceField;
use crate::domain::series::MultiLineSeries;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub const LINE_NAMES: [&str; 3] = ["macd", "signal", "histogram"];

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    source: PriceField,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, InvalidParameterError> {
        let fast = require_period("MACD", "fast", fast)?;
        let slow = require_period("MACD", "slow", slow)?;
        let signal = require_period("MACD", "signal", signal)?;
        if fast >= slow {
            return Err(InvalidParameterError::new(
                "MACD",
                "fast",
                format!("must be less than slow ({fast} >= {slow})"),
            ));
        }
        Ok(Self {
            fast,
            slow,
            signal,
            source: PriceField::Close,
            name: format!("MACD({fast}, {slow}, {signal})"),
        })
    }

    pub fn with_source(mut self, source: PriceField) -> Self {
        self.source = source;
        self
    }
}

impl Indicator for Macd {
    type Output = MultiLineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.slow + self.signal - 1
    }

    fn calculate(&self, source: &BarSeries) -> MultiLineSeries {
        let len = source.len();
        let value = |i| self.source.value_at(source, i);
        let fast = ema(len, self.fast, value);
        let slow = ema(len, self.slow, value);
        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();

        let mut state = EmaState::default();
        let signal: Vec<f64> = line.iter().map(|&m| state.step(m, self.signal)).collect();
        let histogram = line.iter().zip(&signal).map(|(m, s)| m - s).collect();

        MultiLineSeries::from_lines(
            &self.name,
            &LINE_NAMES,
            source.timestamps(),
            vec![line, signal, histogram],
        )
    }
}
