//! Per-call evaluation context with the indicator-call cache.
//!
//! The first evaluation of an indicator call computes its whole series over
//! the source, bar 0 first, and stores it under `NAME_period_source`. Every
//! later evaluation of the same call, from any node, is a lookup.

use std::collections::HashMap;

use crate::domain::expr::ast::{Expr, SeriesFunction};
use crate::domain::indicator_helpers::{atr, ema, highest_at, lowest_at, rsi, sma, stdev_at, wma};
use crate::domain::ohlcv::BarSeries;

pub struct EvalContext<'a> {
    source: &'a BarSeries,
    cache: HashMap<String, Vec<f64>>,
    hits: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(source: &'a BarSeries) -> Self {
        Self {
            source,
            cache: HashMap::new(),
            hits: 0,
        }
    }

    pub fn source(&self) -> &'a BarSeries {
        self.source
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Number of cached indicator series.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn indicator_value(
        &mut self,
        func: SeriesFunction,
        input: &Expr,
        period: usize,
        index: usize,
    ) -> f64 {
        let key = cache_key(func, input, period);
        if let Some(values) = self.cache.get(&key) {
            self.hits += 1;
            return values.get(index).copied().unwrap_or(f64::NAN);
        }

        let values = self.compute(func, input, period);
        tracing::debug!(key = %key, len = values.len(), "computed expression indicator");
        let value = values.get(index).copied().unwrap_or(f64::NAN);
        self.cache.insert(key, values);
        value
    }

    fn compute(&mut self, func: SeriesFunction, input: &Expr, period: usize) -> Vec<f64> {
        let len = self.source.len();
        // ATR reads the bars directly
        if func == SeriesFunction::Atr {
            return atr(self.source, period);
        }
        let xs: Vec<f64> = (0..len).map(|i| input.evaluate(self, i)).collect();
        let value = |i: usize| xs[i];
        match func {
            SeriesFunction::Sma => sma(len, period, value),
            SeriesFunction::Ema => ema(len, period, value),
            SeriesFunction::Wma => wma(len, period, value),
            SeriesFunction::Rsi => rsi(len, period, value),
            SeriesFunction::Stdev => (0..len).map(|i| stdev_at(i, period, &value)).collect(),
            SeriesFunction::Highest => (0..len).map(|i| highest_at(i, period, &value)).collect(),
            SeriesFunction::Lowest => (0..len).map(|i| lowest_at(i, period, &value)).collect(),
            SeriesFunction::Atr => atr(self.source, period),
        }
    }
}

impl Drop for EvalContext<'_> {
    fn drop(&mut self) {
        if !self.cache.is_empty() {
            tracing::trace!(series = self.cache.len(), hits = self.hits, "evaluation context dropped");
        }
    }
}

fn cache_key(func: SeriesFunction, input: &Expr, period: usize) -> String {
    format!("{}_{}_{}", func.name(), period, input)
}
