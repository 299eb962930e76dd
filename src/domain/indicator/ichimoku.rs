//! Ichimoku Kinko Hyo.
//!
//! - Tenkan-sen: midpoint of the t-bar high/low range
//! - Kijun-sen: midpoint of the k-bar range
//! - Senkou Span A: (tenkan + kijun) / 2, shown `displacement` bars ahead
//! - Senkou Span B: midpoint of the s-bar range, shown `displacement` bars ahead
//! - Chikou Span: close shown `displacement` bars behind
//!
//! Rows are aligned to the bar axis: span values at bar i come from bar
//! i - displacement, chikou at bar i is the close of bar i + displacement.
//! Default parameters: 9, 26, 52, 26.

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::{Indicator, begin_update};
use crate::domain::indicator_helpers::{highest_at, lowest_at};
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::{MultiLineSeries, OutputSeries};

pub const DEFAULT_TENKAN: usize = 9;
pub const DEFAULT_KIJUN: usize = 26;
pub const DEFAULT_SENKOU: usize = 52;
pub const DEFAULT_DISPLACEMENT: usize = 26;

pub const LINE_NAMES: [&str; 5] = ["tenkan", "kijun", "senkou_a", "senkou_b", "chikou"];

const CHIKOU: usize = 4;

#[derive(Debug, Clone)]
pub struct Ichimoku {
    tenkan: usize,
    kijun: usize,
    senkou: usize,
    displacement: usize,
    name: String,
}

impl Ichimoku {
    pub fn new(
        tenkan: usize,
        kijun: usize,
        senkou: usize,
        displacement: usize,
    ) -> Result<Self, InvalidParameterError> {
        let tenkan = require_period("Ichimoku", "tenkan", tenkan)?;
        let kijun = require_period("Ichimoku", "kijun", kijun)?;
        let senkou = require_period("Ichimoku", "senkou", senkou)?;
        let displacement = require_period("Ichimoku", "displacement", displacement)?;
        Ok(Self {
            tenkan,
            kijun,
            senkou,
            displacement,
            name: format!("Ichimoku({tenkan}, {kijun}, {senkou}, {displacement})"),
        })
    }
}

fn midpoint(source: &BarSeries, len: usize, period: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let hh = highest_at(i, period, &|j| source.high(j));
            let ll = lowest_at(i, period, &|j| source.low(j));
            (hh + ll) / 2.0
        })
        .collect()
}

impl Indicator for Ichimoku {
    type Output = MultiLineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.senkou.max(self.kijun)
    }

    fn calculate(&self, source: &BarSeries) -> MultiLineSeries {
        let len = source.len();
        let tenkan = midpoint(source, len, self.tenkan);
        let kijun = midpoint(source, len, self.kijun);
        let span_b = midpoint(source, len, self.senkou);

        let shifted = |i: usize| i.checked_sub(self.displacement);
        let senkou_a = (0..len)
            .map(|i| shifted(i).map_or(f64::NAN, |j| (tenkan[j] + kijun[j]) / 2.0))
            .collect();
        let senkou_b = (0..len)
            .map(|i| shifted(i).map_or(f64::NAN, |j| span_b[j]))
            .collect();
        let chikou = (0..len)
            .map(|i| source.close(i + self.displacement))
            .collect();

        MultiLineSeries::from_lines(
            &self.name,
            &LINE_NAMES,
            source.timestamps(),
            vec![tenkan, kijun, senkou_a, senkou_b, chikou],
        )
    }

    /// Appends the new rows and fills in the chikou values of earlier rows
    /// that the new closes made available.
    fn update(&self, output: &mut MultiLineSeries, source: &BarSeries, from_index: usize) {
        let Some(start) = begin_update(output, source, from_index) else {
            return;
        };
        let fresh = self.calculate(source);
        output.extend_from(&fresh, start);
        let patch_from = start.saturating_sub(self.displacement);
        let fresh_chikou = &fresh.lines()[CHIKOU];
        output.line_mut(CHIKOU)[patch_from..start].copy_from_slice(&fresh_chikou[patch_from..start]);
    }
}
