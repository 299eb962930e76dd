//! Pivot points computed from the previous bar's high, low and close.
//!
//! Standard:  P = (H + L + C) / 3, R1 = 2P - L, S1 = 2P - H, R2/S2 = P ± range,
//!            R3 = H + 2(P - L), S3 = L - 2(H - P)
//! Fibonacci: P = (H + L + C) / 3, levels at P ± 0.382 / 0.618 / 1.0 × range
//! Woodie:    P = (H + L + 2C) / 4, R1/S1/R2/S2 as standard, R3 = R1 + range,
//!            S3 = S1 - range
//!
//! Bar 0 has no previous bar and is NaN.

use std::fmt;

use crate::domain::indicator::{Indicator, begin_update};
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::MultiLineSeries;

pub const LINE_NAMES: [&str; 7] = ["pivot", "r1", "r2", "r3", "s1", "s2", "s3"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PivotKind {
    #[default]
    Standard,
    Fibonacci,
    Woodie,
}

impl PivotKind {
    pub const NAMES: [&'static str; 3] = ["standard", "fibonacci", "woodie"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "standard" => Some(PivotKind::Standard),
            "fibonacci" => Some(PivotKind::Fibonacci),
            "woodie" => Some(PivotKind::Woodie),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PivotKind::Standard => "standard",
            PivotKind::Fibonacci => "fibonacci",
            PivotKind::Woodie => "woodie",
        }
    }

    /// `[pivot, r1, r2, r3, s1, s2, s3]`
    fn levels(self, high: f64, low: f64, close: f64) -> [f64; 7] {
        let range = high - low;
        match self {
            PivotKind::Standard => {
                let p = (high + low + close) / 3.0;
                [
                    p,
                    2.0 * p - low,
                    p + range,
                    high + 2.0 * (p - low),
                    2.0 * p - high,
                    p - range,
                    low - 2.0 * (high - p),
                ]
            }
            PivotKind::Fibonacci => {
                let p = (high + low + close) / 3.0;
                [
                    p,
                    p + 0.382 * range,
                    p + 0.618 * range,
                    p + range,
                    p - 0.382 * range,
                    p - 0.618 * range,
                    p - range,
                ]
            }
            PivotKind::Woodie => {
                let p = (high + low + 2.0 * close) / 4.0;
                let r1 = 2.0 * p - low;
                let s1 = 2.0 * p - high;
                [p, r1, p + range, r1 + range, s1, p - range, s1 - range]
            }
        }
    }
}

impl fmt::Display for PivotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct PivotPoints {
    kind: PivotKind,
    name: String,
}

impl PivotPoints {
    pub fn new(kind: PivotKind) -> Self {
        Self {
            kind,
            name: format!("Pivot({kind})"),
        }
    }

    pub fn kind(&self) -> PivotKind {
        self.kind
    }

    fn extend(&self, output: &mut MultiLineSeries, source: &BarSeries, start: usize) {
        for i in start..source.len() {
            let row = match i.checked_sub(1) {
                Some(prev) => {
                    self.kind
                        .levels(source.high(prev), source.low(prev), source.close(prev))
                }
                None => [f64::NAN; 7],
            };
            output.append(source.timestamps()[i], &row);
        }
    }
}

impl Indicator for PivotPoints {
    type Output = MultiLineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        2
    }

    fn calculate(&self, source: &BarSeries) -> MultiLineSeries {
        let mut output = MultiLineSeries::new(&self.name, &LINE_NAMES);
        self.extend(&mut output, source, 0);
        output
    }

    fn update(&self, output: &mut MultiLineSeries, source: &BarSeries, from_index: usize) {
        if let Some(start) = begin_update(output, source, from_index) {
            self.extend(output, source, start);
        }
    }
}
