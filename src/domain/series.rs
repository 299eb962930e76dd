//! Output series produced by indicators.
//!
//! Three shapes exist: a single line, a band triple (upper/middle/lower) and a
//! fixed set of named lines. NaN marks a row without a value. After an
//! indicator's `calculate`/`update`, row `i` carries bar `i`'s timestamp.

use crate::domain::indicator::psar::SarState;
use crate::domain::indicator::vwap::VwapState;
use crate::domain::indicator_helpers::{EmaState, RsiState, WilderState, WindowSum};

/// Resume state of an O(1) indicator after the last row of its output.
///
/// Only the owning indicator sets it. Any edit through the public series API
/// drops it, and the next update recomputes from scratch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Carry {
    Sma(WindowSum),
    Ema(EmaState),
    Wilder(WilderState),
    Rsi(RsiState),
    Total(f64),
    Vwap(VwapState),
    Keltner { ema: EmaState, atr: WilderState },
    Sar(SarState),
}

/// Common capability of every output shape.
pub trait OutputSeries: Sized {
    /// Shape label used in error messages.
    const SHAPE: &'static str;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn timestamps(&self) -> &[i64];

    /// Drop rows from `len` onwards.
    fn truncate(&mut self, len: usize);

    /// Append rows `from..other.len()` of `other`.
    fn extend_from(&mut self, other: &Self, from: usize);

    fn into_output(self) -> IndicatorOutput;

    fn from_output_mut(output: &mut IndicatorOutput) -> Option<&mut Self>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    name: String,
    timestamps: Vec<i64>,
    values: Vec<f64>,
    carry: Option<Carry>,
}

impl LineSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamps: Vec::new(),
            values: Vec::new(),
            carry: None,
        }
    }

    /// Build from one value per timestamp.
    pub fn from_values(name: impl Into<String>, timestamps: &[i64], values: Vec<f64>) -> Self {
        debug_assert_eq!(timestamps.len(), values.len());
        Self {
            name: name.into(),
            timestamps: timestamps.to_vec(),
            values,
            carry: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn append(&mut self, timestamp: i64, value: f64) {
        self.carry = None;
        self.push_row(timestamp, value);
    }

    /// Overwrite the last value; returns false on an empty series.
    pub fn update_last(&mut self, value: f64) -> bool {
        self.carry = None;
        match self.values.last_mut() {
            Some(last) => {
                *last = value;
                true
            }
            None => false,
        }
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn carry(&self) -> Option<&Carry> {
        self.carry.as_ref()
    }

    pub(crate) fn push_row(&mut self, timestamp: i64, value: f64) {
        self.timestamps.push(timestamp);
        self.values.push(value);
    }

    pub(crate) fn set_carry(&mut self, carry: Carry) {
        self.carry = Some(carry);
    }

    pub(crate) fn take_carry(&mut self) -> Option<Carry> {
        self.carry.take()
    }
}

impl OutputSeries for LineSeries {
    const SHAPE: &'static str = "line";

    fn len(&self) -> usize {
        LineSeries::len(self)
    }

    fn timestamps(&self) -> &[i64] {
        LineSeries::timestamps(self)
    }

    fn truncate(&mut self, len: usize) {
        if len < self.values.len() {
            self.timestamps.truncate(len);
            self.values.truncate(len);
            self.carry = None;
        }
    }

    fn extend_from(&mut self, other: &Self, from: usize) {
        if from < other.len() {
            self.timestamps.extend_from_slice(&other.timestamps[from..]);
            self.values.extend_from_slice(&other.values[from..]);
        }
        self.carry = None;
    }

    fn into_output(self) -> IndicatorOutput {
        IndicatorOutput::Line(self)
    }

    fn from_output_mut(output: &mut IndicatorOutput) -> Option<&mut Self> {
        match output {
            IndicatorOutput::Line(line) => Some(line),
            _ => None,
        }
    }
}

/// One row of a band series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BandValue {
    pub const NAN: BandValue = BandValue {
        upper: f64::NAN,
        middle: f64::NAN,
        lower: f64::NAN,
    };

    /// `middle ± offset`; NaN if either input is NaN.
    pub fn around(middle: f64, offset: f64) -> Self {
        if middle.is_nan() || offset.is_nan() {
            return Self::NAN;
        }
        Self {
            upper: middle + offset,
            middle,
            lower: middle - offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandSeries {
    name: String,
    timestamps: Vec<i64>,
    upper: Vec<f64>,
    middle: Vec<f64>,
    lower: Vec<f64>,
    carry: Option<Carry>,
}

impl BandSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamps: Vec::new(),
            upper: Vec::new(),
            middle: Vec::new(),
            lower: Vec::new(),
            carry: None,
        }
    }

    pub fn from_rows(name: impl Into<String>, timestamps: &[i64], rows: &[BandValue]) -> Self {
        debug_assert_eq!(timestamps.len(), rows.len());
        let mut series = Self::new(name);
        for (&t, &row) in timestamps.iter().zip(rows) {
            series.push_row(t, row);
        }
        series
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn append(&mut self, timestamp: i64, row: BandValue) {
        self.carry = None;
        self.push_row(timestamp, row);
    }

    pub fn update_last(&mut self, row: BandValue) -> bool {
        self.carry = None;
        let Some(i) = self.upper.len().checked_sub(1) else {
            return false;
        };
        self.upper[i] = row.upper;
        self.middle[i] = row.middle;
        self.lower[i] = row.lower;
        true
    }

    pub fn row(&self, index: usize) -> Option<BandValue> {
        Some(BandValue {
            upper: *self.upper.get(index)?,
            middle: self.middle[index],
            lower: self.lower[index],
        })
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn middle(&self) -> &[f64] {
        &self.middle
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn carry(&self) -> Option<&Carry> {
        self.carry.as_ref()
    }

    pub(crate) fn push_row(&mut self, timestamp: i64, row: BandValue) {
        self.timestamps.push(timestamp);
        self.upper.push(row.upper);
        self.middle.push(row.middle);
        self.lower.push(row.lower);
    }

    pub(crate) fn set_carry(&mut self, carry: Carry) {
        self.carry = Some(carry);
    }

    pub(crate) fn take_carry(&mut self) -> Option<Carry> {
        self.carry.take()
    }
}

impl OutputSeries for BandSeries {
    const SHAPE: &'static str = "band";

    fn len(&self) -> usize {
        BandSeries::len(self)
    }

    fn timestamps(&self) -> &[i64] {
        BandSeries::timestamps(self)
    }

    fn truncate(&mut self, len: usize) {
        if len < self.timestamps.len() {
            self.timestamps.truncate(len);
            self.upper.truncate(len);
            self.middle.truncate(len);
            self.lower.truncate(len);
            self.carry = None;
        }
    }

    fn extend_from(&mut self, other: &Self, from: usize) {
        for i in from..other.len() {
            self.push_row(
                other.timestamps[i],
                BandValue {
                    upper: other.upper[i],
                    middle: other.middle[i],
                    lower: other.lower[i],
                },
            );
        }
        self.carry = None;
    }

    fn into_output(self) -> IndicatorOutput {
        IndicatorOutput::Band(self)
    }

    fn from_output_mut(output: &mut IndicatorOutput) -> Option<&mut Self> {
        match output {
            IndicatorOutput::Band(band) => Some(band),
            _ => None,
        }
    }
}

/// A fixed set of named lines sharing one timestamp axis.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiLineSeries {
    name: String,
    line_names: Vec<String>,
    timestamps: Vec<i64>,
    lines: Vec<Vec<f64>>,
}

impl MultiLineSeries {
    pub fn new(name: impl Into<String>, line_names: &[&str]) -> Self {
        Self {
            name: name.into(),
            line_names: line_names.iter().map(|n| n.to_string()).collect(),
            timestamps: Vec::new(),
            lines: vec![Vec::new(); line_names.len()],
        }
    }

    /// Build from whole columns, one per line name.
    pub fn from_lines(
        name: impl Into<String>,
        line_names: &[&str],
        timestamps: &[i64],
        lines: Vec<Vec<f64>>,
    ) -> Self {
        debug_assert_eq!(line_names.len(), lines.len());
        debug_assert!(lines.iter().all(|l| l.len() == timestamps.len()));
        Self {
            name: name.into(),
            line_names: line_names.iter().map(|n| n.to_string()).collect(),
            timestamps: timestamps.to_vec(),
            lines,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line_names(&self) -> &[String] {
        &self.line_names
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Append one row; missing trailing components are NaN, extra ones ignored.
    pub fn append(&mut self, timestamp: i64, row: &[f64]) {
        self.timestamps.push(timestamp);
        for (k, line) in self.lines.iter_mut().enumerate() {
            line.push(row.get(k).copied().unwrap_or(f64::NAN));
        }
    }

    pub fn update_last(&mut self, row: &[f64]) -> bool {
        if self.timestamps.is_empty() {
            return false;
        }
        for (k, line) in self.lines.iter_mut().enumerate() {
            if let Some(last) = line.last_mut() {
                *last = row.get(k).copied().unwrap_or(f64::NAN);
            }
        }
        true
    }

    pub fn line(&self, name: &str) -> Option<&[f64]> {
        let k = self.line_names.iter().position(|n| n == name)?;
        Some(&self.lines[k])
    }

    pub fn lines(&self) -> &[Vec<f64>] {
        &self.lines
    }

    pub fn value(&self, name: &str, index: usize) -> Option<f64> {
        self.line(name)?.get(index).copied()
    }

    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.timestamps.len() {
            return None;
        }
        Some(self.lines.iter().map(|l| l[index]).collect())
    }

    pub(crate) fn line_mut(&mut self, k: usize) -> &mut [f64] {
        &mut self.lines[k]
    }
}

impl OutputSeries for MultiLineSeries {
    const SHAPE: &'static str = "multi-line";

    fn len(&self) -> usize {
        MultiLineSeries::len(self)
    }

    fn timestamps(&self) -> &[i64] {
        MultiLineSeries::timestamps(self)
    }

    fn truncate(&mut self, len: usize) {
        self.timestamps.truncate(len);
        for line in &mut self.lines {
            line.truncate(len);
        }
    }

    fn extend_from(&mut self, other: &Self, from: usize) {
        if from >= other.len() {
            return;
        }
        self.timestamps.extend_from_slice(&other.timestamps[from..]);
        for (line, src) in self.lines.iter_mut().zip(&other.lines) {
            line.extend_from_slice(&src[from..]);
        }
    }

    fn into_output(self) -> IndicatorOutput {
        IndicatorOutput::Multi(self)
    }

    fn from_output_mut(output: &mut IndicatorOutput) -> Option<&mut Self> {
        match output {
            IndicatorOutput::Multi(multi) => Some(multi),
            _ => None,
        }
    }
}

/// Output of any indicator, tagged by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorOutput {
    Line(LineSeries),
    Band(BandSeries),
    Multi(MultiLineSeries),
}

impl IndicatorOutput {
    pub fn name(&self) -> &str {
        match self {
            IndicatorOutput::Line(s) => s.name(),
            IndicatorOutput::Band(s) => s.name(),
            IndicatorOutput::Multi(s) => s.name(),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            IndicatorOutput::Line(_) => LineSeries::SHAPE,
            IndicatorOutput::Band(_) => BandSeries::SHAPE,
            IndicatorOutput::Multi(_) => MultiLineSeries::SHAPE,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndicatorOutput::Line(s) => s.len(),
            IndicatorOutput::Band(s) => s.len(),
            IndicatorOutput::Multi(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn timestamps(&self) -> &[i64] {
        match self {
            IndicatorOutput::Line(s) => s.timestamps(),
            IndicatorOutput::Band(s) => s.timestamps(),
            IndicatorOutput::Multi(s) => s.timestamps(),
        }
    }

    /// Named value columns in display order.
    pub fn columns(&self) -> Vec<(&str, &[f64])> {
        match self {
            IndicatorOutput::Line(s) => vec![("value", s.values())],
            IndicatorOutput::Band(s) => vec![
                ("upper", s.upper()),
                ("middle", s.middle()),
                ("lower", s.lower()),
            ],
            IndicatorOutput::Multi(s) => s
                .line_names()
                .iter()
                .zip(s.lines())
                .map(|(n, l)| (n.as_str(), l.as_slice()))
                .collect(),
        }
    }
}
