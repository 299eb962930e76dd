//! Indicator contract and the built-in indicators.
//!
//! An indicator is immutable after construction; every bit of series state
//! lives in its output, so one instance can drive any number of outputs.
//!
//! - [`Indicator`]: typed contract, `calculate` plus incremental `update`
//! - [`DynIndicator`]: object-safe wrapper working on [`IndicatorOutput`]
//! - [`Oscillator`]: descriptive overbought/oversold levels for line oscillators

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod composite;
pub mod donchian;
pub mod ema;
pub mod hma;
pub mod ichimoku;
pub mod keltner;
pub mod macd;
pub mod obv;
pub mod pivot;
pub mod psar;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod stochastic;
pub mod volume_delta;
pub mod vwap;
pub mod williams_r;
pub mod wma;

use crate::domain::error::IndicatorError;
use crate::domain::ohlcv::BarSeries;
use crate::domain::price_field::PriceField;
use crate::domain::series::{BandSeries, IndicatorOutput, LineSeries, OutputSeries};

pub trait Indicator {
    type Output: OutputSeries;

    fn name(&self) -> &str;

    /// Bars needed before the first valid value.
    fn minimum_bars(&self) -> usize;

    /// Compute the whole output; its length equals `source.len()`.
    fn calculate(&self, source: &BarSeries) -> Self::Output;

    /// Extend `output` to cover bars appended to `source` since it was computed.
    ///
    /// Rows from `from_index` up to the current output length are recomputed,
    /// so passing `output.len() - 1` refreshes a live bar after
    /// [`BarSeries::update_last`]. A no-op when the source has not grown and
    /// nothing is to be refreshed. The default recomputes everything and keeps
    /// the new tail.
    fn update(&self, output: &mut Self::Output, source: &BarSeries, from_index: usize) {
        let Some(start) = begin_update(output, source, from_index) else {
            return;
        };
        let fresh = self.calculate(source);
        output.extend_from(&fresh, start);
    }
}

/// Boxed single-line indicator, as consumed by [`composite::CompositeIndicator`].
pub type LineIndicator = Box<dyn Indicator<Output = LineSeries> + Send + Sync>;

/// Truncate `output` to the first row that needs computing and return it, or
/// `None` if there is nothing to compute.
pub(crate) fn begin_update<S: OutputSeries>(
    output: &mut S,
    source: &BarSeries,
    from_index: usize,
) -> Option<usize> {
    let start = from_index.min(output.len());
    if start >= source.len() {
        output.truncate(source.len());
        return None;
    }
    output.truncate(start);
    Some(start)
}

/// Append `fresh[start..]` and adopt its resume state.
pub(crate) fn adopt_line_tail(output: &mut LineSeries, fresh: &LineSeries, start: usize) {
    tracing::debug!(indicator = fresh.name(), start, "incremental state unavailable, recomputing");
    output.extend_from(fresh, start);
    if let Some(&carry) = fresh.carry() {
        output.set_carry(carry);
    }
}

pub(crate) fn adopt_band_tail(output: &mut BandSeries, fresh: &BandSeries, start: usize) {
    tracing::debug!(indicator = fresh.name(), start, "incremental state unavailable, recomputing");
    output.extend_from(fresh, start);
    if let Some(&carry) = fresh.carry() {
        output.set_carry(carry);
    }
}

/// Push rows `start..source.len()` computed independently per index.
pub(crate) fn extend_line(
    output: &mut LineSeries,
    source: &BarSeries,
    start: usize,
    value_at: impl Fn(usize) -> f64,
) {
    let timestamps = source.timestamps();
    for (i, &t) in timestamps.iter().enumerate().skip(start) {
        output.push_row(t, value_at(i));
    }
}

/// `LABEL(period)`, or `LABEL(period, field)` for a non-close source.
pub(crate) fn period_name(label: &str, period: usize, source: PriceField) -> String {
    if source == PriceField::Close {
        format!("{label}({period})")
    } else {
        format!("{label}({period}, {source})")
    }
}

/// Object-safe view of any indicator.
pub trait DynIndicator: Send + Sync {
    fn indicator_name(&self) -> &str;

    fn required_bars(&self) -> usize;

    fn calculate_output(&self, source: &BarSeries) -> IndicatorOutput;

    /// Fails when `output` has a different shape than this indicator produces.
    fn update_output(
        &self,
        output: &mut IndicatorOutput,
        source: &BarSeries,
        from_index: usize,
    ) -> Result<(), IndicatorError>;
}

impl<T> DynIndicator for T
where
    T: Indicator + Send + Sync,
{
    fn indicator_name(&self) -> &str {
        self.name()
    }

    fn required_bars(&self) -> usize {
        self.minimum_bars()
    }

    fn calculate_output(&self, source: &BarSeries) -> IndicatorOutput {
        self.calculate(source).into_output()
    }

    fn update_output(
        &self,
        output: &mut IndicatorOutput,
        source: &BarSeries,
        from_index: usize,
    ) -> Result<(), IndicatorError> {
        let found = output.shape();
        let typed = T::Output::from_output_mut(output).ok_or_else(|| {
            IndicatorError::ShapeMismatch {
                indicator: self.name().to_string(),
                expected: T::Output::SHAPE,
                found,
            }
        })?;
        self.update(typed, source, from_index);
        Ok(())
    }
}

/// Reference levels of an oscillator. Purely descriptive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorLevels {
    pub overbought: Option<f64>,
    pub oversold: Option<f64>,
    pub center: f64,
    /// Fixed value range, if any; doubles as the suggested display range.
    pub range: Option<(f64, f64)>,
}

impl OscillatorLevels {
    pub const fn bounded(overbought: f64, oversold: f64, center: f64, range: (f64, f64)) -> Self {
        Self {
            overbought: Some(overbought),
            oversold: Some(oversold),
            center,
            range: Some(range),
        }
    }

    pub const fn unbounded(center: f64) -> Self {
        Self {
            overbought: None,
            oversold: None,
            center,
            range: None,
        }
    }

    pub const fn is_bounded(&self) -> bool {
        self.range.is_some()
    }
}

pub trait Oscillator: Indicator<Output = LineSeries> {
    fn levels(&self) -> OscillatorLevels;

    fn is_overbought(&self, value: f64) -> bool {
        self.levels()
            .overbought
            .is_some_and(|level| !value.is_nan() && value >= level)
    }

    fn is_oversold(&self, value: f64) -> bool {
        self.levels()
            .oversold
            .is_some_and(|level| !value.is_nan() && value <= level)
    }
}
