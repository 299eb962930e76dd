//! Numeric recurrences shared by the built-in indicators and the expression
//! language's indicator calls.
//!
//! Kernels read their input through a value accessor (`Fn(usize) -> f64`), so
//! the same step runs over a bar column or over a sub-expression's values.
//! Stateful kernels expose their state as a small `Copy` struct; the built-ins
//! store it in the output series to resume on the next update.

use crate::domain::ohlcv::BarSeries;

/// Running sum of a fixed-length window. Finite samples are summed; NaN and
/// infinite samples are counted instead so they leave the sum intact.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowSum {
    sum: f64,
    nan_count: usize,
    pos_inf_count: usize,
    neg_inf_count: usize,
}

impl WindowSum {
    fn count(&mut self, v: f64, add: bool) {
        let slot = if v.is_nan() {
            &mut self.nan_count
        } else if v > 0.0 {
            &mut self.pos_inf_count
        } else {
            &mut self.neg_inf_count
        };
        if add {
            *slot += 1;
        } else {
            *slot -= 1;
        }
    }

    pub fn push(&mut self, incoming: f64, outgoing: Option<f64>) {
        if incoming.is_finite() {
            self.sum += incoming;
        } else {
            self.count(incoming, true);
        }
        match outgoing {
            Some(v) if v.is_finite() => self.sum -= v,
            Some(v) => self.count(v, false),
            None => {}
        }
    }

    /// Recompute the sum of the finite samples in `first..=last`.
    fn rescan(&mut self, first: usize, last: usize, value: &impl Fn(usize) -> f64) {
        self.sum = (first..=last).map(value).filter(|v| v.is_finite()).sum();
    }

    /// Mean over `period` samples: NaN while a NaN or both signs of infinity
    /// are present, the infinity while one sign is.
    pub fn mean(&self, period: usize) -> f64 {
        match (self.nan_count, self.pos_inf_count, self.neg_inf_count) {
            (0, 0, 0) => self.sum / period as f64,
            (0, _, 0) => f64::INFINITY,
            (0, 0, _) => f64::NEG_INFINITY,
            _ => f64::NAN,
        }
    }
}

/// Advance the SMA window to `index` and return the mean, NaN until the window
/// is full. See [`WindowSum::mean`] for non-finite samples.
pub fn sma_step(
    state: &mut WindowSum,
    period: usize,
    index: usize,
    value: &impl Fn(usize) -> f64,
) -> f64 {
    let outgoing = index.checked_sub(period).map(value);
    state.push(value(index), outgoing);
    // Finite samples can still overflow the running sum.
    if !state.sum.is_finite() {
        state.rescan((index + 1).saturating_sub(period), index, value);
    }
    if index + 1 >= period {
        state.mean(period)
    } else {
        f64::NAN
    }
}

pub fn sma(len: usize, period: usize, value: impl Fn(usize) -> f64) -> Vec<f64> {
    let mut state = WindowSum::default();
    (0..len)
        .map(|i| sma_step(&mut state, period, i, &value))
        .collect()
}

/// Seed-then-smooth exponential average.
///
/// The first `period` valid samples are averaged into the seed; afterwards
/// `ema = (x - ema) * 2 / (period + 1) + ema`. NaN samples yield NaN and leave
/// the state untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmaState {
    count: usize,
    seed_sum: f64,
    value: f64,
}

impl EmaState {
    pub fn step(&mut self, x: f64, period: usize) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if self.count < period {
            self.count += 1;
            self.seed_sum += x;
            if self.count < period {
                return f64::NAN;
            }
            self.value = self.seed_sum / period as f64;
            return self.value;
        }
        self.value = (x - self.value) * 2.0 / (period as f64 + 1.0) + self.value;
        self.value
    }
}

pub fn ema(len: usize, period: usize, value: impl Fn(usize) -> f64) -> Vec<f64> {
    let mut state = EmaState::default();
    (0..len).map(|i| state.step(value(i), period)).collect()
}

/// Wilder smoothing: seed with the mean of the first `period` valid samples,
/// then `avg = (avg * (period - 1) + x) / period`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WilderState {
    count: usize,
    seed_sum: f64,
    value: f64,
}

impl WilderState {
    pub fn step(&mut self, x: f64, period: usize) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if self.count < period {
            self.count += 1;
            self.seed_sum += x;
            if self.count < period {
                return f64::NAN;
            }
            self.value = self.seed_sum / period as f64;
            return self.value;
        }
        self.value = (self.value * (period as f64 - 1.0) + x) / period as f64;
        self.value
    }
}

pub fn wilder(len: usize, period: usize, value: impl Fn(usize) -> f64) -> Vec<f64> {
    let mut state = WilderState::default();
    (0..len).map(|i| state.step(value(i), period)).collect()
}

/// Wilder-smoothed true range; bar 0 has no true range and stays NaN.
pub fn atr(source: &BarSeries, period: usize) -> Vec<f64> {
    wilder(source.len(), period, |i| source.true_range(i))
}

/// Wilder RSI state: previous sample plus smoothed gain and loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiState {
    prev: f64,
    gain: WilderState,
    loss: WilderState,
}

impl Default for RsiState {
    fn default() -> Self {
        Self {
            prev: f64::NAN,
            gain: WilderState::default(),
            loss: WilderState::default(),
        }
    }
}

impl RsiState {
    pub fn step(&mut self, x: f64, period: usize) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if self.prev.is_nan() {
            self.prev = x;
            return f64::NAN;
        }
        let change = x - self.prev;
        self.prev = x;
        let avg_gain = self.gain.step(change.max(0.0), period);
        let avg_loss = self.loss.step((-change).max(0.0), period);
        if avg_gain.is_nan() || avg_loss.is_nan() {
            return f64::NAN;
        }
        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        }
    }
}

pub fn rsi(len: usize, period: usize, value: impl Fn(usize) -> f64) -> Vec<f64> {
    let mut state = RsiState::default();
    (0..len).map(|i| state.step(value(i), period)).collect()
}

/// Start of the window ending at `index`, or `None` while it is incomplete.
fn window_start(index: usize, period: usize) -> Option<usize> {
    (index + 1).checked_sub(period)
}

/// Linearly weighted mean, weights 1..=period from oldest to newest.
pub fn wma_at(index: usize, period: usize, value: &impl Fn(usize) -> f64) -> f64 {
    let Some(start) = window_start(index, period) else {
        return f64::NAN;
    };
    let mut weighted = 0.0;
    for (w, j) in (start..=index).enumerate() {
        weighted += value(j) * (w + 1) as f64;
    }
    let denominator = (period * (period + 1)) as f64 / 2.0;
    weighted / denominator
}

pub fn wma(len: usize, period: usize, value: impl Fn(usize) -> f64) -> Vec<f64> {
    (0..len).map(|i| wma_at(i, period, &value)).collect()
}

/// Population standard deviation of the valid samples in the window.
pub fn stdev_at(index: usize, period: usize, value: &impl Fn(usize) -> f64) -> f64 {
    let Some(start) = window_start(index, period) else {
        return f64::NAN;
    };
    let mut sum = 0.0;
    let mut count = 0usize;
    for j in start..=index {
        let v = value(j);
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        return f64::NAN;
    }
    let mean = sum / count as f64;
    let mut squares = 0.0;
    for j in start..=index {
        let v = value(j);
        if !v.is_nan() {
            squares += (v - mean) * (v - mean);
        }
    }
    (squares / count as f64).sqrt()
}

/// Window maximum ignoring NaN samples; NaN if the window is incomplete or empty of values.
pub fn highest_at(index: usize, period: usize, value: &impl Fn(usize) -> f64) -> f64 {
    window_fold(index, period, value, f64::max)
}

pub fn lowest_at(index: usize, period: usize, value: &impl Fn(usize) -> f64) -> f64 {
    window_fold(index, period, value, f64::min)
}

fn window_fold(
    index: usize,
    period: usize,
    value: &impl Fn(usize) -> f64,
    pick: fn(f64, f64) -> f64,
) -> f64 {
    let Some(start) = window_start(index, period) else {
        return f64::NAN;
    };
    (start..=index)
        .map(value)
        .filter(|v| !v.is_nan())
        .reduce(pick)
        .unwrap_or(f64::NAN)
}

/// Mean absolute deviation of the window around `mean`.
pub fn mean_deviation_at(
    index: usize,
    period: usize,
    mean: f64,
    value: &impl Fn(usize) -> f64,
) -> f64 {
    let Some(start) = window_start(index, period) else {
        return f64::NAN;
    };
    let total: f64 = (start..=index).map(|j| (value(j) - mean).abs()).sum();
    total / period as f64
}

/// Buy minus sell volume for one bar, split by where the close sits in the range.
///
/// A bar with no range counts its whole volume as buying if the close did not
/// fall from the previous bar, selling otherwise, and zero at bar 0.
pub fn volume_delta(source: &BarSeries, index: usize) -> f64 {
    let high = source.high(index);
    let low = source.low(index);
    let close = source.close(index);
    let volume = source.volume(index);
    let range = high - low;
    if range == 0.0 {
        if index == 0 {
            return 0.0;
        }
        return if close >= source.close(index - 1) {
            volume
        } else {
            -volume
        };
    }
    let buy = volume * (close - low) / range;
    let sell = volume * (high - close) / range;
    buy - sell
}
