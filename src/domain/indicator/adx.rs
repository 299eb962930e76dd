//! Average Directional Index with the +DI / -DI lines.
//!
//! From bar 1:
//! - TR = max(H-L, |H-C[i-1]|, |L-C[i-1]|)
//! - +DM = H - H[i-1] if it exceeds L[i-1] - L and is positive, else 0
//! - -DM = L[i-1] - L if it exceeds H - H[i-1] and is positive, else 0
//!
//! TR and both DMs are Wilder-averaged over n bars, then
//! +DI = 100 * avg(+DM) / avg(TR), -DI likewise (0 when avg(TR) is 0),
//! DX = 100 * |+DI - -DI| / (+DI + -DI) (0 when both are 0),
//! ADX = Wilder average of DX.
//!
//! Warmup: DI lines start at bar n, ADX at bar 2n - 1.

use crate::domain::error::{InvalidParameterError, require_period};
use crate::domain::indicator::Indicator;
use crate::domain::indicator_helpers::WilderState;
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::MultiLineSeries;

pub const DEFAULT_PERIOD: usize = 14;

pub const LINE_NAMES: [&str; 3] = ["adx", "plus_di", "minus_di"];

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Result<Self, InvalidParameterError> {
        let period = require_period("ADX", "period", period)?;
        Ok(Self {
            period,
            name: format!("ADX({period})"),
        })
    }
}

/// (+DM, -DM) of bar `i` against bar `i - 1`.
fn directional_movement(source: &BarSeries, i: usize) -> (f64, f64) {
    let up = source.high(i) - source.high(i - 1);
    let down = source.low(i - 1) - source.low(i);
    let plus = if up > down && up > 0.0 { up } else { 0.0 };
    let minus = if down > up && down > 0.0 { down } else { 0.0 };
    (plus, minus)
}

fn ratio_percent(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}

impl Indicator for Adx {
    type Output = MultiLineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        2 * self.period
    }

    fn calculate(&self, source: &BarSeries) -> MultiLineSeries {
        let len = source.len();
        let mut adx = vec![f64::NAN; len];
        let mut plus_di = vec![f64::NAN; len];
        let mut minus_di = vec![f64::NAN; len];

        let mut tr_avg = WilderState::default();
        let mut plus_avg = WilderState::default();
        let mut minus_avg = WilderState::default();
        let mut dx_avg = WilderState::default();

        for i in 1..len {
            let (plus_dm, minus_dm) = directional_movement(source, i);
            let tr = tr_avg.step(source.true_range(i), self.period);
            let plus = plus_avg.step(plus_dm, self.period);
            let minus = minus_avg.step(minus_dm, self.period);
            if tr.is_nan() {
                continue;
            }
            let pdi = ratio_percent(plus, tr);
            let mdi = ratio_percent(minus, tr);
            plus_di[i] = pdi;
            minus_di[i] = mdi;
            let dx = ratio_percent((pdi - mdi).abs(), pdi + mdi);
            adx[i] = dx_avg.step(dx, self.period);
        }

        MultiLineSeries::from_lines(
            &self.name,
            &LINE_NAMES,
            source.timestamps(),
            vec![adx, plus_di, minus_di],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::*;

    fn trending_bars(len: usize) -> BarSeries {
        let rows: Vec<(f64, f64, f64)> = (0..len)
            .map(|i| {
                let base = 100.0 + 2.0 * i as f64;
                (base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        make_hlc_bars(&rows)
    }

    #[test]
    fn adx_warmup_boundaries() {
        let adx = Adx::new(5).unwrap();
        let series = adx.calculate(&wave_bars(30));
        let plus = series.line("plus_di").unwrap();
        let line = series.line("adx").unwrap();
        assert!(plus[4].is_nan());
        assert!(!plus[5].is_nan());
        assert!(line[8].is_nan());
        assert!(!line[9].is_nan());
        assert_eq!(adx.minimum_bars(), 10);
    }

    #[test]
    fn adx_strong_uptrend() {
        let series = Adx::new(DEFAULT_PERIOD).unwrap().calculate(&trending_bars(40));
        let last = series.row(39).unwrap();
        // only upward movement: -DI is zero and DX is 100
        assert!((last[0] - 100.0).abs() < 1e-9);
        assert!(last[1] > 0.0);
        assert_eq!(last[2], 0.0);
    }

    #[test]
    fn adx_short_source_is_all_nan() {
        let series = Adx::new(14).unwrap().calculate(&make_bars(&[1.0]));
        assert_eq!(series.len(), 1);
        assert!(series.row(0).unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn update_appends_new_rows() {
        let full = wave_bars(50);
        let adx = Adx::new(7).unwrap();
        let mut output = adx.calculate(&prefix(&full, 20));
        adx.update(&mut output, &full, 20);
        let fresh = adx.calculate(&full);
        for name in LINE_NAMES {
            assert!(same_values(
                output.line(name).unwrap(),
                fresh.line(name).unwrap()
            ));
        }
    }
}
