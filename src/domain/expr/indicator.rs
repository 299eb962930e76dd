//! Expression-backed indicator.
//!
//! The tree is parsed once at construction. Each `calculate` or `update`
//! call builds a fresh [`EvalContext`], so cached sub-series never outlive a
//! change to the source. `update` recomputes the cached series over the whole
//! source, which keeps rows whose lookback spans the update boundary exact.

use crate::domain::error::SyntaxError;
use crate::domain::expr::ast::Expr;
use crate::domain::expr::context::EvalContext;
use crate::domain::expr::parser::parse;
use crate::domain::indicator::{Indicator, begin_update};
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::LineSeries;

#[derive(Debug, Clone)]
pub struct ExpressionIndicator {
    text: String,
    expr: Expr,
    name: String,
}

impl ExpressionIndicator {
    pub fn new(text: &str) -> Result<Self, SyntaxError> {
        let expr = parse(text)?;
        Ok(Self {
            text: text.to_string(),
            name: expr.to_expression_string(),
            expr,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The text this indicator was built from.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expression(&self) -> &Expr {
        &self.expr
    }

    /// Parse-only check, no source needed.
    pub fn is_valid(text: &str) -> bool {
        parse(text).is_ok()
    }

    pub fn validate(text: &str) -> Result<(), SyntaxError> {
        parse(text).map(|_| ())
    }

    fn run(&self, output: &mut LineSeries, source: &BarSeries, start: usize) {
        let mut ctx = EvalContext::new(source);
        let timestamps = source.timestamps();
        for (i, &t) in timestamps.iter().enumerate().skip(start) {
            let v = self.expr.evaluate(&mut ctx, i);
            output.push_row(t, v);
        }
    }
}

impl Indicator for ExpressionIndicator {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.expr.minimum_bars()
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let mut output = LineSeries::new(&self.name);
        self.run(&mut output, source, 0);
        output
    }

    fn update(&self, output: &mut LineSeries, source: &BarSeries, from_index: usize) {
        if let Some(start) = begin_update(output, source, from_index) {
            self.run(output, source, start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::atr::Atr;
    use crate::domain::indicator::ema::Ema;
    use crate::domain::indicator::sma::Sma;
    use crate::domain::indicator::test_support::*;

    #[test]
    fn previous_close() {
        let source = make_bars(&[10.0, 20.0]);
        let series = ExpressionIndicator::new("close[1]").unwrap().calculate(&source);
        assert!(series.values()[0].is_nan());
        assert_eq!(series.values()[1], 10.0);
    }

    #[test]
    fn name_is_canonical_form() {
        let indicator = ExpressionIndicator::new("sma(close,20)+atr(14)*2").unwrap();
        assert_eq!(indicator.name(), "(SMA(close, 20) + (ATR(close, 14) * 2))");
        assert_eq!(indicator.text(), "sma(close,20)+atr(14)*2");
        assert_eq!(indicator.minimum_bars(), 20);
        let named = indicator.with_name("upper");
        assert_eq!(named.name(), "upper");
    }

    #[test]
    fn moving_average_recovers_after_overflowing_sample() {
        let source = make_bars(&[800.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let series = ExpressionIndicator::new("SMA(exp(close), 2)").unwrap().calculate(&source);
        let values = series.values();
        assert!(values[0].is_nan());
        assert_eq!(values[1], f64::INFINITY);
        for v in &values[2..] {
            assert!((v - std::f64::consts::E).abs() < 1e-9, "{v}");
        }
    }

    #[test]
    fn division_by_zero_is_nan() {
        let source = make_bars(&[1.0, 2.0]);
        let series = ExpressionIndicator::new("close / 0").unwrap().calculate(&source);
        assert!(series.values().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn nan_propagates_through_arithmetic() {
        let source = make_bars(&[1.0, 2.0, 3.0]);
        let series = ExpressionIndicator::new("SMA(close, 3) * 2 + 1")
            .unwrap()
            .calculate(&source);
        assert!(series.values()[1].is_nan());
        assert!((series.values()[2] - 5.0).abs() < 1e-10);
    }

    #[test]
    fn indicator_calls_match_builtins() {
        let source = wave_bars(80);
        let cases: [(&str, Vec<f64>); 3] = [
            ("SMA(close, 10)", Sma::new(10).unwrap().calculate(&source).values().to_vec()),
            ("EMA(close, 12)", Ema::new(12).unwrap().calculate(&source).values().to_vec()),
            ("ATR(14)", Atr::new(14).unwrap().calculate(&source).values().to_vec()),
        ];
        for (text, expected) in cases {
            let series = ExpressionIndicator::new(text).unwrap().calculate(&source);
            assert!(same_values(series.values(), &expected), "{text}");
        }
    }

    #[test]
    fn macd_line_as_expression() {
        let source = wave_bars(60);
        let series = ExpressionIndicator::new("EMA(close,12)-EMA(close,26)")
            .unwrap()
            .calculate(&source);
        let fast = Ema::new(12).unwrap().calculate(&source);
        let slow = Ema::new(26).unwrap().calculate(&source);
        assert!(series.values()[24].is_nan());
        for i in 25..60 {
            let expected = fast.values()[i] - slow.values()[i];
            assert!((series.values()[i] - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn update_across_lookback_boundary_matches_calculate() {
        let full = wave_bars(50);
        let indicator = ExpressionIndicator::new("EMA(close[2], 5) - LOWEST(low, 4)").unwrap();
        let mut output = indicator.calculate(&prefix(&full, 12));
        for n in 13..=50 {
            indicator.update(&mut output, &prefix(&full, n), n - 1);
        }
        assert!(same_values(output.values(), indicator.calculate(&full).values()));
    }

    #[test]
    fn validation_without_source() {
        assert!(ExpressionIndicator::is_valid("HIGHEST(high, 10) - LOWEST(low, 10)"));
        assert!(!ExpressionIndicator::is_valid("SMA(close,"));
        let err = ExpressionIndicator::validate("close + + 1").unwrap_err();
        assert_eq!(err.position, 8);
        assert!(ExpressionIndicator::new("").is_err());
    }

    #[test]
    fn deeply_nested_text_is_invalid() {
        assert!(!ExpressionIndicator::is_valid(&format!("{}1", "-".repeat(200_000))));
        assert!(!ExpressionIndicator::is_valid(&"(".repeat(10_000)));
        let err = ExpressionIndicator::validate(&format!("{}close{}", "(".repeat(300), ")".repeat(300)))
            .unwrap_err();
        assert!(err.message.contains("nested too deeply"));
    }
}
