//! Indicator expression language.
//!
//! Text such as `SMA(close, 20) + ATR(14) * 2` is tokenized, parsed into an
//! [`Expr`] tree once, and evaluated bar by bar through an [`EvalContext`]
//! that caches every indicator call's full series.

pub mod ast;
pub mod context;
pub mod indicator;
pub mod parser;
pub mod token;

pub use ast::Expr;
pub use context::EvalContext;
pub use indicator::ExpressionIndicator;
pub use parser::parse;
