//! Expression tree, evaluation and canonical rendering.

use std::fmt;

use crate::domain::expr::context::EvalContext;
use crate::domain::price_field::PriceField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
        }
    }

    /// NaN in, NaN out; division and remainder by exactly zero are NaN.
    pub fn apply(self, left: f64, right: f64) -> f64 {
        if left.is_nan() || right.is_nan() {
            return f64::NAN;
        }
        match self {
            BinaryOp::Add => left + right,
            BinaryOp::Sub => left - right,
            BinaryOp::Mul => left * right,
            BinaryOp::Div | BinaryOp::Mod if right == 0.0 => f64::NAN,
            BinaryOp::Div => left / right,
            BinaryOp::Mod => left % right,
            BinaryOp::Pow => left.powf(right),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFunction {
    Abs,
    Sqrt,
    Log,
    Ln,
    Exp,
    Min,
    Max,
    Sign,
    Floor,
    Ceil,
    Round,
    Pow,
}

impl MathFunction {
    pub const ALL: [MathFunction; 12] = [
        MathFunction::Abs,
        MathFunction::Sqrt,
        MathFunction::Log,
        MathFunction::Ln,
        MathFunction::Exp,
        MathFunction::Min,
        MathFunction::Max,
        MathFunction::Sign,
        MathFunction::Floor,
        MathFunction::Ceil,
        MathFunction::Round,
        MathFunction::Pow,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            MathFunction::Abs => "abs",
            MathFunction::Sqrt => "sqrt",
            MathFunction::Log => "log",
            MathFunction::Ln => "ln",
            MathFunction::Exp => "exp",
            MathFunction::Min => "min",
            MathFunction::Max => "max",
            MathFunction::Sign => "sign",
            MathFunction::Floor => "floor",
            MathFunction::Ceil => "ceil",
            MathFunction::Round => "round",
            MathFunction::Pow => "pow",
        }
    }

    /// Accepted argument counts as `(min, max)`; `None` means unbounded.
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            MathFunction::Min | MathFunction::Max => (1, None),
            MathFunction::Pow => (2, Some(2)),
            _ => (1, Some(1)),
        }
    }

    pub fn apply(self, args: &[f64]) -> f64 {
        match self {
            MathFunction::Min => fold_valid(args, f64::min),
            MathFunction::Max => fold_valid(args, f64::max),
            _ => {
                if args.iter().any(|v| v.is_nan()) {
                    return f64::NAN;
                }
                let x = args.first().copied().unwrap_or(f64::NAN);
                match self {
                    MathFunction::Abs => x.abs(),
                    MathFunction::Sqrt if x < 0.0 => f64::NAN,
                    MathFunction::Sqrt => x.sqrt(),
                    MathFunction::Log | MathFunction::Ln if x <= 0.0 => f64::NAN,
                    MathFunction::Log => x.log10(),
                    MathFunction::Ln => x.ln(),
                    MathFunction::Exp => x.exp(),
                    MathFunction::Sign if x == 0.0 => 0.0,
                    MathFunction::Sign => x.signum(),
                    MathFunction::Floor => x.floor(),
                    MathFunction::Ceil => x.ceil(),
                    MathFunction::Round => x.round(),
                    MathFunction::Pow => {
                        let y = args.get(1).copied().unwrap_or(f64::NAN);
                        BinaryOp::Pow.apply(x, y)
                    }
                    MathFunction::Min | MathFunction::Max => f64::NAN,
                }
            }
        }
    }
}

fn fold_valid(args: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
    args.iter()
        .copied()
        .filter(|v| !v.is_nan())
        .reduce(pick)
        .unwrap_or(f64::NAN)
}

/// Indicators callable from an expression over any sub-expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesFunction {
    Sma,
    Ema,
    Wma,
    Rsi,
    Atr,
    Stdev,
    Highest,
    Lowest,
}

impl SeriesFunction {
    pub const ALL: [SeriesFunction; 8] = [
        SeriesFunction::Sma,
        SeriesFunction::Ema,
        SeriesFunction::Wma,
        SeriesFunction::Rsi,
        SeriesFunction::Atr,
        SeriesFunction::Stdev,
        SeriesFunction::Highest,
        SeriesFunction::Lowest,
    ];

    /// Lookup by lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Uppercase name used in the canonical form.
    pub fn name(self) -> &'static str {
        match self {
            SeriesFunction::Sma => "SMA",
            SeriesFunction::Ema => "EMA",
            SeriesFunction::Wma => "WMA",
            SeriesFunction::Rsi => "RSI",
            SeriesFunction::Atr => "ATR",
            SeriesFunction::Stdev => "STDEV",
            SeriesFunction::Highest => "HIGHEST",
            SeriesFunction::Lowest => "LOWEST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// A price field, `offset` bars back.
    Field { field: PriceField, offset: usize },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Function { func: MathFunction, args: Vec<Expr> },
    Indicator {
        func: SeriesFunction,
        source: Box<Expr>,
        period: usize,
    },
}

impl Expr {
    pub fn evaluate(&self, ctx: &mut EvalContext<'_>, index: usize) -> f64 {
        match self {
            Expr::Number(n) => *n,
            Expr::Field { field, offset } => match index.checked_sub(*offset) {
                Some(i) => field.value_at(ctx.source(), i),
                None => f64::NAN,
            },
            Expr::Binary { op, left, right } => {
                let l = left.evaluate(ctx, index);
                let r = right.evaluate(ctx, index);
                op.apply(l, r)
            }
            Expr::Function { func, args } => {
                let values: Vec<f64> = args.iter().map(|a| a.evaluate(ctx, index)).collect();
                func.apply(&values)
            }
            Expr::Indicator {
                func,
                source,
                period,
            } => ctx.indicator_value(*func, source, *period, index),
        }
    }

    /// Bars needed before the expression can produce a value.
    pub fn minimum_bars(&self) -> usize {
        match self {
            Expr::Number(_) => 1,
            Expr::Field { offset, .. } => offset + 1,
            Expr::Binary { left, right, .. } => left.minimum_bars().max(right.minimum_bars()),
            Expr::Function { args, .. } => args.iter().map(Expr::minimum_bars).max().unwrap_or(1).max(1),
            Expr::Indicator {
                func,
                source,
                period,
            } => {
                let inner = source.minimum_bars();
                match func {
                    SeriesFunction::Sma | SeriesFunction::Ema | SeriesFunction::Wma => {
                        inner + period - 1
                    }
                    SeriesFunction::Stdev | SeriesFunction::Highest | SeriesFunction::Lowest => {
                        inner.max(*period)
                    }
                    SeriesFunction::Rsi => inner + period,
                    SeriesFunction::Atr => period + 1,
                }
            }
        }
    }

    /// Canonical text form; parsing it yields an equivalent tree.
    pub fn to_expression_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Field { field, offset: 0 } => write!(f, "{field}"),
            Expr::Field { field, offset } => write!(f, "{field}[{offset}]"),
            Expr::Binary { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Function { func, args } => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::Indicator {
                func,
                source,
                period,
            } => write!(f, "{}({source}, {period})", func.name()),
        }
    }
}
