//! Domain error types.

/// A syntax error in an indicator expression, with the byte offset it occurred at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("syntax error at position {position}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub position: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!("{input}\n{caret}\n{err}", err = self)
    }
}

/// Rejected indicator construction: a period, multiplier or factor outside its domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {parameter} for {indicator}: {reason}")]
pub struct InvalidParameterError {
    pub indicator: String,
    pub parameter: String,
    pub reason: String,
}

impl InvalidParameterError {
    pub fn new(indicator: &str, parameter: &str, reason: impl Into<String>) -> Self {
        Self {
            indicator: indicator.to_string(),
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }
}

/// Require `value >= 1` for a window length.
pub fn require_period(
    indicator: &str,
    parameter: &str,
    value: usize,
) -> Result<usize, InvalidParameterError> {
    if value == 0 {
        return Err(InvalidParameterError::new(
            indicator,
            parameter,
            "must be at least 1",
        ));
    }
    Ok(value)
}

/// Require a finite, strictly positive multiplier.
pub fn require_positive(
    indicator: &str,
    parameter: &str,
    value: f64,
) -> Result<f64, InvalidParameterError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(InvalidParameterError::new(
            indicator,
            parameter,
            format!("must be positive, got {value}"),
        ));
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BarError {
    #[error("timestamp {timestamp} is not after the last timestamp {last}")]
    NonIncreasingTimestamp { timestamp: i64, last: i64 },

    #[error("live bar timestamp {timestamp} does not match the last timestamp {last}")]
    TimestampMismatch { timestamp: i64, last: i64 },

    #[error("bar series is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameterError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("{indicator} produces {expected} output, got {found}")]
    ShapeMismatch {
        indicator: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown indicator '{id}'")]
    UnknownIndicator { id: String },

    #[error("indicator '{id}' is already registered")]
    DuplicateIndicator { id: String },

    #[error("parameter '{parameter}' of {id}: {reason}")]
    Parameter {
        id: String,
        parameter: String,
        reason: String,
    },
}

/// Top-level error type for barcalc.
#[derive(Debug, thiserror::Error)]
pub enum BarcalcError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("csv error in {file}: {reason}")]
    Csv { file: String, reason: String },

    #[error("invalid bar data: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Bar(#[from] BarError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<InvalidParameterError> for BarcalcError {
    fn from(err: InvalidParameterError) -> Self {
        BarcalcError::Indicator(err.into())
    }
}

impl From<&BarcalcError> for std::process::ExitCode {
    fn from(err: &BarcalcError) -> Self {
        let code: u8 = match err {
            BarcalcError::Io(_) => 1,
            BarcalcError::ConfigParse { .. }
            | BarcalcError::ConfigMissing { .. }
            | BarcalcError::ConfigInvalid { .. } => 2,
            BarcalcError::Csv { .. } | BarcalcError::Data { .. } | BarcalcError::Bar(_) => 3,
            BarcalcError::Syntax(_) | BarcalcError::Indicator(_) => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_context_points_at_position() {
        let err = SyntaxError::new("unexpected ')'", 4);
        let rendered = err.display_with_context("sma()");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "sma()");
        assert_eq!(lines[1], "    ^");
        assert_eq!(lines[2], "syntax error at position 4: unexpected ')'");
    }

    #[test]
    fn require_period_rejects_zero() {
        assert!(require_period("SMA", "period", 0).is_err());
        assert_eq!(require_period("SMA", "period", 3), Ok(3));
    }

    #[test]
    fn require_positive_rejects_nan_and_negative() {
        assert!(require_positive("Keltner", "multiplier", f64::NAN).is_err());
        assert!(require_positive("Keltner", "multiplier", -1.0).is_err());
        assert!(require_positive("Keltner", "multiplier", 0.0).is_err());
        assert_eq!(require_positive("Keltner", "multiplier", 2.0), Ok(2.0));
    }

    #[test]
    fn exit_codes_by_category() {
        use std::process::ExitCode;
        let syntax = BarcalcError::Syntax(SyntaxError::new("x", 0));
        assert_eq!(ExitCode::from(&syntax), ExitCode::from(4));
        let missing = BarcalcError::ConfigMissing {
            section: "indicator".into(),
            key: "id".into(),
        };
        assert_eq!(ExitCode::from(&missing), ExitCode::from(2));
        let bar = BarcalcError::Bar(BarError::Empty);
        assert_eq!(ExitCode::from(&bar), ExitCode::from(3));
    }
}
