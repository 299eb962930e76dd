//! Configuration validation.
//!
//! Checks the value domains of every key that is present. Required values
//! may also come from command-line flags, so their absence is reported when
//! the job is assembled, not here.

use crate::domain::error::BarcalcError;
use crate::domain::expr::ExpressionIndicator;
use crate::ports::config_port::ConfigPort;

pub const MAX_PRECISION: i64 = 17;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), BarcalcError> {
    validate_data(config)?;
    validate_indicator(config)?;
    validate_output(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BarcalcError {
    BarcalcError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<String>, BarcalcError> {
    match config.get_string(section, key) {
        Some(value) if value.trim().is_empty() => Err(invalid(section, key, "must not be empty")),
        other => Ok(other.map(|v| v.trim().to_string())),
    }
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), BarcalcError> {
    non_empty(config, "data", "path")?;
    if let Some(format) = non_empty(config, "data", "timestamp_format")? {
        let known = matches!(format.as_str(), "millis" | "ms" | "rfc3339");
        if !known && !format.contains('%') {
            return Err(invalid(
                "data",
                "timestamp_format",
                format!("'{format}' is not millis, rfc3339 or a strftime pattern"),
            ));
        }
    }
    if let Some(lenient) = config.get_string("data", "lenient") {
        // an unparsable flag yields whichever default is asked for
        let fallback = config.get_bool("data", "lenient", true);
        if fallback != config.get_bool("data", "lenient", false) {
            return Err(invalid("data", "lenient", format!("'{lenient}' is not a boolean")));
        }
    }
    Ok(())
}

fn validate_indicator(config: &dyn ConfigPort) -> Result<(), BarcalcError> {
    let id = non_empty(config, "indicator", "id")?;
    let expression = non_empty(config, "indicator", "expression")?;
    let uses_expression = id.as_deref().is_none_or(|id| id.eq_ignore_ascii_case("expression"));
    if let Some(text) = expression {
        if !uses_expression {
            return Err(invalid(
                "indicator",
                "expression",
                "only valid with id = expression",
            ));
        }
        ExpressionIndicator::validate(&text)?;
    }
    Ok(())
}

fn validate_output(config: &dyn ConfigPort) -> Result<(), BarcalcError> {
    non_empty(config, "output", "path")?;
    if let Some(text) = config.get_string("output", "precision") {
        match text.trim().parse::<i64>() {
            Ok(p) if (0..=MAX_PRECISION).contains(&p) => {}
            _ => {
                return Err(invalid(
                    "output",
                    "precision",
                    format!("'{text}' is not an integer in 0..={MAX_PRECISION}"),
                ));
            }
        }
    }
    if let Some(format) = non_empty(config, "output", "timestamp_format")? {
        let known = matches!(format.as_str(), "millis" | "ms" | "rfc3339");
        if !known && !format.contains('%') {
            return Err(invalid(
                "output",
                "timestamp_format",
                format!("'{format}' is not millis, rfc3339 or a strftime pattern"),
            ));
        }
    }
    Ok(())
}
