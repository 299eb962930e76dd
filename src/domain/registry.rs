//! Indicator registry for creating indicators by id.
//!
//! Each entry pairs an [`IndicatorDescriptor`] (display metadata plus typed,
//! bounded parameters) with a factory. [`IndicatorRegistry::create`] fills in
//! defaults and validates every value before the factory sees it, so
//! factories only read parameters that are present and in range.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::error::IndicatorError;
use crate::domain::expr::ExpressionIndicator;
use crate::domain::indicator::DynIndicator;
use crate::domain::indicator::adx::{self, Adx};
use crate::domain::indicator::atr::Atr;
use crate::domain::indicator::bollinger::{self, BollingerBands};
use crate::domain::indicator::cci::{self, Cci};
use crate::domain::indicator::donchian::{self, DonchianChannels};
use crate::domain::indicator::ema::Ema;
use crate::domain::indicator::hma::Hma;
use crate::domain::indicator::ichimoku::{self, Ichimoku};
use crate::domain::indicator::keltner::{self, KeltnerChannels};
use crate::domain::indicator::macd::{self, Macd};
use crate::domain::indicator::obv::Obv;
use crate::domain::indicator::pivot::{PivotKind, PivotPoints};
use crate::domain::indicator::psar::{self, ParabolicSar};
use crate::domain::indicator::roc::{Momentum, Roc};
use crate::domain::indicator::rsi::Rsi;
use crate::domain::indicator::sma::Sma;
use crate::domain::indicator::stddev::StdDev;
use crate::domain::indicator::stochastic::{self, Stochastic};
use crate::domain::indicator::volume_delta::{CumulativeDelta, VolumeDelta};
use crate::domain::indicator::vwap::{AnchoredVwap, Vwap};
use crate::domain::indicator::williams_r::{self, WilliamsR};
use crate::domain::indicator::wma::Wma;
use crate::domain::price_field::PriceField;

/// Creates an indicator from validated parameter values.
pub type IndicatorFactory =
    Box<dyn Fn(&ParamValues) -> Result<Box<dyn DynIndicator>, IndicatorError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorCategory {
    Trend,
    Momentum,
    Volatility,
    Volume,
    Custom,
}

impl IndicatorCategory {
    pub const ALL: [IndicatorCategory; 5] = [
        IndicatorCategory::Trend,
        IndicatorCategory::Momentum,
        IndicatorCategory::Volatility,
        IndicatorCategory::Volume,
        IndicatorCategory::Custom,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn name(self) -> &'static str {
        match self {
            IndicatorCategory::Trend => "trend",
            IndicatorCategory::Momentum => "momentum",
            IndicatorCategory::Volatility => "volatility",
            IndicatorCategory::Volume => "volume",
            IndicatorCategory::Custom => "custom",
        }
    }
}

impl fmt::Display for IndicatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl ParamValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

/// Named parameter values, keyed by lowercase name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamValues {
    values: BTreeMap<String, ParamValue>,
}

impl ParamValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_ascii_lowercase(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    Int { min: i64, max: i64, default: i64 },
    Float { min: f64, max: f64, default: f64 },
    Bool { default: bool },
    Choice { options: Vec<String>, default: String },
    Text { default: String },
}

/// A typed, bounded indicator parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
}

impl ParameterSpec {
    pub fn int(name: &str, min: i64, max: i64, default: i64) -> Self {
        Self::new(name, ParameterKind::Int { min, max, default })
    }

    pub fn float(name: &str, min: f64, max: f64, default: f64) -> Self {
        Self::new(name, ParameterKind::Float { min, max, default })
    }

    pub fn boolean(name: &str, default: bool) -> Self {
        Self::new(name, ParameterKind::Bool { default })
    }

    pub fn choice(name: &str, options: &[&str], default: &str) -> Self {
        Self::new(
            name,
            ParameterKind::Choice {
                options: options.iter().map(|o| o.to_string()).collect(),
                default: default.to_string(),
            },
        )
    }

    pub fn text(name: &str, default: &str) -> Self {
        Self::new(
            name,
            ParameterKind::Text {
                default: default.to_string(),
            },
        )
    }

    fn new(name: &str, kind: ParameterKind) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            kind,
        }
    }

    pub fn default_value(&self) -> ParamValue {
        match &self.kind {
            ParameterKind::Int { default, .. } => ParamValue::Int(*default),
            ParameterKind::Float { default, .. } => ParamValue::Float(*default),
            ParameterKind::Bool { default } => ParamValue::Bool(*default),
            ParameterKind::Choice { default, .. } | ParameterKind::Text { default } => {
                ParamValue::Text(default.clone())
            }
        }
    }

    /// Interpret raw text, as read from a config file, as this parameter's type.
    pub fn parse_value(&self, raw: &str) -> Result<ParamValue, String> {
        let raw = raw.trim();
        let value = match &self.kind {
            ParameterKind::Int { .. } => raw
                .parse::<i64>()
                .map(ParamValue::Int)
                .map_err(|_| format!("expected an integer, got '{raw}'"))?,
            ParameterKind::Float { .. } => raw
                .parse::<f64>()
                .map(ParamValue::Float)
                .map_err(|_| format!("expected a number, got '{raw}'"))?,
            ParameterKind::Bool { .. } => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => ParamValue::Bool(true),
                "false" | "no" | "off" | "0" => ParamValue::Bool(false),
                _ => return Err(format!("expected true or false, got '{raw}'")),
            },
            ParameterKind::Choice { .. } | ParameterKind::Text { .. } => {
                ParamValue::Text(raw.to_string())
            }
        };
        self.validate(&value)
    }

    /// Check type and bounds, returning the normalized value.
    pub fn validate(&self, value: &ParamValue) -> Result<ParamValue, String> {
        match (&self.kind, value) {
            (ParameterKind::Int { min, max, .. }, ParamValue::Int(v)) => {
                if v < min || v > max {
                    return Err(format!("{v} is outside {min}..={max}"));
                }
                Ok(ParamValue::Int(*v))
            }
            (ParameterKind::Float { min, max, .. }, ParamValue::Int(_) | ParamValue::Float(_)) => {
                let v = value.as_float().unwrap_or(f64::NAN);
                if !v.is_finite() || v < *min || v > *max {
                    return Err(format!("{v} is outside {min}..={max}"));
                }
                Ok(ParamValue::Float(v))
            }
            (ParameterKind::Bool { .. }, ParamValue::Bool(v)) => Ok(ParamValue::Bool(*v)),
            (ParameterKind::Choice { options, .. }, ParamValue::Text(v)) => options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(v.trim()))
                .map(|o| ParamValue::Text(o.clone()))
                .ok_or_else(|| format!("'{v}' is not one of {}", options.join(", "))),
            (ParameterKind::Text { .. }, ParamValue::Text(v)) => Ok(ParamValue::Text(v.clone())),
            (kind, other) => Err(format!("expected {}, got '{other}'", kind.type_name())),
        }
    }

    /// Short description such as `int 1..=500, default 14`.
    pub fn describe(&self) -> String {
        match &self.kind {
            ParameterKind::Int { min, max, default } => {
                format!("int {min}..={max}, default {default}")
            }
            ParameterKind::Float { min, max, default } => {
                format!("float {min}..={max}, default {default}")
            }
            ParameterKind::Bool { default } => format!("bool, default {default}"),
            ParameterKind::Choice { options, default } => {
                format!("one of {}, default {default}", options.join("|"))
            }
            ParameterKind::Text { default } if default.is_empty() => "text".to_string(),
            ParameterKind::Text { default } => format!("text, default {default}"),
        }
    }
}

impl ParameterKind {
    fn type_name(&self) -> &'static str {
        match self {
            ParameterKind::Int { .. } => "an integer",
            ParameterKind::Float { .. } => "a number",
            ParameterKind::Bool { .. } => "a boolean",
            ParameterKind::Choice { .. } => "a choice",
            ParameterKind::Text { .. } => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorDescriptor {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub category: IndicatorCategory,
    /// Drawn over price rather than in its own pane.
    pub overlay: bool,
    pub parameters: Vec<ParameterSpec>,
}

impl IndicatorDescriptor {
    pub fn new(id: &str, display_name: &str, category: IndicatorCategory) -> Self {
        Self {
            id: id.to_ascii_lowercase(),
            display_name: display_name.to_string(),
            description: String::new(),
            category,
            overlay: false,
            parameters: Vec::new(),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn overlay(mut self) -> Self {
        self.overlay = true;
        self
    }

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Typed values from raw `(name, text)` pairs.
    pub fn parse_values<'a>(
        &self,
        raw: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<ParamValues, IndicatorError> {
        let mut values = ParamValues::new();
        for (name, text) in raw {
            let spec = self.parameter(name).ok_or_else(|| self.unknown_parameter(name))?;
            let value = spec
                .parse_value(text)
                .map_err(|reason| self.parameter_error(&spec.name, reason))?;
            values.set(&spec.name, value);
        }
        Ok(values)
    }

    /// Every declared parameter, validated, with defaults for the missing ones.
    pub fn resolve(&self, given: &ParamValues) -> Result<ParamValues, IndicatorError> {
        if let Some((name, _)) = given.iter().find(|(name, _)| self.parameter(name).is_none()) {
            return Err(self.unknown_parameter(name));
        }
        let mut resolved = ParamValues::new();
        for spec in &self.parameters {
            let value = match given.get(&spec.name) {
                Some(value) => spec
                    .validate(value)
                    .map_err(|reason| self.parameter_error(&spec.name, reason))?,
                None => spec.default_value(),
            };
            resolved.set(&spec.name, value);
        }
        Ok(resolved)
    }

    fn unknown_parameter(&self, name: &str) -> IndicatorError {
        self.parameter_error(name, "unknown parameter".to_string())
    }

    fn parameter_error(&self, name: &str, reason: String) -> IndicatorError {
        IndicatorError::Parameter {
            id: self.id.clone(),
            parameter: name.to_string(),
            reason,
        }
    }
}

struct Entry {
    descriptor: IndicatorDescriptor,
    factory: IndicatorFactory,
}

/// Registered indicators, kept in registration order.
#[derive(Default)]
pub struct IndicatorRegistry {
    entries: Vec<Entry>,
}

impl IndicatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, descriptor: IndicatorDescriptor, factory: F) -> Result<(), IndicatorError>
    where
        F: Fn(&ParamValues) -> Result<Box<dyn DynIndicator>, IndicatorError> + Send + Sync + 'static,
    {
        if self.is_registered(&descriptor.id) {
            return Err(IndicatorError::DuplicateIndicator { id: descriptor.id });
        }
        tracing::debug!(id = %descriptor.id, "registered indicator");
        self.entries.push(Entry {
            descriptor,
            factory: Box::new(factory),
        });
        Ok(())
    }

    /// Remove an indicator, returning its descriptor if it was registered.
    pub fn unregister(&mut self, id: &str) -> Option<IndicatorDescriptor> {
        let index = self.position(id)?;
        Some(self.entries.remove(index).descriptor)
    }

    pub fn descriptor(&self, id: &str) -> Option<&IndicatorDescriptor> {
        self.position(id).map(|i| &self.entries[i].descriptor)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &IndicatorDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn by_category(&self, category: IndicatorCategory) -> impl Iterator<Item = &IndicatorDescriptor> {
        self.descriptors().filter(move |d| d.category == category)
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn create(&self, id: &str, values: &ParamValues) -> Result<Box<dyn DynIndicator>, IndicatorError> {
        let entry = self
            .position(id)
            .map(|i| &self.entries[i])
            .ok_or_else(|| IndicatorError::UnknownIndicator { id: id.to_string() })?;
        let resolved = entry.descriptor.resolve(values)?;
        let indicator = (entry.factory)(&resolved)?;
        tracing::debug!(id = %entry.descriptor.id, name = indicator.indicator_name(), "created indicator");
        Ok(indicator)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.descriptor.id.eq_ignore_ascii_case(id.trim()))
    }

    /// A registry holding every built-in indicator plus `expression`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (descriptor, factory) in builtins() {
            if let Err(err) = registry.register(descriptor, factory) {
                tracing::warn!(%err, "skipping built-in indicator");
            }
        }
        registry
    }
}

impl fmt::Debug for IndicatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.descriptor.id))
            .finish()
    }
}

const MAX_PERIOD: i64 = 1000;

fn period_param(name: &str, default: usize) -> ParameterSpec {
    ParameterSpec::int(name, 1, MAX_PERIOD, default as i64)
}

fn source_param() -> ParameterSpec {
    let names: Vec<&str> = PriceField::ALL.iter().map(|f| f.name()).collect();
    ParameterSpec::choice("source", &names, PriceField::Close.name())
}

fn missing(parameter: &str) -> IndicatorError {
    IndicatorError::Parameter {
        id: String::new(),
        parameter: parameter.to_string(),
        reason: "missing value".to_string(),
    }
}

fn int(values: &ParamValues, name: &str) -> Result<i64, IndicatorError> {
    values.get(name).and_then(ParamValue::as_int).ok_or_else(|| missing(name))
}

fn period(values: &ParamValues, name: &str) -> Result<usize, IndicatorError> {
    let v = int(values, name)?;
    usize::try_from(v).map_err(|_| IndicatorError::Parameter {
        id: String::new(),
        parameter: name.to_string(),
        reason: format!("{v} is negative"),
    })
}

fn float(values: &ParamValues, name: &str) -> Result<f64, IndicatorError> {
    values.get(name).and_then(ParamValue::as_float).ok_or_else(|| missing(name))
}

fn text<'a>(values: &'a ParamValues, name: &str) -> Result<&'a str, IndicatorError> {
    values.get(name).and_then(ParamValue::as_text).ok_or_else(|| missing(name))
}

fn source(values: &ParamValues) -> Result<PriceField, IndicatorError> {
    let name = text(values, "source")?;
    PriceField::from_name(name).ok_or_else(|| IndicatorError::Parameter {
        id: String::new(),
        parameter: "source".to_string(),
        reason: format!("unknown price field '{name}'"),
    })
}

fn boxed<T: DynIndicator + 'static>(indicator: T) -> Result<Box<dyn DynIndicator>, IndicatorError> {
    Ok(Box::new(indicator))
}

type Builtin = (IndicatorDescriptor, IndicatorFactory);

fn entry<F>(descriptor: IndicatorDescriptor, factory: F) -> Builtin
where
    F: Fn(&ParamValues) -> Result<Box<dyn DynIndicator>, IndicatorError> + Send + Sync + 'static,
{
    (descriptor, Box::new(factory))
}

fn builtins() -> Vec<Builtin> {
    vec![
        entry(
            IndicatorDescriptor::new("sma", "Simple Moving Average", IndicatorCategory::Trend)
                .description("Arithmetic mean over a sliding window")
                .overlay()
                .param(period_param("period", 20))
                .param(source_param()),
            |v| boxed(Sma::new(period(v, "period")?)?.with_source(source(v)?)),
        ),
        entry(
            IndicatorDescriptor::new("ema", "Exponential Moving Average", IndicatorCategory::Trend)
                .description("SMA-seeded exponential smoothing")
                .overlay()
                .param(period_param("period", 20))
                .param(source_param()),
            |v| boxed(Ema::new(period(v, "period")?)?.with_source(source(v)?)),
        ),
        entry(
            IndicatorDescriptor::new("wma", "Weighted Moving Average", IndicatorCategory::Trend)
                .description("Linearly weighted mean, newest bar heaviest")
                .overlay()
                .param(period_param("period", 20))
                .param(source_param()),
            |v| boxed(Wma::new(period(v, "period")?)?.with_source(source(v)?)),
        ),
        entry(
            IndicatorDescriptor::new("hma", "Hull Moving Average", IndicatorCategory::Trend)
                .description("WMA of 2*WMA(n/2) - WMA(n) over sqrt(n) bars")
                .overlay()
                .param(period_param("period", 20))
                .param(source_param()),
            |v| boxed(Hma::new(period(v, "period")?)?.with_source(source(v)?)),
        ),
        entry(
            IndicatorDescriptor::new("adx", "Average Directional Index", IndicatorCategory::Trend)
                .description("Trend strength with +DI and -DI")
                .param(period_param("period", adx::DEFAULT_PERIOD)),
            |v| boxed(Adx::new(period(v, "period")?)?),
        ),
        entry(
            IndicatorDescriptor::new("psar", "Parabolic SAR", IndicatorCategory::Trend)
                .description("Stop-and-reverse trailing level")
                .overlay()
                .param(ParameterSpec::float("start", 0.001, 1.0, psar::DEFAULT_START))
                .param(ParameterSpec::float("step", 0.001, 1.0, psar::DEFAULT_STEP))
                .param(ParameterSpec::float("max", 0.001, 1.0, psar::DEFAULT_MAX)),
            |v| boxed(ParabolicSar::new(float(v, "start")?, float(v, "step")?, float(v, "max")?)?),
        ),
        entry(
            IndicatorDescriptor::new("ichimoku", "Ichimoku Cloud", IndicatorCategory::Trend)
                .description("Tenkan, kijun, senkou spans and chikou")
                .overlay()
                .param(period_param("tenkan", ichimoku::DEFAULT_TENKAN))
                .param(period_param("kijun", ichimoku::DEFAULT_KIJUN))
                .param(period_param("senkou", ichimoku::DEFAULT_SENKOU))
                .param(period_param("displacement", ichimoku::DEFAULT_DISPLACEMENT)),
            |v| {
                boxed(Ichimoku::new(
                    period(v, "tenkan")?,
                    period(v, "kijun")?,
                    period(v, "senkou")?,
                    period(v, "displacement")?,
                )?)
            },
        ),
        entry(
            IndicatorDescriptor::new("pivot", "Pivot Points", IndicatorCategory::Trend)
                .description("Support and resistance from the previous bar")
                .overlay()
                .param(ParameterSpec::choice("kind", &PivotKind::NAMES, PivotKind::Standard.name())),
            |v| {
                let name = text(v, "kind")?;
                let kind = PivotKind::from_name(name).ok_or_else(|| missing("kind"))?;
                boxed(PivotPoints::new(kind))
            },
        ),
        entry(
            IndicatorDescriptor::new("rsi", "Relative Strength Index", IndicatorCategory::Momentum)
                .description("Wilder RSI, 0 to 100")
                .param(period_param("period", 14))
                .param(source_param()),
            |v| boxed(Rsi::new(period(v, "period")?)?.with_source(source(v)?)),
        ),
        entry(
            IndicatorDescriptor::new("macd", "MACD", IndicatorCategory::Momentum)
                .description("Fast EMA minus slow EMA, with signal and histogram")
                .param(period_param("fast", macd::DEFAULT_FAST))
                .param(period_param("slow", macd::DEFAULT_SLOW))
                .param(period_param("signal", macd::DEFAULT_SIGNAL))
                .param(source_param()),
            |v| {
                let macd = Macd::new(period(v, "fast")?, period(v, "slow")?, period(v, "signal")?)?;
                boxed(macd.with_source(source(v)?))
            },
        ),
        entry(
            IndicatorDescriptor::new("roc", "Rate of Change", IndicatorCategory::Momentum)
                .description("Percent change over the period")
                .param(period_param("period", 10))
                .param(source_param()),
            |v| boxed(Roc::new(period(v, "period")?)?.with_source(source(v)?)),
        ),
        entry(
            IndicatorDescriptor::new("momentum", "Momentum", IndicatorCategory::Momentum)
                .description("Difference over the period")
                .param(period_param("period", 10))
                .param(source_param()),
            |v| boxed(Momentum::new(period(v, "period")?)?.with_source(source(v)?)),
        ),
        entry(
            IndicatorDescriptor::new("stochastic", "Stochastic Oscillator", IndicatorCategory::Momentum)
                .description("Smoothed %K and its %D average")
                .param(period_param("k", stochastic::DEFAULT_K))
                .param(period_param("d", stochastic::DEFAULT_D))
                .param(period_param("slowing", stochastic::DEFAULT_SLOWING)),
            |v| boxed(Stochastic::new(period(v, "k")?, period(v, "d")?, period(v, "slowing")?)?),
        ),
        entry(
            IndicatorDescriptor::new("cci", "Commodity Channel Index", IndicatorCategory::Momentum)
                .description("Typical price deviation from its mean")
                .param(period_param("period", cci::DEFAULT_PERIOD)),
            |v| boxed(Cci::new(period(v, "period")?)?),
        ),
        entry(
            IndicatorDescriptor::new("williams_r", "Williams %R", IndicatorCategory::Momentum)
                .description("Close within the high-low range, -100 to 0")
                .param(period_param("period", williams_r::DEFAULT_PERIOD)),
            |v| boxed(WilliamsR::new(period(v, "period")?)?),
        ),
        entry(
            IndicatorDescriptor::new("atr", "Average True Range", IndicatorCategory::Volatility)
                .description("Wilder-smoothed true range")
                .param(period_param("period", 14)),
            |v| boxed(Atr::new(period(v, "period")?)?),
        ),
        entry(
            IndicatorDescriptor::new("stddev", "Standard Deviation", IndicatorCategory::Volatility)
                .description("Population standard deviation over the window")
                .param(period_param("period", 20))
                .param(source_param()),
            |v| boxed(StdDev::new(period(v, "period")?)?.with_source(source(v)?)),
        ),
        entry(
            IndicatorDescriptor::new("bollinger", "Bollinger Bands", IndicatorCategory::Volatility)
                .description("SMA with standard deviation bands")
                .overlay()
                .param(period_param("period", bollinger::DEFAULT_PERIOD))
                .param(ParameterSpec::float("multiplier", 0.1, 10.0, bollinger::DEFAULT_MULTIPLIER))
                .param(source_param()),
            |v| {
                let bands = BollingerBands::new(period(v, "period")?, float(v, "multiplier")?)?;
                boxed(bands.with_source(source(v)?))
            },
        ),
        entry(
            IndicatorDescriptor::new("keltner", "Keltner Channels", IndicatorCategory::Volatility)
                .description("EMA with ATR bands")
                .overlay()
                .param(period_param("ema_period", keltner::DEFAULT_EMA_PERIOD))
                .param(period_param("atr_period", keltner::DEFAULT_ATR_PERIOD))
                .param(ParameterSpec::float("multiplier", 0.1, 10.0, keltner::DEFAULT_MULTIPLIER)),
            |v| {
                boxed(KeltnerChannels::new(
                    period(v, "ema_period")?,
                    period(v, "atr_period")?,
                    float(v, "multiplier")?,
                )?)
            },
        ),
        entry(
            IndicatorDescriptor::new("donchian", "Donchian Channels", IndicatorCategory::Volatility)
                .description("Highest high and lowest low")
                .overlay()
                .param(period_param("period", donchian::DEFAULT_PERIOD)),
            |v| boxed(DonchianChannels::new(period(v, "period")?)?),
        ),
        entry(
            IndicatorDescriptor::new("obv", "On-Balance Volume", IndicatorCategory::Volume)
                .description("Volume added on up closes, subtracted on down closes"),
            |_| boxed(Obv::new()),
        ),
        entry(
            IndicatorDescriptor::new("vwap", "VWAP", IndicatorCategory::Volume)
                .description("Volume-weighted typical price, reset each session")
                .overlay()
                .param(ParameterSpec::int("session_offset_hours", -23, 23, 0)),
            |v| {
                let hours = int(v, "session_offset_hours")?;
                boxed(Vwap::new().with_session_offset(hours * 3_600_000))
            },
        ),
        entry(
            IndicatorDescriptor::new("avwap", "Anchored VWAP", IndicatorCategory::Volume)
                .description("Volume-weighted typical price from an anchor timestamp")
                .overlay()
                .param(ParameterSpec::int("anchor", i64::MIN, i64::MAX, 0)),
            |v| boxed(AnchoredVwap::new(int(v, "anchor")?)),
        ),
        entry(
            IndicatorDescriptor::new("volume_delta", "Volume Delta", IndicatorCategory::Volume)
                .description("Estimated buy minus sell volume per bar"),
            |_| boxed(VolumeDelta::new()),
        ),
        entry(
            IndicatorDescriptor::new("cumulative_delta", "Cumulative Delta", IndicatorCategory::Volume)
                .description("Running total of volume delta"),
            |_| boxed(CumulativeDelta::new()),
        ),
        entry(
            IndicatorDescriptor::new("expression", "Expression", IndicatorCategory::Custom)
                .description("Indicator defined by an expression")
                .param(ParameterSpec::text("expression", "close"))
                .param(ParameterSpec::text("name", "")),
            |v| {
                let indicator = ExpressionIndicator::new(text(v, "expression")?)?;
                match text(v, "name")? {
                    "" => boxed(indicator),
                    name => boxed(indicator.with_name(name)),
                }
            },
        ),
    ]
}
