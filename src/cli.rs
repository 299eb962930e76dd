//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvAdapter, CsvOutputAdapter, DEFAULT_PRECISION, TimestampFormat};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::validate_config;
use crate::domain::error::{BarcalcError, IndicatorError};
use crate::domain::expr::parse;
use crate::domain::registry::{IndicatorCategory, IndicatorRegistry, ParamValues};
use crate::domain::series::IndicatorOutput;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::output_port::OutputPort;

const EXPRESSION_ID: &str = "expression";

#[derive(Parser, Debug)]
#[command(name = "barcalc", about = "Technical indicators over OHLCV bars")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute an indicator over a CSV bar file
    Calc(CalcArgs),
    /// Check an indicator expression without loading data
    Validate {
        #[arg(short, long)]
        expr: String,
    },
    /// List registered indicators and their parameters
    List {
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct CalcArgs {
    /// INI file with [data], [indicator] and [output] sections
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// CSV file of timestamp,open,high,low,close,volume rows
    #[arg(short, long)]
    pub data: Option<PathBuf>,
    /// Expression such as "SMA(close, 20) + ATR(14) * 2"
    #[arg(short, long, conflicts_with = "indicator")]
    pub expr: Option<String>,
    /// Registered indicator id, see `barcalc list`
    #[arg(short, long)]
    pub indicator: Option<String>,
    /// Indicator parameter as KEY=VALUE, repeatable
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
    /// Output CSV path; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// millis, rfc3339 or a strftime pattern
    #[arg(long)]
    pub timestamp_format: Option<String>,
    /// Decimal places in the output
    #[arg(long)]
    pub precision: Option<usize>,
    /// Skip malformed rows instead of failing
    #[arg(long)]
    pub lenient: bool,
}

/// Everything needed to run one calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct CalcJob {
    pub data_path: PathBuf,
    pub timestamp_format: TimestampFormat,
    pub lenient: bool,
    pub indicator_id: String,
    pub params: ParamValues,
    pub output_path: Option<PathBuf>,
    pub output_timestamp_format: TimestampFormat,
    pub precision: usize,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Calc(args) => run_calc(&args),
        Command::Validate { expr } => run_validate(&expr),
        Command::List { category } => run_list(category.as_deref()),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    let adapter = FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })?;
    validate_config(&adapter).map_err(|err| {
        report(&err);
        ExitCode::from(&err)
    })?;
    Ok(adapter)
}

fn report(err: &BarcalcError) {
    eprintln!("error: {err}");
}

fn run_calc(args: &CalcArgs) -> ExitCode {
    let adapter = match &args.config {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            match load_config(path) {
                Ok(a) => Some(a),
                Err(code) => return code,
            }
        }
        None => None,
    };

    let registry = IndicatorRegistry::with_builtins();
    let config = adapter.as_ref().map(|a| a as &dyn ConfigPort);
    let job = match build_calc_job(config, args, &registry) {
        Ok(job) => job,
        Err(err) => {
            if let (BarcalcError::Syntax(syntax), Some(text)) = (&err, args.expr.as_deref()) {
                eprintln!("error: invalid expression:\n{}", syntax.display_with_context(text));
            } else {
                report(&err);
            }
            return (&err).into();
        }
    };

    match execute(&job, &registry) {
        Ok(output) => {
            eprintln!("Computed {} ({} rows)", output.name(), output.len());
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err);
            (&err).into()
        }
    }
}

/// Merge command-line flags over config values. Flags win.
pub fn build_calc_job(
    config: Option<&dyn ConfigPort>,
    args: &CalcArgs,
    registry: &IndicatorRegistry,
) -> Result<CalcJob, BarcalcError> {
    let setting = |section: &str, key: &str| {
        config
            .and_then(|c| c.get_string(section, key))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let data_path = args
        .data
        .clone()
        .or_else(|| setting("data", "path").map(PathBuf::from))
        .ok_or_else(|| BarcalcError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })?;
    let timestamp_format = args
        .timestamp_format
        .clone()
        .or_else(|| setting("data", "timestamp_format"))
        .map(|f| TimestampFormat::from_name(&f))
        .unwrap_or_default();
    let lenient = args.lenient || config.is_some_and(|c| c.get_bool("data", "lenient", false));

    let config_id = setting("indicator", "id")
        .or_else(|| setting("indicator", "expression").map(|_| EXPRESSION_ID.to_string()))
        .map(|id| id.to_ascii_lowercase());
    let indicator_id = match (&args.expr, &args.indicator) {
        (Some(_), _) => EXPRESSION_ID.to_string(),
        (None, Some(id)) => id.trim().to_ascii_lowercase(),
        (None, None) => config_id.clone().ok_or_else(|| BarcalcError::ConfigMissing {
            section: "indicator".into(),
            key: "id".into(),
        })?,
    };
    let descriptor = registry
        .descriptor(&indicator_id)
        .ok_or_else(|| IndicatorError::UnknownIndicator {
            id: indicator_id.clone(),
        })?;

    let mut raw: Vec<(String, String)> = Vec::new();
    if config_id.as_deref() == Some(indicator_id.as_str()) {
        if let Some(config) = config {
            for key in config.keys("indicator").into_iter().filter(|k| k != "id") {
                if let Some(value) = config.get_string("indicator", &key) {
                    raw.push((key, value));
                }
            }
        }
    }
    for param in &args.params {
        let (key, value) = param.split_once('=').ok_or_else(|| IndicatorError::Parameter {
            id: indicator_id.clone(),
            parameter: param.clone(),
            reason: "expected KEY=VALUE".into(),
        })?;
        raw.push((key.trim().to_string(), value.to_string()));
    }
    if let Some(expr) = &args.expr {
        raw.push(("expression".into(), expr.clone()));
    }
    let params = descriptor.parse_values(raw.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    if indicator_id == EXPRESSION_ID {
        let text = params
            .get("expression")
            .and_then(|v| v.as_text())
            .ok_or_else(|| BarcalcError::ConfigMissing {
                section: "indicator".into(),
                key: "expression".into(),
            })?;
        parse(text)?;
    }

    let output_path = args
        .output
        .clone()
        .or_else(|| setting("output", "path").map(PathBuf::from));
    let output_timestamp_format = setting("output", "timestamp_format")
        .map(|f| TimestampFormat::from_name(&f))
        .unwrap_or_else(|| timestamp_format.clone());
    let precision = match args.precision {
        Some(p) => p,
        None => config
            .map(|c| c.get_int("output", "precision", DEFAULT_PRECISION as i64))
            .and_then(|p| usize::try_from(p).ok())
            .unwrap_or(DEFAULT_PRECISION),
    };

    Ok(CalcJob {
        data_path,
        timestamp_format,
        lenient,
        indicator_id,
        params,
        output_path,
        output_timestamp_format,
        precision,
    })
}

/// Load bars, compute the indicator and write it out.
pub fn execute(job: &CalcJob, registry: &IndicatorRegistry) -> Result<IndicatorOutput, BarcalcError> {
    let indicator = registry.create(&job.indicator_id, &job.params)?;

    eprintln!("Loading bars from {}", job.data_path.display());
    let bars = CsvAdapter::new(&job.data_path)
        .with_timestamp_format(job.timestamp_format.clone())
        .lenient(job.lenient)
        .load_bars()?;
    if bars.len() < indicator.required_bars() {
        eprintln!(
            "warning: {} needs {} bars, only {} loaded; output is all NaN",
            indicator.indicator_name(),
            indicator.required_bars(),
            bars.len()
        );
    }

    let output = indicator.calculate_output(&bars);
    CsvOutputAdapter::new(job.output_path.clone())
        .with_timestamp_format(job.output_timestamp_format.clone())
        .with_precision(job.precision)
        .write_output(&output)?;
    Ok(output)
}

fn run_validate(text: &str) -> ExitCode {
    match parse(text) {
        Ok(expr) => {
            println!("{expr}");
            eprintln!("Expression is valid; needs {} bars.", expr.minimum_bars());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err.display_with_context(text));
            (&BarcalcError::from(err)).into()
        }
    }
}

fn run_list(category: Option<&str>) -> ExitCode {
    let filter = match category.map(|c| (c, IndicatorCategory::from_name(c))) {
        None => None,
        Some((_, Some(category))) => Some(category),
        Some((name, None)) => {
            let known: Vec<&str> = IndicatorCategory::ALL.iter().map(|c| c.name()).collect();
            eprintln!("error: unknown category '{name}', expected one of {}", known.join(", "));
            return ExitCode::from(2);
        }
    };

    let registry = IndicatorRegistry::with_builtins();
    let mut count = 0;
    for descriptor in registry
        .descriptors()
        .filter(|d| filter.is_none_or(|c| d.category == c))
    {
        let overlay = if descriptor.overlay { " (overlay)" } else { "" };
        println!(
            "{:<18} {:<11} {}{overlay}",
            descriptor.id, descriptor.category, descriptor.display_name
        );
        for param in &descriptor.parameters {
            println!("    {:<22} {}", param.name, param.describe());
        }
        count += 1;
    }
    eprintln!("{count} indicators");
    ExitCode::SUCCESS
}
