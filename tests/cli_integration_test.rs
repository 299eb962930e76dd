//! CLI integration tests for the calc, validate and list commands.
//!
//! Tests cover:
//! - Job assembly from INI files on disk (build_calc_job)
//! - Command-line flags overriding config values
//! - Full calculation with CSV input and output files (execute)
//! - Exit codes of the validate and list commands

mod common;

use barcalc::adapters::csv_adapter::TimestampFormat;
use barcalc::adapters::file_config_adapter::FileConfigAdapter;
use barcalc::cli::{self, CalcArgs, Cli, Command};
use barcalc::domain::error::{BarcalcError, IndicatorError};
use barcalc::domain::registry::{IndicatorRegistry, ParamValue};
use barcalc::ports::config_port::ConfigPort;
use common::*;
use std::path::PathBuf;
use std::process::ExitCode;

const SMA_INI: &str = r#"
[data]
path = bars.csv
timestamp_format = %Y-%m-%d

[indicator]
id = sma
period = 3
source = hl2

[output]
path = sma.csv
precision = 2
"#;

fn config_from(content: &str) -> (tempfile::NamedTempFile, FileConfigAdapter) {
    let file = write_temp_file(content);
    let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
    (file, adapter)
}

fn assert_exit(actual: ExitCode, expected: ExitCode) {
    assert_eq!(format!("{actual:?}"), format!("{expected:?}"));
}

mod job_from_config {
    use super::*;

    #[test]
    fn config_file_supplies_everything() {
        let (_file, adapter) = config_from(SMA_INI);
        let registry = IndicatorRegistry::with_builtins();
        let job = cli::build_calc_job(Some(&adapter as &dyn ConfigPort), &CalcArgs::default(), &registry).unwrap();
        assert_eq!(job.data_path, PathBuf::from("bars.csv"));
        assert_eq!(job.timestamp_format, TimestampFormat::Pattern("%Y-%m-%d".into()));
        assert_eq!(job.indicator_id, "sma");
        assert_eq!(job.params.get("period"), Some(&ParamValue::Int(3)));
        assert_eq!(job.params.get("source"), Some(&ParamValue::Text("hl2".into())));
        assert_eq!(job.output_path, Some(PathBuf::from("sma.csv")));
        assert_eq!(job.output_timestamp_format, job.timestamp_format);
        assert_eq!(job.precision, 2);
        assert!(!job.lenient);
    }

    #[test]
    fn flags_override_config() {
        let (_file, adapter) = config_from(SMA_INI);
        let registry = IndicatorRegistry::with_builtins();
        let args = CalcArgs {
            data: Some(PathBuf::from("other.csv")),
            params: vec!["period=7".into()],
            output: Some(PathBuf::from("out.csv")),
            timestamp_format: Some("rfc3339".into()),
            precision: Some(4),
            lenient: true,
            ..CalcArgs::default()
        };
        let job = cli::build_calc_job(Some(&adapter as &dyn ConfigPort), &args, &registry).unwrap();
        assert_eq!(job.data_path, PathBuf::from("other.csv"));
        assert_eq!(job.timestamp_format, TimestampFormat::Rfc3339);
        assert_eq!(job.params.get("period"), Some(&ParamValue::Int(7)));
        assert_eq!(job.params.get("source"), Some(&ParamValue::Text("hl2".into())));
        assert_eq!(job.output_path, Some(PathBuf::from("out.csv")));
        assert_eq!(job.precision, 4);
        assert!(job.lenient);
    }

    #[test]
    fn other_indicator_ignores_config_parameters() {
        let (_file, adapter) = config_from(SMA_INI);
        let registry = IndicatorRegistry::with_builtins();
        let args = CalcArgs {
            indicator: Some("RSI".into()),
            ..CalcArgs::default()
        };
        let job = cli::build_calc_job(Some(&adapter as &dyn ConfigPort), &args, &registry).unwrap();
        assert_eq!(job.indicator_id, "rsi");
        assert!(job.params.is_empty());
    }

    #[test]
    fn expression_section_selects_expression_indicator() {
        let (_file, adapter) = config_from(
            "[data]\npath = bars.csv\n[indicator]\nexpression = (high + low) / 2 - SMA(close, 5)\n",
        );
        let registry = IndicatorRegistry::with_builtins();
        let job = cli::build_calc_job(Some(&adapter as &dyn ConfigPort), &CalcArgs::default(), &registry).unwrap();
        assert_eq!(job.indicator_id, "expression");
        assert_eq!(
            job.params.get("expression").and_then(|v| v.as_text()),
            Some("(high + low) / 2 - SMA(close, 5)")
        );
    }

    #[test]
    fn missing_data_path_is_reported() {
        let (_file, adapter) = config_from("[indicator]\nid = sma\n");
        let registry = IndicatorRegistry::with_builtins();
        let err = cli::build_calc_job(Some(&adapter as &dyn ConfigPort), &CalcArgs::default(), &registry).unwrap_err();
        assert!(matches!(
            err,
            BarcalcError::ConfigMissing { ref section, ref key } if section == "data" && key == "path"
        ));
    }

    #[test]
    fn unknown_parameter_is_reported() {
        let registry = IndicatorRegistry::with_builtins();
        let args = CalcArgs {
            data: Some(PathBuf::from("bars.csv")),
            indicator: Some("ema".into()),
            params: vec!["width=3".into()],
            ..CalcArgs::default()
        };
        let err = cli::build_calc_job(None, &args, &registry).unwrap_err();
        assert!(matches!(
            err,
            BarcalcError::Indicator(IndicatorError::Parameter { ref parameter, .. }) if parameter == "width"
        ));
    }

    #[test]
    fn config_with_bad_precision_fails_to_load() {
        let file = write_temp_file("[output]\nprecision = 99\n");
        assert_exit(cli::load_config(file.path()).err().unwrap(), ExitCode::from(2));
    }

    #[test]
    fn config_keys_are_listed() {
        let (_file, adapter) = config_from(SMA_INI);
        assert_eq!(adapter.keys("indicator"), vec!["id", "period", "source"]);
    }
}

mod execute_jobs {
    use super::*;

    fn dated_csv(closes: &[f64]) -> String {
        let mut text = String::from("date,open,high,low,close,volume\n");
        for (i, c) in closes.iter().enumerate() {
            text.push_str(&format!("2024-01-{:02},{c},{},{},{c},100\n", i + 1, c + 1.0, c - 1.0));
        }
        text
    }

    #[test]
    fn sma_written_to_output_file() {
        let data = write_temp_file(&dated_csv(&[10.0, 11.0, 12.0, 13.0]));
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sma.csv");
        let registry = IndicatorRegistry::with_builtins();
        let args = CalcArgs {
            data: Some(data.path().to_path_buf()),
            indicator: Some("sma".into()),
            params: vec!["period=2".into()],
            output: Some(out.clone()),
            timestamp_format: Some("%Y-%m-%d".into()),
            precision: Some(1),
            ..CalcArgs::default()
        };
        let job = cli::build_calc_job(None, &args, &registry).unwrap();
        let output = cli::execute(&job, &registry).unwrap();
        assert_eq!(output.name(), "SMA(2)");
        assert_eq!(output.len(), 4);

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(
            written,
            "timestamp,value\n2024-01-01,\n2024-01-02,10.5\n2024-01-03,11.5\n2024-01-04,12.5\n"
        );
    }

    #[test]
    fn expression_from_config_file() {
        let data = write_temp_file(&bars_csv(&make_bars(&[1.0, 2.0, 4.0])));
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("diff.csv");
        let ini = format!(
            "[data]\npath = {}\n[indicator]\nexpression = close - close[1]\n[output]\npath = {}\nprecision = 0\n",
            data.path().display(),
            out.display()
        );
        let (_file, adapter) = config_from(&ini);
        let registry = IndicatorRegistry::with_builtins();
        let job = cli::build_calc_job(Some(&adapter as &dyn ConfigPort), &CalcArgs::default(), &registry).unwrap();
        cli::execute(&job, &registry).unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written, format!("timestamp,value\n0,\n{DAY_MS},1\n{},2\n", 2 * DAY_MS));
    }

    #[test]
    fn lenient_job_skips_bad_rows() {
        let data = write_temp_file(
            "timestamp,open,high,low,close,volume\n0,1,1,1,1,1\nbad,1,1,1,1,1\n86400000,2,2,2,2,1\n",
        );
        let dir = tempfile::tempdir().unwrap();
        let registry = IndicatorRegistry::with_builtins();
        let mut args = CalcArgs {
            data: Some(data.path().to_path_buf()),
            indicator: Some("obv".into()),
            output: Some(dir.path().join("obv.csv")),
            ..CalcArgs::default()
        };
        let strict = cli::build_calc_job(None, &args, &registry).unwrap();
        assert!(matches!(cli::execute(&strict, &registry), Err(BarcalcError::Csv { .. })));

        args.lenient = true;
        let lenient = cli::build_calc_job(None, &args, &registry).unwrap();
        assert_eq!(cli::execute(&lenient, &registry).unwrap().len(), 2);
    }

    #[test]
    fn missing_data_file_is_csv_error() {
        let registry = IndicatorRegistry::with_builtins();
        let args = CalcArgs {
            data: Some(PathBuf::from("/nonexistent/bars.csv")),
            indicator: Some("sma".into()),
            ..CalcArgs::default()
        };
        let job = cli::build_calc_job(None, &args, &registry).unwrap();
        let err = cli::execute(&job, &registry).unwrap_err();
        assert!(matches!(err, BarcalcError::Csv { .. }));
        assert_exit(ExitCode::from(&err), ExitCode::from(3));
    }
}

mod commands {
    use super::*;

    #[test]
    fn validate_accepts_good_expression() {
        let code = cli::run(Cli {
            command: Command::Validate {
                expr: "ema(close, 12) - ema(close, 26)".into(),
            },
        });
        assert_exit(code, ExitCode::SUCCESS);
    }

    #[test]
    fn validate_rejects_bad_expression() {
        let code = cli::run(Cli {
            command: Command::Validate {
                expr: "SMA(close, 0)".into(),
            },
        });
        assert_exit(code, ExitCode::from(4));
    }

    #[test]
    fn list_with_known_and_unknown_category() {
        let code = cli::run(Cli {
            command: Command::List {
                category: Some("volatility".into()),
            },
        });
        assert_exit(code, ExitCode::SUCCESS);
        let code = cli::run(Cli {
            command: Command::List {
                category: Some("astrology".into()),
            },
        });
        assert_exit(code, ExitCode::from(2));
    }

    #[test]
    fn calc_with_unknown_indicator_fails() {
        let code = cli::run(Cli {
            command: Command::Calc(CalcArgs {
                data: Some(PathBuf::from("bars.csv")),
                indicator: Some("nope".into()),
                ..CalcArgs::default()
            }),
        });
        assert_exit(code, ExitCode::from(4));
    }
}
