//! CSV bar input and series output.
//!
//! Input files need a header naming `timestamp` (or `date`/`time`), `open`,
//! `high`, `low`, `close` and `volume`, in any order. Output rows are
//! `timestamp,<column...>` with NaN written as an empty cell.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};

use crate::domain::error::BarcalcError;
use crate::domain::ohlcv::{Bar, BarSeries};
use crate::domain::series::IndicatorOutput;
use crate::ports::data_port::DataPort;
use crate::ports::output_port::OutputPort;

pub const DEFAULT_PRECISION: usize = 6;

/// How timestamps are written in a CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    /// Unix epoch milliseconds.
    #[default]
    Millis,
    Rfc3339,
    /// A chrono `strftime` pattern, date-only or date-time, read as UTC.
    Pattern(String),
}

impl TimestampFormat {
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "" | "millis" | "ms" => TimestampFormat::Millis,
            "rfc3339" => TimestampFormat::Rfc3339,
            pattern => TimestampFormat::Pattern(pattern.to_string()),
        }
    }

    pub fn parse(&self, text: &str) -> Result<i64, String> {
        let text = text.trim();
        match self {
            TimestampFormat::Millis => text
                .parse::<i64>()
                .map_err(|_| format!("invalid millisecond timestamp '{text}'")),
            TimestampFormat::Rfc3339 => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.timestamp_millis())
                .map_err(|e| format!("invalid RFC 3339 timestamp '{text}': {e}")),
            TimestampFormat::Pattern(pattern) => {
                if let Ok(dt) = NaiveDateTime::parse_from_str(text, pattern) {
                    return Ok(dt.and_utc().timestamp_millis());
                }
                NaiveDate::parse_from_str(text, pattern)
                    .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis())
                    .map_err(|e| format!("timestamp '{text}' does not match '{pattern}': {e}"))
            }
        }
    }

    /// Falls back to milliseconds when the pattern cannot render the timestamp.
    pub fn format(&self, timestamp: i64) -> String {
        let utc = DateTime::from_timestamp_millis(timestamp);
        match (self, utc) {
            (TimestampFormat::Rfc3339, Some(dt)) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            (TimestampFormat::Pattern(pattern), Some(dt)) => {
                let mut text = String::new();
                match write!(text, "{}", dt.format(pattern)) {
                    Ok(()) => text,
                    Err(_) => timestamp.to_string(),
                }
            }
            _ => timestamp.to_string(),
        }
    }
}

/// Reads bars from a CSV file.
pub struct CsvAdapter {
    path: PathBuf,
    timestamp_format: TimestampFormat,
    lenient: bool,
}

impl CsvAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timestamp_format: TimestampFormat::default(),
            lenient: false,
        }
    }

    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Skip malformed or out-of-order rows with a warning instead of failing.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn csv_error(&self, reason: impl Into<String>) -> BarcalcError {
        BarcalcError::Csv {
            file: self.path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Read bars from any reader; `load_bars` uses the configured file.
    pub fn read_bars<R: io::Read>(&self, reader: R) -> Result<BarSeries, BarcalcError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers().map_err(|e| self.csv_error(e.to_string()))?.clone();
        let columns = Columns::locate(&headers).map_err(|reason| self.csv_error(reason))?;

        let mut series = BarSeries::new();
        let mut skipped = 0usize;
        for (row, result) in rdr.records().enumerate() {
            // header is line 1
            let line = row + 2;
            let parsed = result
                .map_err(|e| e.to_string())
                .and_then(|record| columns.bar(&record, &self.timestamp_format));
            let outcome = parsed.and_then(|bar| series.push(bar).map_err(|e| e.to_string()));
            if let Err(reason) = outcome {
                if !self.lenient {
                    return Err(self.csv_error(format!("line {line}: {reason}")));
                }
                tracing::warn!(file = %self.path.display(), line, %reason, "skipping row");
                skipped += 1;
            }
        }
        tracing::debug!(file = %self.path.display(), bars = series.len(), skipped, "loaded bars");
        Ok(series)
    }
}

impl DataPort for CsvAdapter {
    fn load_bars(&self) -> Result<BarSeries, BarcalcError> {
        let file = File::open(&self.path)
            .map_err(|e| self.csv_error(format!("failed to open: {e}")))?;
        self.read_bars(file)
    }
}

struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, String> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
                .ok_or_else(|| format!("missing '{}' column", names[0]))
        };
        Ok(Self {
            timestamp: find(&["timestamp", "date", "time", "datetime"])?,
            open: find(&["open"])?,
            high: find(&["high"])?,
            low: find(&["low"])?,
            close: find(&["close"])?,
            volume: find(&["volume"])?,
        })
    }

    fn bar(&self, record: &csv::StringRecord, format: &TimestampFormat) -> Result<Bar, String> {
        let field = |index: usize, name: &str| {
            record
                .get(index)
                .ok_or_else(|| format!("missing {name} value"))
        };
        let number = |index: usize, name: &str| -> Result<f32, String> {
            let text = field(index, name)?;
            text.parse::<f32>()
                .map_err(|_| format!("invalid {name} value '{text}'"))
        };
        Ok(Bar::new(
            format.parse(field(self.timestamp, "timestamp")?)?,
            number(self.open, "open")?,
            number(self.high, "high")?,
            number(self.low, "low")?,
            number(self.close, "close")?,
            number(self.volume, "volume")?,
        ))
    }
}

/// Writes indicator output as CSV to a file, or stdout when no path is set.
pub struct CsvOutputAdapter {
    path: Option<PathBuf>,
    timestamp_format: TimestampFormat,
    precision: usize,
}

impl CsvOutputAdapter {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            timestamp_format: TimestampFormat::default(),
            precision: DEFAULT_PRECISION,
        }
    }

    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn write_to<W: Write>(&self, writer: W, output: &IndicatorOutput) -> Result<(), BarcalcError> {
        let file = self
            .path
            .as_ref()
            .map_or_else(|| "<stdout>".to_string(), |p| p.display().to_string());
        let csv_error = |e: csv::Error| BarcalcError::Csv {
            file: file.clone(),
            reason: e.to_string(),
        };

        let mut wtr = csv::Writer::from_writer(writer);
        let columns = output.columns();
        let mut header = vec!["timestamp"];
        header.extend(columns.iter().map(|(name, _)| *name));
        wtr.write_record(&header).map_err(csv_error)?;

        for (i, &t) in output.timestamps().iter().enumerate() {
            let mut row = Vec::with_capacity(columns.len() + 1);
            row.push(self.timestamp_format.format(t));
            for (_, values) in &columns {
                row.push(format_value(values.get(i).copied(), self.precision));
            }
            wtr.write_record(&row).map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl OutputPort for CsvOutputAdapter {
    fn write_output(&self, output: &IndicatorOutput) -> Result<(), BarcalcError> {
        match &self.path {
            Some(path) => {
                let file = File::create(path)?;
                self.write_to(io::BufWriter::new(file), output)?;
                tracing::debug!(path = %path.display(), rows = output.len(), "wrote output");
                Ok(())
            }
            None => self.write_to(io::stdout().lock(), output),
        }
    }
}

fn format_value(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.precision$}"),
        Some(v) if v.is_infinite() => if v > 0.0 { "inf" } else { "-inf" }.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::Indicator;
    use crate::domain::indicator::bollinger::BollingerBands;
    use crate::domain::indicator::sma::Sma;
    use crate::domain::series::OutputSeries;
    use std::fs;
    use tempfile::TempDir;

    const DAY_MS: i64 = 86_400_000;

    fn setup(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bars.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn load_bars_with_date_pattern() {
        let (_dir, path) = setup(
            "date,open,high,low,close,volume\n\
             2024-01-15,100.0,110.0,90.0,105.0,50000\n\
             2024-01-16,105.0,115.0,100.0,110.0,60000\n",
        );
        let adapter = CsvAdapter::new(&path)
            .with_timestamp_format(TimestampFormat::from_name("%Y-%m-%d"));
        let bars = adapter.load_bars().unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars.timestamps()[0], 1_705_276_800_000);
        assert_eq!(bars.timestamps()[1] - bars.timestamps()[0], DAY_MS);
        assert_eq!(bars.close(0), 105.0);
        assert_eq!(bars.volume(1), 60000.0);
    }

    #[test]
    fn columns_in_any_order() {
        let (_dir, path) = setup("close,volume,timestamp,low,high,open\n10,5,1000,9,11,10.5\n");
        let bars = CsvAdapter::new(&path).load_bars().unwrap();
        let bar = bars.bar(0).unwrap();
        assert_eq!(bar.timestamp, 1000);
        assert_eq!(bar.open, 10.5);
        assert_eq!(bar.high, 11.0);
    }

    #[test]
    fn rfc3339_timestamps() {
        let format = TimestampFormat::Rfc3339;
        assert_eq!(format.parse("1970-01-01T00:00:01Z"), Ok(1000));
        assert_eq!(format.parse("1970-01-01T01:00:00+01:00"), Ok(0));
        assert_eq!(format.format(1500), "1970-01-01T00:00:01.500Z");
    }

    #[test]
    fn pattern_with_time_of_day() {
        let format = TimestampFormat::from_name("%Y-%m-%d %H:%M");
        assert_eq!(format.parse("1970-01-01 00:01"), Ok(60_000));
        assert_eq!(format.format(60_000), "1970-01-01 00:01");
        assert!(format.parse("01/01/1970").is_err());
    }

    #[test]
    fn strict_mode_rejects_bad_rows() {
        let (_dir, path) = setup("timestamp,open,high,low,close,volume\n1,1,1,1,1,1\nx,1,1,1,1,1\n");
        let err = CsvAdapter::new(&path).load_bars().unwrap_err();
        assert!(matches!(err, BarcalcError::Csv { ref reason, .. } if reason.starts_with("line 3:")));
    }

    #[test]
    fn strict_mode_rejects_out_of_order_rows() {
        let (_dir, path) = setup("timestamp,open,high,low,close,volume\n2,1,1,1,1,1\n1,1,1,1,1,1\n");
        assert!(CsvAdapter::new(&path).load_bars().is_err());
    }

    #[test]
    fn lenient_mode_skips_bad_rows() {
        let (_dir, path) = setup(
            "timestamp,open,high,low,close,volume\n\
             1,1,1,1,1,1\n\
             2,1,1,1,abc,1\n\
             1,1,1,1,1,1\n\
             3,2,2,2,2,2\n",
        );
        let bars = CsvAdapter::new(&path).lenient(true).load_bars().unwrap();
        assert_eq!(bars.timestamps(), &[1, 3]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let (_dir, path) = setup("timestamp,open,high,low,close\n1,1,1,1,1\n");
        let err = CsvAdapter::new(&path).load_bars().unwrap_err();
        assert!(err.to_string().contains("missing 'volume' column"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = CsvAdapter::new("/nonexistent/bars.csv").load_bars().unwrap_err();
        assert!(matches!(err, BarcalcError::Csv { .. }));
    }

    fn bars(closes: &[f64]) -> BarSeries {
        BarSeries::from_bars(closes.iter().enumerate().map(|(i, &c)| {
            Bar::new(i as i64 * DAY_MS, c as f32, c as f32, c as f32, c as f32, 1.0)
        }))
        .unwrap()
    }

    fn written(adapter: &CsvOutputAdapter, output: &IndicatorOutput) -> String {
        let mut buf = Vec::new();
        adapter.write_to(&mut buf, output).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn writes_line_with_empty_nan_cells() {
        let output = Sma::new(2).unwrap().calculate(&bars(&[1.0, 2.0, 4.0])).into_output();
        let text = written(&CsvOutputAdapter::new(None).with_precision(2), &output);
        assert_eq!(text, "timestamp,value\n0,\n86400000,1.50\n172800000,3.00\n");
    }

    #[test]
    fn writes_band_columns_with_dates() {
        let output = BollingerBands::new(2, 2.0)
            .unwrap()
            .calculate(&bars(&[1.0, 3.0]))
            .into_output();
        let adapter = CsvOutputAdapter::new(None)
            .with_precision(1)
            .with_timestamp_format(TimestampFormat::from_name("%Y-%m-%d"));
        let text = written(&adapter, &output);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,upper,middle,lower");
        assert_eq!(lines[1], "1970-01-01,,,");
        assert_eq!(lines[2], "1970-01-02,4.0,2.0,0.0");
    }

    #[test]
    fn write_output_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let output = Sma::new(1).unwrap().calculate(&bars(&[5.0])).into_output();
        CsvOutputAdapter::new(Some(path.clone()))
            .with_precision(0)
            .write_output(&output)
            .unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "timestamp,value\n0,5\n");
    }
}
