//! CSV loading for candle and plan tables.
//!
//! Both tables come from the feature pipeline and are row-aligned: plan row
//! `i` belongs to candle row `i`. Each candle row must be finite and
//! internally consistent; alignment and time ordering are checked by the
//! engine.

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, Trim};
use planlab_core::domain::{Candle, Direction, ExitMode, TradePlan};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unparseable time '{value}'")]
    BadTime { row: usize, value: String },

    #[error("row {row}: non-finite or inconsistent OHLC")]
    InsaneBar { row: usize },

    #[error("row {row}: unparseable plan_valid flag '{value}'")]
    BadFlag { row: usize, value: String },

    #[error("row {row}: unknown plan_exit_mode '{value}'")]
    BadExitMode { row: usize, value: String },
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse an RFC 3339 timestamp, or a naive one read as UTC.
pub fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new().trim(Trim::All).from_reader(input)
}

// ── Candles ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CandleRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

pub fn load_candles(path: &Path) -> Result<Vec<Candle>, LoadError> {
    read_candles(open(path)?)
}

pub fn read_candles<R: Read>(input: R) -> Result<Vec<Candle>, LoadError> {
    let mut rdr = reader(input);
    let mut candles = Vec::new();
    for (i, row) in rdr.deserialize::<CandleRow>().enumerate() {
        let row = row?;
        let time = parse_time(&row.time).ok_or_else(|| LoadError::BadTime {
            row: i + 1,
            value: row.time.clone(),
        })?;
        let candle = Candle::new(time, row.open, row.high, row.low, row.close);
        if !candle.is_sane() {
            return Err(LoadError::InsaneBar { row: i + 1 });
        }
        candles.push(candle);
    }
    Ok(candles)
}

// ── Plans ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PlanRow {
    #[serde(default)]
    plan_valid: String,
    #[serde(default)]
    plan_direction: String,
    #[serde(default)]
    plan_entry_tag: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    plan_sl: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    plan_tp1: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    plan_tp2: Option<f64>,
    #[serde(default)]
    plan_sl_tag: String,
    #[serde(default)]
    plan_tp1_tag: String,
    #[serde(default)]
    plan_tp2_tag: String,
    #[serde(default)]
    plan_exit_mode: String,
}

fn parse_flag(row: usize, value: &str) -> Result<bool, LoadError> {
    match value.to_ascii_lowercase().as_str() {
        "" | "false" | "0" => Ok(false),
        "true" | "1" => Ok(true),
        _ => Err(LoadError::BadFlag {
            row,
            value: value.to_string(),
        }),
    }
}

fn parse_exit_mode(row: usize, value: &str) -> Result<ExitMode, LoadError> {
    match value.to_ascii_lowercase().as_str() {
        "" | "fixed" => Ok(ExitMode::Fixed),
        "managed" => Ok(ExitMode::Managed),
        _ => Err(LoadError::BadExitMode {
            row,
            value: value.to_string(),
        }),
    }
}

pub fn load_plans(path: &Path) -> Result<Vec<TradePlan>, LoadError> {
    read_plans(open(path)?)
}

/// Read a plan table. Missing level cells become `None`, which makes the row
/// non-actionable; they are not errors.
pub fn read_plans<R: Read>(input: R) -> Result<Vec<TradePlan>, LoadError> {
    let mut rdr = reader(input);
    let mut plans = Vec::new();
    for (i, row) in rdr.deserialize::<PlanRow>().enumerate() {
        let row = row?;
        let n = i + 1;
        plans.push(TradePlan {
            valid: parse_flag(n, &row.plan_valid)?,
            direction: Direction::parse(&row.plan_direction),
            entry_tag: row.plan_entry_tag,
            sl: row.plan_sl,
            tp1: row.plan_tp1,
            tp2: row.plan_tp2,
            sl_tag: row.plan_sl_tag,
            tp1_tag: row.plan_tp1_tag,
            tp2_tag: row.plan_tp2_tag,
            exit_mode: parse_exit_mode(n, &row.plan_exit_mode)?,
        });
    }
    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_and_naive_times() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 10, 13, 15, 0).unwrap();
        assert_eq!(parse_time("2024-06-10T13:15:00Z"), Some(expected));
        assert_eq!(parse_time("2024-06-10T15:15:00+02:00"), Some(expected));
        assert_eq!(parse_time("2024-06-10 13:15:00"), Some(expected));
        assert_eq!(parse_time("2024-06-10T13:15:00"), Some(expected));
        assert_eq!(parse_time("10/06/2024"), None);
    }

    #[test]
    fn reads_candles_with_whitespace() {
        let csv = "time, open, high, low, close\n2024-06-10 13:00:00, 1.0, 2.0, 0.5, 1.5\n";
        let candles = read_candles(csv.as_bytes()).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].high, 2.0);
    }

    #[test]
    fn bad_candle_time_reports_row() {
        let csv = "time,open,high,low,close\n2024-06-10 13:00:00,1,2,0.5,1.5\nyesterday,1,2,0.5,1.5\n";
        let err = read_candles(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::BadTime { row: 2, .. }));
    }

    #[test]
    fn nan_candle_row_is_rejected() {
        let csv = "\
time,open,high,low,close
2024-06-10 13:00:00,1.0,2.0,0.5,1.5
2024-06-10 13:15:00,1.5,2.5,1.0,2.0
2024-06-10 13:30:00,NaN,NaN,NaN,NaN
";
        let err = read_candles(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::InsaneBar { row: 3 }));
    }

    #[test]
    fn inverted_candle_row_is_rejected() {
        let csv = "time,open,high,low,close\n2024-06-10 13:00:00,1.0,0.5,2.0,1.5\n";
        let err = read_candles(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::InsaneBar { row: 1 }));
    }

    #[test]
    fn reads_plan_rows() {
        let csv = "\
plan_valid,plan_direction,plan_entry_tag,plan_sl,plan_tp1,plan_tp2,plan_sl_tag,plan_tp1_tag,plan_tp2_tag
true,long,brk,99,101,102,SL,TP1,TP2
0,,,,,,,,
TRUE,sideways,x,99,101,102,SL,TP1,TP2
";
        let plans = read_plans(csv.as_bytes()).unwrap();
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0], TradePlan::long("brk", 99.0, 101.0, 102.0));
        assert_eq!(plans[1], TradePlan::none());
        assert!(plans[2].valid);
        assert_eq!(plans[2].direction, None);
        assert!(plans[2].actionable().is_none());
    }

    #[test]
    fn missing_level_makes_row_inactionable() {
        let csv = "\
plan_valid,plan_direction,plan_entry_tag,plan_sl,plan_tp1,plan_tp2
true,short,a,,99,98
true,short,a,101,n/a,98
";
        let plans = read_plans(csv.as_bytes()).unwrap();
        assert_eq!(plans[0].sl, None);
        assert_eq!(plans[1].tp1, None);
        assert!(plans.iter().all(|p| p.actionable().is_none()));
    }

    #[test]
    fn exit_mode_column_is_optional() {
        let csv = "\
plan_valid,plan_direction,plan_entry_tag,plan_sl,plan_tp1,plan_tp2,plan_exit_mode
true,long,m,99,,,managed
true,long,f,99,101,102,
";
        let plans = read_plans(csv.as_bytes()).unwrap();
        assert_eq!(plans[0].exit_mode, ExitMode::Managed);
        assert!(plans[0].actionable().is_some());
        assert_eq!(plans[1].exit_mode, ExitMode::Fixed);
    }

    #[test]
    fn rejects_bad_flag_and_exit_mode() {
        let csv = "plan_valid,plan_direction\nmaybe,long\n";
        assert!(matches!(
            read_plans(csv.as_bytes()).unwrap_err(),
            LoadError::BadFlag { row: 1, .. }
        ));

        let csv = "plan_valid,plan_exit_mode\ntrue,trailing\n";
        assert!(matches!(
            read_plans(csv.as_bytes()).unwrap_err(),
            LoadError::BadExitMode { row: 1, .. }
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_candles(Path::new("/nonexistent/candles.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
