//! CSV ingest and normalization.
//!
//! Turns the three study inputs into clean in-memory tables:
//!
//! - market index prices (`Date`, `Adj Close`)
//! - target security prices (`Date`, `Close`)
//! - incident events (`EventDate`, optional injury counts)
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Separation of concerns**: no study logic here

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::domain::{EventRecord, InjuryCounts, PriceSeries};
use crate::error::AppError;

const DATE_COLUMN: &str = "date";
const EVENT_DATE_COLUMN: &str = "eventdate";
const FATAL_COLUMN: &str = "fatalinjurycount";
const SERIOUS_COLUMN: &str = "seriousinjurycount";
const MINOR_COLUMN: &str = "minorinjurycount";

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Loaded price table plus what was skipped.
#[derive(Debug, Clone)]
pub struct PriceData {
    pub series: PriceSeries,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Loaded event table plus what was skipped.
#[derive(Debug, Clone)]
pub struct EventData {
    pub events: Vec<EventRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl EventData {
    pub fn undated(&self) -> usize {
        self.events.iter().filter(|e| e.date.is_none()).count()
    }
}

/// Where the three input tables live and which price columns to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPaths {
    pub market: PathBuf,
    pub target: PathBuf,
    pub events: PathBuf,
    pub market_column: String,
    pub target_column: String,
}

/// All loaded inputs for one run.
#[derive(Debug, Clone)]
pub struct StudyInputs {
    pub market: PriceData,
    pub target: PriceData,
    pub events: EventData,
}

/// Load market, target and event tables.
pub fn load_inputs(paths: &InputPaths, major_threshold: u32) -> Result<StudyInputs, AppError> {
    let market = load_prices(&paths.market, &paths.market_column)?;
    let target = load_prices(&paths.target, &paths.target_column)?;
    let events = load_events(&paths.events, major_threshold)?;
    info!(
        market_rows = market.series.len(),
        target_rows = target.series.len(),
        events = events.events.len(),
        "inputs loaded"
    );
    Ok(StudyInputs { market, target, events })
}

/// Load a `(date, price)` table from a CSV file.
pub fn load_prices(path: &Path, price_column: &str) -> Result<PriceData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_prices(file, price_column, &path.display().to_string())
}

/// Load an event table from a CSV file.
pub fn load_events(path: &Path, major_threshold: u32) -> Result<EventData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_events(file, major_threshold, &path.display().to_string())
}

/// Read a price table from any reader. `source` is only used in messages.
pub fn read_prices<R: Read>(reader: R, price_column: &str, source: &str) -> Result<PriceData, AppError> {
    let mut reader = csv_reader(reader);
    let header_map = read_header_map(&mut reader, source)?;

    let price_key = normalize_header_name(price_column);
    let date_idx = require_column(&header_map, DATE_COLUMN, "Date", source)?;
    let price_idx = require_column(&header_map, &price_key, price_column, source)?;

    let mut points = BTreeMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_price_row(&record, date_idx, price_idx) {
            Ok((date, price)) => {
                if points.contains_key(&date) {
                    row_errors.push(RowError {
                        line,
                        message: format!("Duplicate date {date}; keeping the first row."),
                    });
                } else {
                    points.insert(date, price);
                }
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    report_row_errors(source, &row_errors);

    if points.is_empty() {
        return Err(AppError::no_data(format!(
            "No valid price rows in '{source}' ({rows_read} rows read)."
        )));
    }

    Ok(PriceData {
        series: PriceSeries::new(points),
        row_errors,
        rows_read,
    })
}

/// Read an event table from any reader. `source` is only used in messages.
///
/// Missing count columns and blank count cells are treated as zero.
/// Unparseable dates are kept as `None` so the driver can account for them.
pub fn read_events<R: Read>(reader: R, major_threshold: u32, source: &str) -> Result<EventData, AppError> {
    let mut reader = csv_reader(reader);
    let header_map = read_header_map(&mut reader, source)?;

    let date_idx = require_column(&header_map, EVENT_DATE_COLUMN, "EventDate", source)?;
    let fatal_idx = header_map.get(FATAL_COLUMN).copied();
    let serious_idx = header_map.get(SERIOUS_COLUMN).copied();
    let minor_idx = header_map.get(MINOR_COLUMN).copied();

    let mut events = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let date = record.get(date_idx).and_then(parse_date);
        if date.is_none() {
            debug!(source, line, "event date not resolvable");
        }

        match parse_counts(&record, [fatal_idx, serious_idx, minor_idx]) {
            Ok(injuries) => events.push(EventRecord::new(date, injuries, major_threshold)),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    report_row_errors(source, &row_errors);

    Ok(EventData {
        events,
        row_errors,
        rows_read,
    })
}

/// Parse a date in any of the accepted layouts, dropping any time of day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn read_header_map<R: Read>(reader: &mut csv::Reader<R>, source: &str) -> Result<HashMap<String, usize>, AppError> {
    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers from '{source}': {e}")))?;
    Ok(build_header_map(headers))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for repeated headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

/// Lowercase and keep only alphanumerics, so `Adj Close`, `adj_close` and
/// `ADJ-CLOSE` all map to `adjclose`.
fn normalize_header_name(name: &str) -> String {
    // Excel exports often carry a UTF-8 BOM on the first header.
    name.trim()
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn require_column(
    header_map: &HashMap<String, usize>,
    key: &str,
    display: &str,
    source: &str,
) -> Result<usize, AppError> {
    header_map
        .get(key)
        .copied()
        .ok_or_else(|| AppError::input(format!("Missing required column `{display}` in '{source}'.")))
}

fn parse_price_row(record: &StringRecord, date_idx: usize, price_idx: usize) -> Result<(NaiveDate, f64), String> {
    let raw_date = record.get(date_idx).unwrap_or("");
    let date = parse_date(raw_date).ok_or_else(|| format!("Invalid date `{raw_date}`."))?;

    let raw_price = record.get(price_idx).unwrap_or("");
    if is_missing(raw_price) {
        return Err(format!("Missing price on {date}."));
    }
    let price: f64 = raw_price
        .parse()
        .map_err(|_| format!("Invalid price `{raw_price}` on {date}."))?;
    if !(price.is_finite() && price > 0.0) {
        return Err(format!("Non-positive price {price} on {date}."));
    }

    Ok((date, price))
}

fn parse_counts(record: &StringRecord, idx: [Option<usize>; 3]) -> Result<InjuryCounts, String> {
    Ok(InjuryCounts {
        fatal: parse_count(record, idx[0], "FatalInjuryCount")?,
        serious: parse_count(record, idx[1], "SeriousInjuryCount")?,
        minor: parse_count(record, idx[2], "MinorInjuryCount")?,
    })
}

fn parse_count(record: &StringRecord, idx: Option<usize>, column: &str) -> Result<u32, String> {
    let Some(raw) = idx.and_then(|i| record.get(i)) else {
        return Ok(0);
    };
    if is_missing(raw) {
        return Ok(0);
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("Invalid `{column}` value `{raw}`."))?;
    if !(value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64) {
        return Err(format!("`{column}` must be a non-negative whole number (got `{raw}`)."));
    }
    Ok(value as u32)
}

fn is_missing(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "" | "null" | "nan" | "na" | "n/a"
    )
}

fn report_row_errors(source: &str, row_errors: &[RowError]) {
    if row_errors.is_empty() {
        return;
    }
    warn!(source, skipped = row_errors.len(), "skipped invalid CSV rows");
    for e in row_errors {
        debug!(source, line = e.line, message = %e.message, "row skipped");
    }
}
