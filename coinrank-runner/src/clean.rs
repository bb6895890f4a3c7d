//! Ranking snapshot cleaner.
//!
//! Drops rows missing any of `price`, `market_cap`, `total_volume`, then keeps
//! only rows whose `snapped_at` falls on or after the cutoff date. Columns and
//! row order are preserved; `snapped_at` is rewritten as `YYYY-MM-DD HH:MM:SS`
//! with the zone marker removed.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::writer::{write_atomic, WriteError};

/// Columns that must be present and non-missing.
pub const REQUIRED_NUMERIC: [&str; 3] = ["price", "market_cap", "total_volume"];
pub const TIME_COLUMN: &str = "snapped_at";

const OUTPUT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const OUTPUT_TIME_FORMAT_FRACTIONAL: &str = "%Y-%m-%d %H:%M:%S%.f";

const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>",
];

const TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// First day kept by default.
pub fn default_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 2, 19).unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("snapshot is missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("row {row}: cannot parse snapped_at '{value}'")]
    BadTimestamp { row: usize, value: String },

    #[error("failed to read snapshot {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Row counts per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub rows_read: usize,
    pub dropped_missing: usize,
    pub dropped_before_cutoff: usize,
    pub rows_written: usize,
}

/// Clean `input` into `output`. The output file is replaced only on success.
pub fn clean_snapshot(
    input: &Path,
    output: &Path,
    cutoff: NaiveDate,
) -> Result<CleanReport, CleanError> {
    let file = std::fs::File::open(input).map_err(|e| CleanError::Read {
        path: input.to_path_buf(),
        source: e.into(),
    })?;

    let report = write_atomic(output, |out| clean_records(file, out, cutoff))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        rows_read = report.rows_read,
        rows_written = report.rows_written,
        "snapshot cleaned"
    );
    Ok(report)
}

/// Stream CSV from `reader` to `writer`, applying the missing-value and cutoff filters.
pub fn clean_records<R: Read, W: Write>(
    reader: R,
    writer: W,
    cutoff: NaiveDate,
) -> Result<CleanReport, CleanError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| CleanError::MissingColumn {
                column: name.to_string(),
            })
    };
    let numeric = REQUIRED_NUMERIC
        .iter()
        .map(|&name| column(name))
        .collect::<Result<Vec<_>, _>>()?;
    let time_idx = column(TIME_COLUMN)?;

    let cutoff = cutoff.and_hms_opt(0, 0, 0).unwrap_or_default();
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    wtr.write_record(&headers)?;

    let mut report = CleanReport::default();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        report.rows_read += 1;

        if numeric.iter().any(|&idx| is_missing(record.get(idx))) {
            report.dropped_missing += 1;
            continue;
        }

        let raw = record.get(time_idx).unwrap_or("");
        // Data rows are numbered from 1, after the header line.
        let ts = parse_snapshot_time(raw).ok_or_else(|| CleanError::BadTimestamp {
            row: i + 1,
            value: raw.to_string(),
        })?;
        if ts < cutoff {
            report.dropped_before_cutoff += 1;
            continue;
        }

        let formatted = format_snapshot_time(ts);
        let out: csv::StringRecord = record
            .iter()
            .enumerate()
            .map(|(idx, field)| if idx == time_idx { formatted.as_str() } else { field })
            .collect();
        wtr.write_record(&out)?;
        report.rows_written += 1;
    }
    wtr.flush().map_err(|e| CleanError::Csv(e.into()))?;

    debug!(?report, "snapshot filter finished");
    Ok(report)
}

fn is_missing(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => MISSING_TOKENS.contains(&v.trim()),
    }
}

/// Sub-second precision is written only when present.
fn format_snapshot_time(ts: NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format(OUTPUT_TIME_FORMAT).to_string()
    } else {
        ts.format(OUTPUT_TIME_FORMAT_FRACTIONAL).to_string()
    }
}

/// Parse a `snapped_at` value, ignoring a trailing ` UTC` or `Z` marker.
/// Date-only values are taken as midnight.
pub fn parse_snapshot_time(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_suffix(" UTC")
        .or_else(|| trimmed.strip_suffix('Z'))
        .unwrap_or(trimmed)
        .trim_end();

    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
