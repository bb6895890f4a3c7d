//! Row merge engine.
//!
//! Joins every asset file's rows to its ranking entry (or a placeholder),
//! projects them onto one output schema and applies the single global sort:
//! rank, then symbol, then the time column, then source file and row position.
//! The last two keys make the order total, so the output does not depend on
//! the order files were listed or fetched in.

use coinrank_core::domain::{AssetFile, RankedCoin, RankingMap};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Columns written before the asset file's own columns.
pub const FIXED_HEADERS: [&str; 5] = [
    "coin_rank",
    "coin_id",
    "coin_name",
    "coin_symbol",
    "source_file",
];

#[derive(Debug, Error)]
#[error("failed to read {}: {source}", .path.display())]
pub struct ReadError {
    pub path: PathBuf,
    #[source]
    pub source: csv::Error,
}

/// How the output column set is derived from the input files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaPolicy {
    /// Columns of the first file with a header row. Extra columns in later
    /// files are dropped; columns they lack are left empty.
    #[default]
    FirstFile,
    /// Every column seen in any file, in first-seen order.
    Union,
}

impl SchemaPolicy {
    fn base_headers(self, tables: &[&AssetTable]) -> Vec<String> {
        match self {
            SchemaPolicy::FirstFile => tables
                .iter()
                .find(|t| !t.headers.is_empty())
                .map(|t| t.headers.clone())
                .unwrap_or_default(),
            SchemaPolicy::Union => {
                let mut seen = HashSet::new();
                tables
                    .iter()
                    .flat_map(|t| t.headers.iter())
                    .filter(|h| seen.insert(h.as_str()))
                    .cloned()
                    .collect()
            }
        }
    }
}

impl FromStr for SchemaPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-file" => Ok(SchemaPolicy::FirstFile),
            "union" => Ok(SchemaPolicy::Union),
            other => Err(format!("unknown schema policy '{other}' (expected first-file or union)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub schema: SchemaPolicy,
    /// Column used as the third sort key; rows without it sort first.
    pub time_column: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            schema: SchemaPolicy::FirstFile,
            time_column: "snapped_at".to_string(),
        }
    }
}

/// One asset file read into memory.
#[derive(Debug, Clone)]
pub struct AssetTable {
    pub file: AssetFile,
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
}

impl AssetTable {
    /// Read a CSV file with a header row. Short rows are allowed.
    pub fn read(file: &AssetFile) -> Result<Self, ReadError> {
        let err = |source| ReadError {
            path: file.path.clone(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&file.path)
            .map_err(err)?;
        let headers = reader
            .headers()
            .map_err(err)?
            .iter()
            .map(str::to_string)
            .collect();
        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(err)?;
        Ok(Self {
            file: file.clone(),
            headers,
            records,
        })
    }

    /// Index of `column` in this file; the last one wins on duplicates.
    fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().rposition(|h| h == column)
    }
}

/// One output row: ranking fields, source file, values aligned to the base headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRow {
    pub coin: Arc<RankedCoin>,
    pub source_file: String,
    /// Position of the row within its source file.
    pub ordinal: usize,
    pub values: Vec<String>,
}

impl MergedRow {
    /// Output fields in header order.
    pub fn to_record(&self) -> StringRecord {
        let mut record = StringRecord::with_capacity(0, FIXED_HEADERS.len() + self.values.len());
        record.push_field(&self.coin.coin_rank.to_string());
        record.push_field(&self.coin.coin_id);
        record.push_field(&self.coin.coin_name);
        record.push_field(&self.coin.coin_symbol);
        record.push_field(&self.source_file);
        for value in &self.values {
            record.push_field(value);
        }
        record
    }
}

/// Merged, sorted rows plus what the summary needs.
#[derive(Debug, Clone)]
pub struct MergedTable {
    /// The fixed columns followed by the base headers.
    pub headers: Vec<String>,
    pub rows: Vec<MergedRow>,
    /// Filenames whose symbol had no ranking entry, in inventory order.
    pub unmatched: Vec<String>,
    pub file_count: usize,
}

impl MergedTable {
    pub fn base_headers(&self) -> &[String] {
        &self.headers[FIXED_HEADERS.len()..]
    }
}

/// Read every file and merge. Files are read in the given order; the merge
/// itself is order-independent.
pub fn merge_files(
    files: &[AssetFile],
    ranking: &RankingMap,
    opts: &MergeOptions,
) -> Result<MergedTable, ReadError> {
    let tables = files
        .iter()
        .map(AssetTable::read)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(merge_tables(&tables, ranking, opts))
}

/// Merge already-read tables against the ranking map.
pub fn merge_tables(
    tables: &[AssetTable],
    ranking: &RankingMap,
    opts: &MergeOptions,
) -> MergedTable {
    let mut ordered: Vec<&AssetTable> = tables.iter().collect();
    ordered.sort_by(|a, b| a.file.inventory_cmp(&b.file));

    let base_headers = opts.schema.base_headers(&ordered);
    let mut rows = Vec::with_capacity(ordered.iter().map(|t| t.records.len()).sum());
    let mut unmatched = Vec::new();

    for table in &ordered {
        let coin = match ranking.get(&table.file.symbol) {
            Some(coin) => Arc::new(coin.clone()),
            None => {
                unmatched.push(table.file.file_name.clone());
                Arc::new(RankedCoin::placeholder(&table.file.symbol))
            }
        };

        let positions: Vec<Option<usize>> = base_headers
            .iter()
            .map(|h| table.column_index(h))
            .collect();

        for (ordinal, record) in table.records.iter().enumerate() {
            let values = positions
                .iter()
                .map(|pos| pos.and_then(|i| record.get(i)).unwrap_or("").to_string())
                .collect();
            rows.push(MergedRow {
                coin: Arc::clone(&coin),
                source_file: table.file.file_name.clone(),
                ordinal,
                values,
            });
        }
    }

    let time_index = base_headers.iter().position(|h| *h == opts.time_column);
    sort_rows(&mut rows, time_index);

    let headers = FIXED_HEADERS
        .iter()
        .map(|h| h.to_string())
        .chain(base_headers)
        .collect();

    MergedTable {
        headers,
        rows,
        unmatched,
        file_count: tables.len(),
    }
}

/// Global sort: (rank, symbol, time, source file, ordinal).
fn sort_rows(rows: &mut [MergedRow], time_index: Option<usize>) {
    let time = |row: &MergedRow| -> String {
        time_index
            .and_then(|i| row.values.get(i))
            .cloned()
            .unwrap_or_default()
    };
    rows.sort_by_cached_key(|row| {
        (
            row.coin.coin_rank,
            row.coin.coin_symbol.clone(),
            time(row),
            row.source_file.clone(),
            row.ordinal,
        )
    });
}
