//! Merged table output.
//!
//! Writes are atomic: the CSV goes to `<name>.tmp` next to the destination and
//! is renamed into place only once fully flushed, so a failed run never leaves
//! a truncated merged file behind.

use std::ffi::OsString;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::merge::MergedTable;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write CSV {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Serialize the merged table to CSV at `path`, replacing any previous file.
pub fn write_merged_csv(path: &Path, table: &MergedTable) -> Result<(), WriteError> {
    write_atomic(path, |out| {
        write_table(out, table).map_err(|source| WriteError::Csv {
            path: path.to_path_buf(),
            source,
        })
    })
}

fn write_table<W: Write>(out: W, table: &MergedTable) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(&row.to_record())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Run `fill` against a buffered temp file, then rename it over `path`.
/// The temp file is removed if anything fails.
pub(crate) fn write_atomic<T, E, F>(path: &Path, fill: F) -> Result<T, E>
where
    F: FnOnce(&mut BufWriter<fs::File>) -> Result<T, E>,
    E: From<WriteError>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let tmp_path = tmp_path(path);
    let file = fs::File::create(&tmp_path).map_err(|e| io_err(&tmp_path, e))?;
    let mut out = BufWriter::new(file);

    let result = fill(&mut out).and_then(|value| {
        let file = out
            .into_inner()
            .map_err(|e| io_err(&tmp_path, e.into_error()))?;
        drop(file);
        fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
        Ok(value)
    });

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn io_err(path: &Path, source: io::Error) -> WriteError {
    WriteError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// BLAKE3 over header and rows in output order.
///
/// Two runs over the same inputs and ranking produce the same hash regardless
/// of directory listing order.
pub fn dataset_hash(table: &MergedTable) -> String {
    let mut hasher = blake3::Hasher::new();
    for header in &table.headers {
        hasher.update(header.as_bytes());
        hasher.update(&[0x1f]);
    }
    hasher.update(b"\n");
    for row in &table.rows {
        for field in row.to_record().iter() {
            hasher.update(field.as_bytes());
            hasher.update(&[0x1f]);
        }
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{merge_tables, AssetTable, MergeOptions};
    use coinrank_core::domain::{AssetFile, RankedCoin, RankingMap};
    use csv::StringRecord;

    fn sample_table() -> MergedTable {
        let tables = vec![AssetTable {
            file: AssetFile::from_path(PathBuf::from("btc-usd-max.csv"), "-usd-max.csv").unwrap(),
            headers: vec!["snapped_at".into(), "price".into()],
            records: vec![
                StringRecord::from(vec!["2024-01-01", "44000"]),
                StringRecord::from(vec!["2024-01-02", "45000"]),
            ],
        }];
        let ranking: RankingMap = vec![RankedCoin::new("bitcoin", "Bitcoin, \"digital gold\"", "btc", 1)]
            .into_iter()
            .collect();
        merge_tables(&tables, &ranking, &MergeOptions::default())
    }

    #[test]
    fn writes_header_and_rows_creating_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/merged.csv");

        write_merged_csv(&path, &sample_table()).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            headers,
            vec!["coin_rank", "coin_id", "coin_name", "coin_symbol", "source_file", "snapped_at", "price"]
        );
        let rows: Vec<StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][2], "Bitcoin, \"digital gold\"");
        assert_eq!(&rows[1][6], "45000");
        assert!(!path.with_file_name("merged.csv.tmp").exists());
    }

    #[test]
    fn overwrites_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        fs::write(&path, "stale,content\n1,2\n3,4\n5,6\n").unwrap();

        write_merged_csv(&path, &sample_table()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("coin_rank,"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let table = sample_table();
        assert_eq!(dataset_hash(&table), dataset_hash(&table));

        let mut changed = table.clone();
        changed.rows[0].values[1] = "44001".into();
        assert_ne!(dataset_hash(&table), dataset_hash(&changed));
    }
}
