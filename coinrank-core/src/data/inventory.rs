//! Asset file discovery in the raw data directory.

use super::provider::DataError;
use crate::domain::AssetFile;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Naming convention of per-asset files: `<symbol>-usd-max.csv`.
pub const ASSET_FILE_SUFFIX: &str = "-usd-max.csv";

/// List asset files in `dir` in inventory order.
///
/// Fails with `NoInputFiles` when nothing matches (or the directory does not
/// exist), so a run aborts before any network request.
pub fn list_asset_files(dir: &Path, suffix: &str) -> Result<Vec<AssetFile>, DataError> {
    let no_files = || DataError::NoInputFiles {
        dir: dir.to_path_buf(),
        suffix: suffix.to_string(),
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(no_files()),
        Err(e) => {
            return Err(DataError::Io {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DataError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match AssetFile::from_path(path, suffix) {
            Some(file) => files.push(file),
            None => debug!("ignoring {:?}", entry.file_name()),
        }
    }

    if files.is_empty() {
        return Err(no_files());
    }

    files.sort_by(|a, b| a.inventory_cmp(b));
    Ok(files)
}
