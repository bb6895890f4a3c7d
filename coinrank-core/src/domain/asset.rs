use std::cmp::Ordering;
use std::path::PathBuf;

/// One discovered per-asset input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub path: PathBuf,
    /// Bare filename, reported as `source_file` in the merged output.
    pub file_name: String,
    /// Lowercase symbol derived from the filename.
    pub symbol: String,
}

impl AssetFile {
    /// Build from a filename, or `None` if the name does not end in `suffix`
    /// or leaves an empty symbol.
    pub fn from_path(path: PathBuf, suffix: &str) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let symbol = symbol_from_filename(&file_name, suffix)?;
        Some(Self {
            path,
            file_name,
            symbol,
        })
    }

    /// Inventory order: case-insensitive filename, exact filename as tie-break.
    pub fn inventory_cmp(&self, other: &Self) -> Ordering {
        self.file_name
            .to_lowercase()
            .cmp(&other.file_name.to_lowercase())
            .then_with(|| self.file_name.cmp(&other.file_name))
    }
}

/// `btc-usd-max.csv` → `btc`.
pub fn symbol_from_filename(file_name: &str, suffix: &str) -> Option<String> {
    let stem = file_name.strip_suffix(suffix)?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_lowercase())
}
