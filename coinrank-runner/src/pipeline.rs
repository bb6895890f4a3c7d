//! Merge pipeline — wires inventory, ranking resolution, merge and output.
//!
//! Stages run strictly in order and the run is all-or-nothing: the inventory
//! is checked before any network call, and the output file is written only
//! after every input has been read and merged.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use coinrank_core::data::{
    list_asset_files, resolve_ranking, DataError, FetchProgress, RankingOrigin, RankingSource,
};

use crate::merge::{merge_files, MergeOptions, ReadError};
use crate::writer::{dataset_hash, write_merged_csv, WriteError};

/// Errors from a merge run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Where a merge run reads from and writes to.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub raw_dir: PathBuf,
    pub file_suffix: String,
    pub output: PathBuf,
    pub options: MergeOptions,
}

/// Outcome of a successful merge, for the summary.
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub output_path: PathBuf,
    pub input_files: usize,
    pub rows_written: usize,
    pub unmatched: Vec<String>,
    pub ranking_origin: RankingOrigin,
    pub ranking_size: usize,
    /// BLAKE3 of the written table.
    pub dataset_hash: String,
}

/// Run the full merge: inventory, ranking, merge, write.
pub fn run_merge(
    request: &MergeRequest,
    primary: &dyn RankingSource,
    fallback: Option<&dyn RankingSource>,
    progress: &dyn FetchProgress,
) -> Result<MergeReport, PipelineError> {
    let files = list_asset_files(&request.raw_dir, &request.file_suffix)?;
    info!(dir = %request.raw_dir.display(), files = files.len(), "asset files found");

    let resolved = resolve_ranking(primary, fallback, progress)?;
    info!(
        origin = %resolved.origin,
        coins = resolved.map.len(),
        "ranking resolved"
    );

    let table = merge_files(&files, &resolved.map, &request.options)?;
    for name in &table.unmatched {
        warn!(file = %name, "symbol not in ranking, using placeholder rank");
    }

    write_merged_csv(&request.output, &table)?;
    let hash = dataset_hash(&table);
    info!(
        output = %request.output.display(),
        rows = table.rows.len(),
        hash = %hash,
        "merged table written"
    );

    Ok(MergeReport {
        output_path: request.output.clone(),
        input_files: table.file_count,
        rows_written: table.rows.len(),
        unmatched: table.unmatched,
        ranking_origin: resolved.origin,
        ranking_size: resolved.map.len(),
        dataset_hash: hash,
    })
}
