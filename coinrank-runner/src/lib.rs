//! coinrank runner — merge pipeline, output writer and snapshot cleaner.
//!
//! This crate builds on `coinrank-core` to provide:
//! - TOML configuration with defaults for every field
//! - The merge engine (ranking join, schema projection, global sort)
//! - Atomic CSV output and a BLAKE3 dataset hash
//! - The end-to-end merge run and the ranking snapshot cleaner

pub mod clean;
pub mod config;
pub mod merge;
pub mod pipeline;
pub mod writer;

pub use clean::{clean_records, clean_snapshot, default_cutoff, CleanError, CleanReport};
pub use config::{ConfigError, PipelineConfig};
pub use merge::{
    merge_files, merge_tables, AssetTable, MergeOptions, MergedRow, MergedTable, ReadError,
    SchemaPolicy, FIXED_HEADERS,
};
pub use pipeline::{run_merge, MergeReport, MergeRequest, PipelineError};
pub use writer::{dataset_hash, write_merged_csv, WriteError};
