//! Serializable pipeline configuration.
//!
//! Every field has a default, so an empty TOML file (or none at all) gives the
//! standard layout: raw files under `data/raw`, cleaned output under
//! `data/processed`.

use chrono::NaiveDate;
use coinrank_core::data::coingecko::DEFAULT_API_URL;
use coinrank_core::data::web::DEFAULT_WEB_URL;
use coinrank_core::data::{ApiSettings, WebSettings, ASSET_FILE_SUFFIX, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::clean::default_cutoff;
use crate::merge::{MergeOptions, SchemaPolicy};
use crate::pipeline::MergeRequest;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration for `merge` and `clean`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub ranking: RankingConfig,
    pub merge: MergeConfig,
    pub clean: CleanConfig,
}

impl PipelineConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Inputs and output of the merge stage.
    pub fn merge_request(&self) -> MergeRequest {
        MergeRequest {
            raw_dir: self.paths.raw_dir.clone(),
            file_suffix: self.merge.file_suffix.clone(),
            output: self.paths.merged_output.clone(),
            options: self.merge.options(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding `<symbol>-usd-max.csv` files.
    pub raw_dir: PathBuf,
    pub merged_output: PathBuf,
    pub snapshot_input: PathBuf,
    pub cleaned_output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            merged_output: PathBuf::from("data/raw/raw_merged_coingecko_ranked.csv"),
            snapshot_input: PathBuf::from("data/raw/coingecko_ranking.csv"),
            cleaned_output: PathBuf::from("data/processed/coingecko_ranking_cleaned.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RankingConfig {
    pub api_url: String,
    pub web_url: String,
    pub per_page: u32,
    pub max_pages: u32,
    pub web_max_pages: u32,
    pub timeout_secs: u64,
    /// Extra attempts per API page after a transient failure.
    pub max_retries: u32,
    /// Linear backoff step between API retries.
    pub backoff_ms: u64,
    pub user_agent: String,
    /// Scrape the website when the API fails.
    pub fallback_enabled: bool,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            web_url: DEFAULT_WEB_URL.to_string(),
            per_page: 250,
            max_pages: 10,
            web_max_pages: 10,
            timeout_secs: 30,
            max_retries: 2,
            backoff_ms: 1500,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fallback_enabled: true,
        }
    }
}

impl RankingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_url.clone(),
            per_page: self.per_page,
            max_pages: self.max_pages,
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }

    pub fn web_settings(&self) -> WebSettings {
        WebSettings {
            base_url: self.web_url.clone(),
            max_pages: self.web_max_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MergeConfig {
    pub schema: SchemaPolicy,
    /// Column used as the third sort key.
    pub time_column: String,
    pub file_suffix: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            schema: SchemaPolicy::default(),
            time_column: "snapped_at".to_string(),
            file_suffix: ASSET_FILE_SUFFIX.to_string(),
        }
    }
}

impl MergeConfig {
    pub fn options(&self) -> MergeOptions {
        MergeOptions {
            schema: self.schema,
            time_column: self.time_column.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleanConfig {
    /// Earliest `snapped_at` kept. Quote it in TOML: `cutoff = "2020-02-19"`.
    pub cutoff: NaiveDate,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            cutoff: default_cutoff(),
        }
    }
}
