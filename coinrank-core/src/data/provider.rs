//! Ranking source trait and structured error types.
//!
//! The RankingSource trait abstracts over where the symbol → rank mapping comes
//! from (CoinGecko JSON API, scraped CoinGecko listing page) so the merge
//! pipeline never knows which one answered, and tests can plug in fakes.

use crate::domain::RankingMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable directly in the CLI.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP client setup failed: {0}")]
    Client(String),

    #[error("invalid markup pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("no '*{suffix}' files found in {}", .dir.display())]
    NoInputFiles { dir: PathBuf, suffix: String },

    #[error("unable to fetch ranking from API or website: {reason}")]
    RankingUnavailable { reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DataError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Connection failures, timeouts, 429 and 5xx are transient; anything else
    /// (bad JSON, 4xx) will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            DataError::NetworkUnreachable(_) | DataError::Timeout(_) => true,
            DataError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Which source produced a ranking map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingOrigin {
    CoinGeckoApi,
    CoinGeckoWeb,
}

impl fmt::Display for RankingOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingOrigin::CoinGeckoApi => write!(f, "CoinGecko API"),
            RankingOrigin::CoinGeckoWeb => write!(f, "CoinGecko website"),
        }
    }
}

/// Trait for ranking sources.
///
/// Implementations handle pagination and parsing for one upstream shape.
/// Whether to fall back to another source is decided by
/// [`resolve_ranking`](super::resolve::resolve_ranking), not by the source.
pub trait RankingSource {
    /// Short name used in progress output and logs.
    fn name(&self) -> &str;

    fn origin(&self) -> RankingOrigin;

    /// Fetch the full symbol → coin mapping.
    fn fetch_ranking(&self, progress: &dyn FetchProgress) -> Result<RankingMap, DataError>;
}

/// Progress callback for paginated ranking fetches.
pub trait FetchProgress {
    /// Called before requesting a page.
    fn on_page_start(&self, source: &str, page: u32, max_pages: u32);

    /// Called after a page was parsed; `added` counts new symbols.
    fn on_page_complete(&self, source: &str, page: u32, added: usize);

    /// Called when a page could not be fetched or parsed.
    fn on_page_failed(&self, source: &str, page: u32, error: &DataError);

    /// Called when the primary source failed and the fallback takes over.
    fn on_fallback(&self, failed: &str, fallback: &str, error: &DataError);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl FetchProgress for StdoutProgress {
    fn on_page_start(&self, source: &str, page: u32, max_pages: u32) {
        println!("[{source} {page}/{max_pages}] Fetching...");
    }

    fn on_page_complete(&self, source: &str, page: u32, added: usize) {
        println!("  OK: {source} page {page} (+{added} coins)");
    }

    fn on_page_failed(&self, source: &str, page: u32, error: &DataError) {
        println!("  FAIL: {source} page {page}: {error}");
    }

    fn on_fallback(&self, failed: &str, fallback: &str, error: &DataError) {
        println!("\n{failed} unavailable ({error}); falling back to {fallback}");
    }
}

/// Progress reporter that discards everything.
pub struct SilentProgress;

impl FetchProgress for SilentProgress {
    fn on_page_start(&self, _source: &str, _page: u32, _max_pages: u32) {}
    fn on_page_complete(&self, _source: &str, _page: u32, _added: usize) {}
    fn on_page_failed(&self, _source: &str, _page: u32, _error: &DataError) {}
    fn on_fallback(&self, _failed: &str, _fallback: &str, _error: &DataError) {}
}
