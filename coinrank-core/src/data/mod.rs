//! Ranking acquisition and asset file discovery

pub mod coingecko;
pub mod fetch;
pub mod inventory;
pub mod provider;
pub mod resolve;
pub mod web;

#[cfg(test)]
mod testutil;

pub use coingecko::{ApiSettings, CoinGeckoApiSource};
pub use fetch::{HttpFetcher, PageFetcher, DEFAULT_USER_AGENT};
pub use inventory::{list_asset_files, ASSET_FILE_SUFFIX};
pub use provider::{
    DataError, FetchProgress, RankingOrigin, RankingSource, SilentProgress, StdoutProgress,
};
pub use resolve::{resolve_ranking, ResolvedRanking};
pub use web::{CoinGeckoWebSource, MarkupPatterns, WebSettings};
