//! Domain types for coinrank

pub mod asset;
pub mod coin;

pub use asset::{symbol_from_filename, AssetFile};
pub use coin::{normalize_symbol, RankedCoin, RankingMap, PLACEHOLDER_RANK};
