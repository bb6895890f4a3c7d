//! coinrank core — domain types, ranking sources and asset file inventory.
//!
//! This crate contains everything that talks to the outside world before the merge:
//! - Domain types (ranked coins, the ranking map, asset files)
//! - The `RankingSource` seam with two implementations: the CoinGecko markets
//!   API and a scraper over the public listing page
//! - Primary-then-fallback ranking resolution
//! - Discovery of `<symbol>-usd-max.csv` files

pub mod data;
pub mod domain;
