use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rank given to assets the ranking source does not know about.
///
/// Larger than any real market-cap rank so unmatched assets sort last.
pub const PLACEHOLDER_RANK: u32 = 999_999;

/// One asset identity as reported by the ranking provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankedCoin {
    /// Provider identifier (e.g. `bitcoin`). Empty when scraped from the web page.
    pub coin_id: String,
    /// Display name, HTML entities already decoded.
    pub coin_name: String,
    /// Lowercase ticker. This is the join key against asset files.
    pub coin_symbol: String,
    /// Market-cap rank, 1 = largest.
    pub coin_rank: u32,
}

impl RankedCoin {
    pub fn new(
        coin_id: impl Into<String>,
        coin_name: impl Into<String>,
        coin_symbol: &str,
        coin_rank: u32,
    ) -> Self {
        Self {
            coin_id: coin_id.into(),
            coin_name: coin_name.into(),
            coin_symbol: normalize_symbol(coin_symbol),
            coin_rank,
        }
    }

    /// Stand-in entry for a symbol with no ranking.
    pub fn placeholder(symbol: &str) -> Self {
        Self {
            coin_id: String::new(),
            coin_name: String::new(),
            coin_symbol: normalize_symbol(symbol),
            coin_rank: PLACEHOLDER_RANK,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.coin_rank == PLACEHOLDER_RANK && self.coin_id.is_empty() && self.coin_name.is_empty()
    }
}

/// Lowercase, whitespace-trimmed ticker.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Symbol → ranking lookup for one run.
///
/// Insertion is first-seen-wins: once a symbol is present, later entries for
/// the same symbol (e.g. from a later page) are discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingMap {
    coins: HashMap<String, RankedCoin>,
}

impl RankingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the symbol is empty or already known. Returns whether it was added.
    pub fn insert_first_seen(&mut self, coin: RankedCoin) -> bool {
        if coin.coin_symbol.is_empty() || self.coins.contains_key(&coin.coin_symbol) {
            return false;
        }
        self.coins.insert(coin.coin_symbol.clone(), coin);
        true
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.coins.contains_key(&normalize_symbol(symbol))
    }

    pub fn get(&self, symbol: &str) -> Option<&RankedCoin> {
        self.coins.get(&normalize_symbol(symbol))
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    /// All entries ordered by rank, then symbol.
    pub fn by_rank(&self) -> Vec<&RankedCoin> {
        let mut coins: Vec<&RankedCoin> = self.coins.values().collect();
        coins.sort_by(|a, b| {
            a.coin_rank
                .cmp(&b.coin_rank)
                .then_with(|| a.coin_symbol.cmp(&b.coin_symbol))
        });
        coins
    }
}

impl FromIterator<RankedCoin> for RankingMap {
    fn from_iter<I: IntoIterator<Item = RankedCoin>>(iter: I) -> Self {
        let mut map = RankingMap::new();
        for coin in iter {
            map.insert_first_seen(coin);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_seen_wins() {
        let mut map = RankingMap::new();
        assert!(map.insert_first_seen(RankedCoin::new("bitcoin", "Bitcoin", "BTC", 1)));
        assert!(!map.insert_first_seen(RankedCoin::new("batcoin", "Batcoin", "btc", 812)));

        let btc = map.get("btc").unwrap();
        assert_eq!(btc.coin_id, "bitcoin");
        assert_eq!(btc.coin_rank, 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn lookup_is_case_insensitive_and_idempotent() {
        let map: RankingMap = vec![RankedCoin::new("ethereum", "Ethereum", " ETH ", 2)]
            .into_iter()
            .collect();
        assert_eq!(map.get("ETH"), map.get("eth"));
        assert_eq!(map.get("eth").unwrap().coin_symbol, "eth");
    }

    #[test]
    fn empty_symbol_rejected() {
        let mut map = RankingMap::new();
        assert!(!map.insert_first_seen(RankedCoin::new("x", "X", "  ", 5)));
        assert!(map.is_empty());
    }

    #[test]
    fn placeholder_sorts_after_real_ranks() {
        let p = RankedCoin::placeholder("XRP");
        assert!(p.is_placeholder());
        assert_eq!(p.coin_symbol, "xrp");
        assert!(p.coin_rank > 100_000);
    }

    #[test]
    fn by_rank_orders_entries() {
        let map: RankingMap = vec![
            RankedCoin::new("ethereum", "Ethereum", "eth", 2),
            RankedCoin::new("bitcoin", "Bitcoin", "btc", 1),
            RankedCoin::new("tether", "Tether", "usdt", 3),
        ]
        .into_iter()
        .collect();
        let symbols: Vec<&str> = map.by_rank().iter().map(|c| c.coin_symbol.as_str()).collect();
        assert_eq!(symbols, vec!["btc", "eth", "usdt"]);
    }
}
