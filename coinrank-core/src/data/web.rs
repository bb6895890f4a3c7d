//! CoinGecko website ranking source (fallback).
//!
//! Scrapes the public listing page with fixed markup signatures: table rows,
//! the sticky rank cell, the coin image `alt` attribute (symbol) and the styled
//! name node. Best-effort by construction: a page that fails to load is
//! skipped, and pagination stops at the first page that adds nothing new.
//!
//! The signatures track CoinGecko's Tailwind classes and break whenever the
//! page layout changes. Keep them in [`MarkupPatterns`] only.

use super::fetch::{build_url, PageFetcher};
use super::provider::{DataError, FetchProgress, RankingOrigin, RankingSource};
use crate::domain::{normalize_symbol, RankedCoin, RankingMap};
use regex::Regex;
use tracing::{debug, warn};

pub const DEFAULT_WEB_URL: &str = "https://www.coingecko.com/en";

const ROW_PATTERN: &str = r"(?is)<tr[^>]*>(.*?)</tr>";
const RANK_PATTERN: &str =
    r#"(?i)<td class="tw-sticky tw-left-\[34px\] gecko-sticky">\s*(\d+)\s*</td>"#;
const SYMBOL_PATTERN: &str = r#"(?i)alt="([A-Za-z0-9_.-]+)""#;
const NAME_PATTERN: &str = r#"(?i)tw-text-gray-700 dark:tw-text-moon-100 tw-font-semibold tw-text-sm tw-leading-5">\s*([^<\n][^<]*?)\s*<"#;

/// Compiled markup signatures for one listing page layout.
#[derive(Debug, Clone)]
pub struct MarkupPatterns {
    row: Regex,
    rank: Regex,
    symbol: Regex,
    name: Regex,
}

impl MarkupPatterns {
    /// Signatures for the current coingecko.com listing layout.
    pub fn coingecko() -> Result<Self, DataError> {
        Ok(Self {
            row: Regex::new(ROW_PATTERN)?,
            rank: Regex::new(RANK_PATTERN)?,
            symbol: Regex::new(SYMBOL_PATTERN)?,
            name: Regex::new(NAME_PATTERN)?,
        })
    }

    /// Number of `<tr>` rows in the document.
    pub fn row_count(&self, html: &str) -> usize {
        self.row.captures_iter(html).count()
    }

    /// Extract every row that carries both a rank and a symbol, in page order.
    ///
    /// Duplicates are returned as-is; first-seen filtering is the caller's job.
    pub fn extract(&self, html: &str) -> Vec<RankedCoin> {
        self.row
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .filter_map(|row| self.extract_row(row.as_str()))
            .collect()
    }

    fn extract_row(&self, row_html: &str) -> Option<RankedCoin> {
        let rank: u32 = self
            .rank
            .captures(row_html)?
            .get(1)?
            .as_str()
            .parse()
            .ok()
            .filter(|r| *r > 0)?;
        let symbol = normalize_symbol(self.symbol.captures(row_html)?.get(1)?.as_str());
        if symbol.is_empty() {
            return None;
        }
        let name = self
            .name
            .captures(row_html)
            .and_then(|caps| caps.get(1))
            .map(|m| html_escape::decode_html_entities(m.as_str().trim()).into_owned())
            .unwrap_or_default();

        Some(RankedCoin::new(String::new(), name, &symbol, rank))
    }
}

/// Pagination settings for the website source.
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub base_url: String,
    pub max_pages: u32,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEB_URL.to_string(),
            max_pages: 10,
        }
    }
}

/// CoinGecko listing page scraper.
pub struct CoinGeckoWebSource<F> {
    fetcher: F,
    settings: WebSettings,
    patterns: MarkupPatterns,
}

impl<F: PageFetcher> CoinGeckoWebSource<F> {
    pub fn new(fetcher: F, settings: WebSettings) -> Result<Self, DataError> {
        Ok(Self {
            fetcher,
            settings,
            patterns: MarkupPatterns::coingecko()?,
        })
    }

    pub fn page_url(&self, page: u32) -> Result<String, DataError> {
        build_url(&self.settings.base_url, &[("page", page.to_string())])
    }
}

impl<F: PageFetcher> RankingSource for CoinGeckoWebSource<F> {
    fn name(&self) -> &str {
        "coingecko_web"
    }

    fn origin(&self) -> RankingOrigin {
        RankingOrigin::CoinGeckoWeb
    }

    fn fetch_ranking(&self, progress: &dyn FetchProgress) -> Result<RankingMap, DataError> {
        let mut map = RankingMap::new();

        for page in 1..=self.settings.max_pages {
            progress.on_page_start(self.name(), page, self.settings.max_pages);

            let url = self.page_url(page)?;
            let html = match self.fetcher.get_text(&url) {
                Ok(html) => html,
                Err(e) => {
                    warn!("{}: skipping page {page}: {e}", self.name());
                    progress.on_page_failed(self.name(), page, &e);
                    continue;
                }
            };

            let coins = self.patterns.extract(&html);
            debug!(
                "{}: page {page} has {} rows, {} ranked",
                self.name(),
                self.patterns.row_count(&html),
                coins.len()
            );

            let mut added = 0;
            for coin in coins {
                if map.insert_first_seen(coin) {
                    added += 1;
                }
            }
            progress.on_page_complete(self.name(), page, added);

            if added == 0 {
                break;
            }
        }

        Ok(map)
    }
}
