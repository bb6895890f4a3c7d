//! CoinGecko markets API ranking source.
//!
//! Pages through `/coins/markets` ordered by market cap. Transient failures on a
//! page are retried with linear backoff; once retries are exhausted the whole
//! source fails and the caller decides whether to fall back.

use super::fetch::{build_url, PageFetcher};
use super::provider::{DataError, FetchProgress, RankingOrigin, RankingSource};
use crate::domain::{normalize_symbol, RankedCoin, RankingMap};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.coingecko.com/api/v3/coins/markets";

/// One record of the markets endpoint. Only the fields we join on.
#[derive(Debug, Deserialize)]
struct MarketRecord {
    id: Option<String>,
    symbol: Option<String>,
    name: Option<String>,
    market_cap_rank: Option<u64>,
}

impl MarketRecord {
    fn into_coin(self) -> Option<RankedCoin> {
        let symbol = normalize_symbol(self.symbol.as_deref().unwrap_or(""));
        if symbol.is_empty() {
            return None;
        }
        let rank = u32::try_from(self.market_cap_rank?).ok().filter(|r| *r > 0)?;
        Some(RankedCoin::new(
            self.id.unwrap_or_default(),
            self.name.unwrap_or_default(),
            &symbol,
            rank,
        ))
    }
}

/// Pagination and retry settings for the API source.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub per_page: u32,
    pub max_pages: u32,
    /// Extra attempts after the first failure of a page.
    pub max_retries: u32,
    /// Delay before retry `n` is `backoff * n`.
    pub backoff: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            per_page: 250,
            max_pages: 10,
            max_retries: 2,
            backoff: Duration::from_millis(1500),
        }
    }
}

/// Waits out a retry delay.
type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// CoinGecko markets API source.
pub struct CoinGeckoApiSource<F> {
    fetcher: F,
    settings: ApiSettings,
    sleep: Sleeper,
}

impl<F: PageFetcher> CoinGeckoApiSource<F> {
    pub fn new(fetcher: F, settings: ApiSettings) -> Self {
        Self {
            fetcher,
            settings,
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replace the blocking sleep between retries.
    pub fn with_sleeper(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    /// Build the markets URL for one page.
    pub fn page_url(&self, page: u32) -> Result<String, DataError> {
        build_url(
            &self.settings.base_url,
            &[
                ("vs_currency", "usd".to_string()),
                ("order", "market_cap_desc".to_string()),
                ("per_page", self.settings.per_page.to_string()),
                ("page", page.to_string()),
                ("sparkline", "false".to_string()),
            ],
        )
    }

    /// Fetch one page, retrying transient failures.
    fn fetch_with_retry(&self, url: &str) -> Result<String, DataError> {
        let mut attempt = 0;
        loop {
            match self.fetcher.get_text(url) {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    let delay = self.settings.backoff * attempt;
                    warn!(
                        "{url}: {e}; retry {attempt}/{} in {delay:?}",
                        self.settings.max_retries
                    );
                    (self.sleep)(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn parse_page(page: u32, body: &str) -> Result<Vec<MarketRecord>, DataError> {
        serde_json::from_str(body)
            .map_err(|e| DataError::ResponseFormatChanged(format!("markets page {page}: {e}")))
    }
}

impl<F: PageFetcher> RankingSource for CoinGeckoApiSource<F> {
    fn name(&self) -> &str {
        "coingecko_api"
    }

    fn origin(&self) -> RankingOrigin {
        RankingOrigin::CoinGeckoApi
    }

    fn fetch_ranking(&self, progress: &dyn FetchProgress) -> Result<RankingMap, DataError> {
        let mut map = RankingMap::new();

        for page in 1..=self.settings.max_pages {
            progress.on_page_start(self.name(), page, self.settings.max_pages);

            let url = self.page_url(page)?;
            let records = match self
                .fetch_with_retry(&url)
                .and_then(|body| Self::parse_page(page, &body))
            {
                Ok(records) => records,
                Err(e) => {
                    progress.on_page_failed(self.name(), page, &e);
                    return Err(e);
                }
            };

            // Past the last ranked coin the endpoint returns `[]`.
            if records.is_empty() {
                progress.on_page_complete(self.name(), page, 0);
                break;
            }

            let mut added = 0;
            let mut unranked = 0;
            for record in records {
                match record.into_coin() {
                    Some(coin) => {
                        if map.insert_first_seen(coin) {
                            added += 1;
                        }
                    }
                    None => unranked += 1,
                }
            }
            if unranked > 0 {
                debug!("markets page {page}: skipped {unranked} records without symbol or rank");
            }
            progress.on_page_complete(self.name(), page, added);
        }

        Ok(map)
    }
}
