//! Integration tests for ranking acquisition through the public API.
//!
//! A URL-keyed fetcher stands in for the network; a recording progress sink
//! checks the order of page and fallback events.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use coinrank_core::data::{
    resolve_ranking, ApiSettings, CoinGeckoApiSource, CoinGeckoWebSource, DataError,
    FetchProgress, HttpFetcher, PageFetcher, RankingOrigin, RankingSource, WebSettings,
    DEFAULT_USER_AGENT,
};

#[derive(Default)]
struct UrlFetcher {
    pages: HashMap<String, Result<String, u16>>,
    calls: RefCell<Vec<String>>,
}

impl UrlFetcher {
    fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    fn status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(url.to_string(), Err(status));
        self
    }
}

impl PageFetcher for UrlFetcher {
    fn get_text(&self, url: &str) -> Result<String, DataError> {
        self.calls.borrow_mut().push(url.to_string());
        match self.pages.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(DataError::HttpStatus {
                status: *status,
                url: url.to_string(),
            }),
            None => Err(DataError::NetworkUnreachable(format!("no route to {url}"))),
        }
    }
}

#[derive(Default)]
struct RecordingProgress {
    events: RefCell<Vec<String>>,
}

impl FetchProgress for RecordingProgress {
    fn on_page_start(&self, source: &str, page: u32, _max_pages: u32) {
        self.events.borrow_mut().push(format!("start {source} {page}"));
    }

    fn on_page_complete(&self, source: &str, page: u32, added: usize) {
        self.events.borrow_mut().push(format!("done {source} {page} +{added}"));
    }

    fn on_page_failed(&self, source: &str, page: u32, _error: &DataError) {
        self.events.borrow_mut().push(format!("fail {source} {page}"));
    }

    fn on_fallback(&self, failed: &str, fallback: &str, _error: &DataError) {
        self.events.borrow_mut().push(format!("fallback {failed} -> {fallback}"));
    }
}

const API: &str = "https://api.test/coins/markets";
const WEB: &str = "https://web.test/en";

fn api_url(page: u32) -> String {
    format!("{API}?vs_currency=usd&order=market_cap_desc&per_page=2&page={page}&sparkline=false")
}

fn api_settings(max_retries: u32) -> ApiSettings {
    ApiSettings {
        base_url: API.into(),
        per_page: 2,
        max_pages: 3,
        max_retries,
        backoff: Duration::ZERO,
    }
}

fn web_settings() -> WebSettings {
    WebSettings {
        base_url: WEB.into(),
        max_pages: 3,
    }
}

fn web_row(rank: u32, symbol: &str, name: &str) -> String {
    format!(
        r#"<tr><td class="tw-sticky tw-left-[34px] gecko-sticky">{rank}</td>
<td><img alt="{symbol}" src="/{symbol}.png"></td>
<td><a class="tw-text-gray-700 dark:tw-text-moon-100 tw-font-semibold tw-text-sm tw-leading-5">{name}</a></td></tr>"#
    )
}

#[test]
fn api_pages_are_merged_first_seen() {
    let fetcher = UrlFetcher::default()
        .page(
            &api_url(1),
            r#"[{"id":"bitcoin","symbol":"btc","name":"Bitcoin","market_cap_rank":1},
                {"id":"ethereum","symbol":"eth","name":"Ethereum","market_cap_rank":2}]"#,
        )
        .page(
            &api_url(2),
            r#"[{"id":"wrapped-btc-lookalike","symbol":"BTC","name":"Lookalike","market_cap_rank":4},
                {"id":"tether","symbol":"usdt","name":"Tether","market_cap_rank":3}]"#,
        )
        .page(&api_url(3), "[]");
    let progress = RecordingProgress::default();
    let api = CoinGeckoApiSource::new(&fetcher, api_settings(2));

    let resolved = resolve_ranking(&api, None, &progress).unwrap();

    assert_eq!(resolved.origin, RankingOrigin::CoinGeckoApi);
    assert_eq!(resolved.map.len(), 3);
    assert_eq!(resolved.map.get("BTC").unwrap().coin_id, "bitcoin");
    let ranked = resolved.map.by_rank();
    let symbols: Vec<&str> = ranked.iter().map(|c| c.coin_symbol.as_str()).collect();
    assert_eq!(symbols, vec!["btc", "eth", "usdt"]);
    assert_eq!(
        *progress.events.borrow(),
        vec![
            "start coingecko_api 1",
            "done coingecko_api 1 +2",
            "start coingecko_api 2",
            "done coingecko_api 2 +1",
            "start coingecko_api 3",
            "done coingecko_api 3 +0",
        ]
    );
}

#[test]
fn rate_limited_api_falls_back_to_web_after_retries() {
    let fetcher = UrlFetcher::default()
        .status(&api_url(1), 429)
        .page(
            &format!("{WEB}?page=1"),
            &format!(
                "<table>{}{}</table>",
                web_row(1, "BTC", "Bitcoin"),
                web_row(2, "ETH", "Ethereum")
            ),
        )
        .page(
            &format!("{WEB}?page=2"),
            &format!("<table>{}</table>", web_row(3, "USDT", "Tether &amp; Co")),
        )
        .page(&format!("{WEB}?page=3"), "<table></table>");
    let progress = RecordingProgress::default();
    let api = CoinGeckoApiSource::new(&fetcher, api_settings(2));
    let web = CoinGeckoWebSource::new(&fetcher, web_settings()).unwrap();

    let resolved = resolve_ranking(&api, Some(&web), &progress).unwrap();

    assert_eq!(resolved.origin, RankingOrigin::CoinGeckoWeb);
    assert_eq!(resolved.map.len(), 3);
    assert_eq!(resolved.map.get("usdt").unwrap().coin_name, "Tether & Co");

    let api_calls = fetcher
        .calls
        .borrow()
        .iter()
        .filter(|u| u.starts_with(API))
        .count();
    assert_eq!(api_calls, 3);

    let events = progress.events.borrow();
    assert_eq!(events[0], "start coingecko_api 1");
    assert_eq!(events[1], "fail coingecko_api 1");
    assert_eq!(events[2], "fallback coingecko_api -> coingecko_web");
    assert_eq!(events.last().unwrap(), "done coingecko_web 3 +0");
}

#[test]
fn client_error_is_not_retried_but_still_falls_back() {
    let fetcher = UrlFetcher::default()
        .status(&api_url(1), 401)
        .page(
            &format!("{WEB}?page=1"),
            &format!("<table>{}</table>", web_row(1, "BTC", "Bitcoin")),
        );
    let progress = RecordingProgress::default();
    let api = CoinGeckoApiSource::new(&fetcher, api_settings(2));
    let web = CoinGeckoWebSource::new(&fetcher, web_settings()).unwrap();

    let resolved = resolve_ranking(&api, Some(&web), &progress).unwrap();

    assert_eq!(resolved.origin, RankingOrigin::CoinGeckoWeb);
    assert_eq!(fetcher.calls.borrow()[0], api_url(1));
    assert!(fetcher.calls.borrow()[1].starts_with(WEB));
}

#[test]
fn unreachable_network_everywhere_is_ranking_unavailable() {
    let fetcher = UrlFetcher::default();
    let api = CoinGeckoApiSource::new(&fetcher, api_settings(0));
    let web = CoinGeckoWebSource::new(&fetcher, web_settings()).unwrap();
    let progress = RecordingProgress::default();

    let err = resolve_ranking(&api, Some(&web), &progress).unwrap_err();

    assert!(matches!(err, DataError::RankingUnavailable { .. }));
    assert!(err.to_string().starts_with("unable to fetch ranking from API or website"));
}

#[test]
fn sources_report_names_and_origins() {
    let fetcher = UrlFetcher::default();
    let api = CoinGeckoApiSource::new(&fetcher, api_settings(0));
    let web = CoinGeckoWebSource::new(&fetcher, web_settings()).unwrap();

    assert_eq!(api.name(), "coingecko_api");
    assert_eq!(api.origin(), RankingOrigin::CoinGeckoApi);
    assert_eq!(web.name(), "coingecko_web");
    assert_eq!(web.origin(), RankingOrigin::CoinGeckoWeb);
    assert_eq!(web.page_url(2).unwrap(), format!("{WEB}?page=2"));
}

#[test]
fn http_fetcher_builds_with_browser_user_agent() {
    assert!(HttpFetcher::new(Duration::from_secs(5), DEFAULT_USER_AGENT).is_ok());
}
