//! Blocking HTTP text fetcher shared by both ranking sources.

use super::provider::DataError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use std::time::Duration;

/// Browser-like UA; the public listing page rejects obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Fetches a URL and returns the body as text.
///
/// The seam between ranking sources and the network: sources are generic
/// over this so tests can script responses without a server.
pub trait PageFetcher {
    fn get_text(&self, url: &str) -> Result<String, DataError>;
}

impl<T: PageFetcher + ?Sized> PageFetcher for &T {
    fn get_text(&self, url: &str) -> Result<String, DataError> {
        (**self).get_text(url)
    }
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, DataError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.to_string())
            .default_headers(headers)
            .build()
            .map_err(|e| DataError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    fn get_text(&self, url: &str) -> Result<String, DataError> {
        let resp = self.client.get(url).send().map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        resp.text().map_err(classify)
    }
}

fn classify(e: reqwest::Error) -> DataError {
    if e.is_timeout() {
        DataError::Timeout(e.to_string())
    } else if e.is_decode() || e.is_body() {
        DataError::ResponseFormatChanged(e.to_string())
    } else {
        DataError::NetworkUnreachable(e.to_string())
    }
}

/// Append query parameters to a base URL.
pub fn build_url(base: &str, params: &[(&str, String)]) -> Result<String, DataError> {
    reqwest::Url::parse_with_params(base, params)
        .map(String::from)
        .map_err(|e| DataError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_encodes_params() {
        let url = build_url(
            "https://api.example.com/v3/coins/markets",
            &[("vs_currency", "usd".into()), ("page", 2.to_string())],
        )
        .unwrap();
        assert_eq!(
            url,
            "https://api.example.com/v3/coins/markets?vs_currency=usd&page=2"
        );
    }

    #[test]
    fn build_url_rejects_garbage() {
        let err = build_url("not a url", &[]).unwrap_err();
        assert!(matches!(err, DataError::InvalidUrl { .. }));
    }

    #[test]
    fn http_fetcher_builds() {
        assert!(HttpFetcher::new(Duration::from_secs(5), DEFAULT_USER_AGENT).is_ok());
    }
}
