//! Scripted page fetcher for source tests.

use super::fetch::PageFetcher;
use super::provider::DataError;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

/// Serves canned responses by the `page` query parameter.
///
/// Each page has a queue; every request pops one response. A page with no
/// responses left answers 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: RefCell<HashMap<u32, VecDeque<Result<String, DataError>>>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, page: u32, response: Result<String, DataError>) -> Self {
        self.pages
            .borrow_mut()
            .entry(page)
            .or_default()
            .push_back(response);
        self
    }

    pub fn ok(self, page: u32, body: &str) -> Self {
        self.respond(page, Ok(body.to_string()))
    }

    pub fn timeout(self, page: u32) -> Self {
        self.respond(page, Err(DataError::Timeout("operation timed out".into())))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl PageFetcher for ScriptedFetcher {
    fn get_text(&self, url: &str) -> Result<String, DataError> {
        self.calls.borrow_mut().push(url.to_string());
        let page = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| {
                u.query_pairs()
                    .find(|(k, _)| k == "page")
                    .and_then(|(_, v)| v.parse::<u32>().ok())
            })
            .unwrap_or(1);
        self.pages
            .borrow_mut()
            .get_mut(&page)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| {
                Err(DataError::HttpStatus {
                    status: 404,
                    url: url.to_string(),
                })
            })
    }
}
