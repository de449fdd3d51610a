//! Reference [`Fetcher`] implementations.

use crate::parser::{FetchedBody, Fetcher};
use async_trait::async_trait;
use cothority_core::{CothorityError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Blocking GET over `reqwest`, the fetch boundary `spec.md` §1 describes
/// ("presumed blocking GET returning body + content-type").
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedBody> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CothorityError::network(format!("GET {url} failed: {e}")))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CothorityError::network(format!("reading body of {url} failed: {e}")))?
            .to_vec();

        Ok(FetchedBody { content_type, bytes })
    }
}

/// In-memory fixed-content fetcher used by tests and the `skipstart` demo
/// mode, where every node is expected to observe the exact same bytes
/// (`spec.md` §8 S1 "all nodes serve the same HTML").
#[derive(Default)]
pub struct StaticFetcher {
    pages: Mutex<HashMap<String, FetchedBody>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, content_type: &str, bytes: &[u8]) -> Self {
        self.pages.lock().expect("fetcher mutex poisoned").insert(
            url.into(),
            FetchedBody {
                content_type: content_type.to_string(),
                bytes: bytes.to_vec(),
            },
        );
        self
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedBody> {
        self.pages
            .lock()
            .expect("fetcher mutex poisoned")
            .get(url)
            .map(|body| FetchedBody {
                content_type: body.content_type.clone(),
                bytes: body.bytes.clone(),
            })
            .ok_or_else(|| CothorityError::not_found(format!("no fixture page for {url}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_fetcher_returns_registered_page() {
        let fetcher = StaticFetcher::new().with_page(
            "http://example.test/",
            "text/html",
            b"<html><body>hello</body></html>",
        );
        let body = fetcher.fetch("http://example.test/").await.unwrap();
        assert_eq!(body.content_type, "text/html");
        assert_eq!(body.bytes, b"<html><body>hello</body></html>");
    }

    #[tokio::test]
    async fn static_fetcher_rejects_unknown_url() {
        let fetcher = StaticFetcher::new();
        assert!(fetcher.fetch("http://nowhere.test/").await.is_err());
    }
}
