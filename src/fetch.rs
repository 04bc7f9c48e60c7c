//! Remote source fetching.
//!
//! Transport sits behind the [`SourceFetcher`] seam so that resolution and
//! the engines stay testable without a network. The production
//! implementation is a thin reqwest client with a bounded timeout and no
//! retries: a failed source simply contributes nothing for the run.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};

/// Bounded per-request timeout; a dead source must never hang the run.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_USER_AGENT: &str = concat!("listforge/", env!("CARGO_PKG_VERSION"));

/// Abstract remote text source.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch raw text from a URL. Errors are contained by callers.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP fetcher backed by reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Fetch a URL, degrading any failure to `None` with a warning.
pub async fn fetch_or_empty(fetcher: &dyn SourceFetcher, url: &str) -> Option<String> {
    match fetcher.fetch(url).await {
        Ok(text) => Some(text),
        Err(err) => {
            log::warn!("fetch failed for {}: {}", url, err);
            None
        }
    }
}
