// src/ingest/fetch.rs
use anyhow::{bail, Context, Result};
use reqwest::Client;
use std::time::Duration;

use crate::config::{CrawlerConfig, FeedSource};

/// HTTP fetcher shared by all feed sources. The client carries a
/// browser-like User-Agent so feeds that block obvious bots still answer.
pub struct Fetcher {
    client: Client,
    delay: Duration,
}

impl Fetcher {
    pub fn new(crawler: &CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&crawler.user_agent)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(crawler.timeout_secs))
            .build()
            .context("building http client")?;

        Ok(Self {
            client,
            delay: Duration::from_secs(crawler.request_delay_secs),
        })
    }

    /// Fetch one source's raw feed body. Errors here are per-source: the
    /// pipeline logs them and moves on to the next feed.
    pub async fn fetch_source(&self, source: &FeedSource) -> Result<String> {
        let resp = self
            .client
            .get(&source.url)
            .send()
            .await
            .with_context(|| format!("requesting {}", source.url))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP {status} from {}", source.url);
        }

        resp.text()
            .await
            .with_context(|| format!("reading body from {}", source.url))
    }

    /// Inter-source pause to stay under rate limits.
    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}
