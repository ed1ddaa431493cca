use rand::RngExt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, warn};

use crate::config::ScraperConfig;

/// Fatal fetch failure: every attempt on a page failed. The scraping run
/// terminates; an operator is expected to look at the site and restart.
#[derive(Debug, Error)]
#[error("fetch attempts exhausted for {url}")]
pub struct FetchError {
    pub url: String,
    #[source]
    pub source: reqwest::Error,
}

pub struct HttpClient {
    inner: reqwest::Client,
    config: ScraperConfig,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> anyhow::Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
            .build()?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    /// Fetch a URL as text, throttled and retried.
    ///
    /// Transport failures are retried with a long fixed backoff; the page
    /// body is returned whatever the HTTP status, since the source site
    /// answers unknown paths with a page whose widgets simply parse empty.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.polite_delay().await;

        let retries = self.config.fetch_attempts.saturating_sub(1) as usize;
        let backoff = FixedInterval::new(Duration::from_secs(self.config.retry_backoff_secs))
            .take(retries);

        let mut attempt = 0u32;
        Retry::spawn(backoff, || {
            attempt += 1;
            if attempt > 1 {
                warn!("GET {} retry (attempt {})", url, attempt);
            }
            self.fetch_once(url)
        })
        .await
        .map_err(|e| FetchError {
            url: url.to_string(),
            source: e,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, reqwest::Error> {
        debug!("GET {}", url);
        let resp = self.inner.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            debug!("GET {} answered {}", url, status);
        }
        resp.text().await
    }

    /// Sleep for the configured delay + random jitter. Keeps the fetch
    /// rate at or below one request per second.
    async fn polite_delay(&self) {
        let jitter = if self.config.jitter_ms > 0 {
            rand::rng().random_range(0..=self.config.jitter_ms)
        } else {
            0
        };
        sleep(Duration::from_millis(self.config.request_delay_ms + jitter)).await;
    }
}
