pub mod http_client;
pub mod names;
pub mod options;
pub mod results_table;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::config::ScraperConfig;
use crate::models::RawResultsTable;

use self::http_client::HttpClient;
use self::options::extract_options;
use self::results_table::parse_results_table;

/// Selector-widget ids on the results pages, one per navigation level.
const EVENT_SELECTOR: &str = "event";
const CATEGORY_SELECTOR: &str = "category";
const SESSION_SELECTOR: &str = "session";

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable results-site abstraction: option discovery per level plus the
/// session results fetch. The orchestrator only talks to this.
#[async_trait]
pub trait ResultsSource: Send + Sync {
    /// Event codes offered for a season, optionally only those after a
    /// previously-scraped code.
    async fn season_events(&self, season: i32, after: Option<&str>) -> Result<Vec<String>>;

    async fn event_categories(&self, season: i32, event: &str) -> Result<Vec<String>>;

    async fn category_sessions(
        &self,
        season: i32,
        event: &str,
        category: &str,
    ) -> Result<Vec<String>>;

    async fn session_results(
        &self,
        season: i32,
        event: &str,
        category: &str,
        session: &str,
    ) -> Result<RawResultsTable>;
}

// ── Results site scraper ──────────────────────────────────────────────────────

/// Scraper for the fixed `{base}/{season}/{event}/{category}/{session}`
/// page scheme of the results site.
pub struct MotogpScraper {
    client: HttpClient,
    base_url: String,
}

impl MotogpScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Url::parse(&config.base_url)
            .with_context(|| format!("Invalid base url {}", config.base_url))?;

        Ok(Self {
            client: HttpClient::new(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, segments: &[&str]) -> String {
        format!("{}/{}", self.base_url, segments.join("/"))
    }
}

#[async_trait]
impl ResultsSource for MotogpScraper {
    async fn season_events(&self, season: i32, after: Option<&str>) -> Result<Vec<String>> {
        let season = season.to_string();
        let url = self.url(&[&season]);
        let html = self.client.get_text(&url).await?;
        let events = extract_options(&html, EVENT_SELECTOR, after);
        debug!("{}: {} events", season, events.len());
        Ok(events)
    }

    async fn event_categories(&self, season: i32, event: &str) -> Result<Vec<String>> {
        let season = season.to_string();
        let url = self.url(&[&season, event]);
        let html = self.client.get_text(&url).await?;
        Ok(extract_options(&html, CATEGORY_SELECTOR, None))
    }

    async fn category_sessions(
        &self,
        season: i32,
        event: &str,
        category: &str,
    ) -> Result<Vec<String>> {
        let season = season.to_string();
        let url = self.url(&[&season, event, category]);
        let html = self.client.get_text(&url).await?;
        Ok(extract_options(&html, SESSION_SELECTOR, None))
    }

    async fn session_results(
        &self,
        season: i32,
        event: &str,
        category: &str,
        session: &str,
    ) -> Result<RawResultsTable> {
        let season = season.to_string();
        let url = self.url(&[&season, event, category, session]);
        let html = self.client.get_text(&url).await?;
        Ok(parse_results_table(&html, &url))
    }
}
