//! Scrape orchestrator: drives the season → event → category → session
//! traversal against a `ResultsSource` and ingests everything it finds.
//!
//! ## Checkpoint discipline
//!
//! An event is checkpointed as soon as at least one category is discovered
//! for it, so a crash mid-event resumes from that event. A season is
//! checkpointed only after every event completed. The resume event code is
//! handed to option discovery as a cutoff; when it has gone stale the
//! discovery yields nothing and the level ends silently.

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::scraper::{MotogpScraper, ResultsSource};
use crate::storage::Repository;

/// Event codes that are navigation artifacts on the source site, not
/// actual events.
const SKIPPED_EVENT_CODES: &[&str] = &["T22"];

pub struct ScrapePipeline {
    config: AppConfig,
}

#[derive(Debug, Default)]
pub struct ScrapeStats {
    pub seasons_processed: usize,
    pub sessions_ingested: usize,
    pub results_inserted: usize,
    pub rows_skipped: usize,
}

impl ScrapePipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, season: Option<i32>, event: Option<String>) -> Result<ScrapeStats> {
        let repo = Repository::open(&self.config.storage.db_path)
            .context("Failed to open DuckDB")?;
        if self.config.storage.run_migrations {
            repo.run_migrations()?;
        }

        let source = MotogpScraper::new(&self.config.scraper)
            .context("Failed to build scraper")?;

        let until = Utc::now().year();
        self.run_with(&repo, &source, season, event, until).await
    }

    /// Traversal core with an injectable source and season upper bound.
    pub async fn run_with(
        &self,
        repo: &Repository,
        source: &dyn ResultsSource,
        season_override: Option<i32>,
        event_override: Option<String>,
        until_season: i32,
    ) -> Result<ScrapeStats> {
        let checkpoint = repo.checkpoint()?;
        let (start_season, start_event) = match season_override {
            Some(season) => (season, event_override),
            None => {
                let resume_event =
                    Some(checkpoint.scraped_event.clone()).filter(|e| !e.is_empty());
                (checkpoint.scraped_season, event_override.or(resume_event))
            }
        };

        let mut stats = ScrapeStats::default();

        for season in start_season..=until_season {
            info!("Parsing season {}", season);
            let events = source.season_events(season, start_event.as_deref()).await?;

            for event in events {
                if SKIPPED_EVENT_CODES.contains(&event.as_str()) {
                    continue;
                }
                info!("{}: {}", season, event);

                let categories = source.event_categories(season, &event).await?;
                if !categories.is_empty() {
                    // A crash from here on resumes mid-event.
                    repo.set_scraped_event(&event)?;
                }

                for category in &categories {
                    debug!("{}: {}: {}", season, event, category);
                    let sessions = source.category_sessions(season, &event, category).await?;

                    for session in sessions {
                        let table = source
                            .session_results(season, &event, category, &session)
                            .await?;
                        let outcome =
                            repo.ingest_session(season, &event, category, &session, &table)?;
                        if outcome.session_id.is_some() {
                            stats.sessions_ingested += 1;
                        }
                        stats.results_inserted += outcome.results_inserted;
                        stats.rows_skipped += outcome.rows_skipped;
                    }
                }

                if repo.rebuild_menu_if_dirty()? {
                    debug!("{}: {}: menu cache rebuilt", season, event);
                }
            }

            repo.set_scraped_season(season)?;
            stats.seasons_processed += 1;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::models::RawResultsTable;

    /// Fixed navigation tree standing in for the live site. Every season
    /// offers the same event codes, like the real source does.
    struct StubSource {
        events: Vec<&'static str>,
        categories: Vec<&'static str>,
        sessions: Vec<&'static str>,
        fetched: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn new(
            events: Vec<&'static str>,
            categories: Vec<&'static str>,
            sessions: Vec<&'static str>,
        ) -> Self {
            Self { events, categories, sessions, fetched: Mutex::new(Vec::new()) }
        }
    }

    fn race_table(url: &str) -> RawResultsTable {
        RawResultsTable {
            source_url: url.to_string(),
            rows: vec![
                vec![
                    "1".into(), "25".into(), "46".into(), "Dummy RIDERONE".into(),
                    "ITA".into(), "Team A".into(), "BikeX".into(), "340.0".into(),
                    "41'32.001".into(),
                ],
                vec![
                    "2".into(), "20".into(), "4".into(), "Dummy RIDERTWO".into(),
                    "ESP".into(), "Team B".into(), "BikeY".into(), "339.0".into(),
                    "41'33.500".into(),
                ],
            ],
            ..Default::default()
        }
    }

    #[async_trait]
    impl ResultsSource for StubSource {
        async fn season_events(&self, _season: i32, after: Option<&str>) -> Result<Vec<String>> {
            let all: Vec<String> = self.events.iter().map(|e| e.to_string()).collect();
            Ok(match after {
                None => all,
                Some(cutoff) => match all.iter().position(|e| e == cutoff) {
                    Some(idx) => all[idx + 1..].to_vec(),
                    None => Vec::new(),
                },
            })
        }

        async fn event_categories(&self, _season: i32, _event: &str) -> Result<Vec<String>> {
            Ok(self.categories.iter().map(|c| c.to_string()).collect())
        }

        async fn category_sessions(
            &self,
            _season: i32,
            _event: &str,
            _category: &str,
        ) -> Result<Vec<String>> {
            Ok(self.sessions.iter().map(|s| s.to_string()).collect())
        }

        async fn session_results(
            &self,
            season: i32,
            event: &str,
            category: &str,
            session: &str,
        ) -> Result<RawResultsTable> {
            let url = format!("http://stub/{}/{}/{}/{}", season, event, category, session);
            self.fetched.lock().unwrap().push(url.clone());
            Ok(race_table(&url))
        }
    }

    fn pipeline() -> ScrapePipeline {
        ScrapePipeline::new(crate::config::AppConfig::default())
    }

    fn repo() -> Repository {
        let repo = Repository::open_in_memory().unwrap();
        repo.run_migrations().unwrap();
        repo
    }

    #[tokio::test]
    async fn traverses_and_checkpoints() {
        let repo = repo();
        let source = StubSource::new(vec!["QAT", "ARG"], vec!["500cc"], vec!["RAC"]);

        let stats = pipeline()
            .run_with(&repo, &source, Some(1999), None, 2000)
            .await
            .unwrap();

        // 2 seasons × 2 events × 1 category × 1 session.
        assert_eq!(stats.seasons_processed, 2);
        assert_eq!(stats.sessions_ingested, 4);
        assert_eq!(stats.results_inserted, 8);

        let cp = repo.checkpoint().unwrap();
        assert_eq!(cp.scraped_season, 2000);
        assert_eq!(cp.scraped_event, "ARG");

        // The menu cache was rebuilt along the way.
        assert!(!repo.menu_is_dirty().unwrap());
        assert_eq!(repo.session_count().unwrap(), 4);
    }

    #[tokio::test]
    async fn deny_listed_events_are_skipped() {
        let repo = repo();
        let source = StubSource::new(vec!["T22", "QAT"], vec!["500cc"], vec!["RAC"]);

        pipeline()
            .run_with(&repo, &source, Some(1999), None, 1999)
            .await
            .unwrap();

        let fetched = source.fetched.lock().unwrap();
        assert!(fetched.iter().all(|u| !u.contains("/T22/")));
        assert_eq!(fetched.len(), 1);
    }

    #[tokio::test]
    async fn resume_cutoff_limits_event_discovery() {
        let repo = repo();
        repo.set_scraped_season(1999).unwrap();
        repo.set_scraped_event("ARG").unwrap();
        let source = StubSource::new(vec!["QAT", "ARG", "AME"], vec!["500cc"], vec!["RAC"]);

        pipeline()
            .run_with(&repo, &source, None, None, 1999)
            .await
            .unwrap();

        let fetched = source.fetched.lock().unwrap();
        assert_eq!(fetched.len(), 1);
        assert!(fetched[0].contains("/AME/"));
    }

    #[tokio::test]
    async fn stale_cutoff_silently_yields_no_work() {
        let repo = repo();
        repo.set_scraped_season(1999).unwrap();
        repo.set_scraped_event("GONE").unwrap();
        let source = StubSource::new(vec!["QAT", "ARG"], vec!["500cc"], vec!["RAC"]);

        let stats = pipeline()
            .run_with(&repo, &source, None, None, 1999)
            .await
            .unwrap();

        // No events matched, nothing ingested, but the season still
        // completes and is checkpointed.
        assert_eq!(stats.sessions_ingested, 0);
        assert_eq!(repo.checkpoint().unwrap().scraped_season, 1999);
    }

    #[tokio::test]
    async fn explicit_season_ignores_stale_event_checkpoint() {
        let repo = repo();
        repo.set_scraped_event("GONE").unwrap();
        let source = StubSource::new(vec!["QAT"], vec!["500cc"], vec!["RAC"]);

        let stats = pipeline()
            .run_with(&repo, &source, Some(1999), None, 1999)
            .await
            .unwrap();

        assert_eq!(stats.sessions_ingested, 1);
    }
}
