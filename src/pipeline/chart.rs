//! Chart batch driver: walks seasons and events, derives standings and
//! history series, and writes the SVG artifacts.
//!
//! Artifact names are deterministic (`{year}-{category}`,
//! `{location}-{category}`, `{year}-{location}-{category}`), so a re-run
//! over the same range overwrites in place.

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::charts::render::{ChartStyle, render_svg};
use crate::charts::{history, standings};
use crate::config::AppConfig;
use crate::models::{ChartSeries, EventRec};
use crate::storage::Repository;

pub struct ChartPipeline {
    config: AppConfig,
}

#[derive(Debug, Default)]
pub struct ChartStats {
    pub seasons_charted: usize,
    pub events_charted: usize,
    pub charts_written: usize,
}

impl ChartPipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, season: Option<i32>, event: Option<String>) -> Result<ChartStats> {
        let repo = Repository::open(&self.config.storage.db_path)
            .context("Failed to open DuckDB")?;
        if self.config.storage.run_migrations {
            repo.run_migrations()?;
        }
        let until = Utc::now().year();
        self.run_with(&repo, season, event, until)
    }

    /// Charting core with an injectable repository and year upper bound.
    pub fn run_with(
        &self,
        repo: &Repository,
        season_override: Option<i32>,
        event_override: Option<String>,
        until_year: i32,
    ) -> Result<ChartStats> {
        fs::create_dir_all(&self.config.charts.out_dir).with_context(|| {
            format!("Could not create chart dir {:?}", self.config.charts.out_dir)
        })?;

        let checkpoint = repo.checkpoint()?;
        let (start_year, resume_location) = match season_override {
            Some(year) => (year, event_override),
            None => {
                let resume =
                    Some(checkpoint.charted_event.clone()).filter(|e| !e.is_empty());
                (checkpoint.charted_season, event_override.or(resume))
            }
        };

        let mut stats = ChartStats::default();

        for year in start_year..=until_year {
            let Some(season) = repo.season_by_year(year)? else {
                // No data for this season yet: the run ends here.
                break;
            };
            info!("Charting season {}", year);

            let mut events = repo.events_for_season(season.id)?;
            if year == start_year {
                if let Some(loc) = resume_location.as_deref() {
                    // A location that was never stored means no filter;
                    // otherwise resume from the matching event onward.
                    if repo.location_id(loc)?.is_some() {
                        events = match events.iter().position(|e| e.location == loc) {
                            Some(idx) => events.split_off(idx),
                            None => Vec::new(),
                        };
                    }
                }
            }

            for event in &events {
                self.chart_event(repo, event, year, &mut stats)?;
                repo.set_charted_event(&event.location)?;
                stats.events_charted += 1;
            }

            for (category, series) in standings::season_standings(repo, &season)? {
                let key = format!("{}-{}", year, category);
                self.write_chart(&series, ChartStyle::Aggregate, &key, &mut stats);
            }

            repo.set_charted_season(year)?;
            stats.seasons_charted += 1;
        }

        Ok(stats)
    }

    fn chart_event(
        &self,
        repo: &Repository,
        event: &EventRec,
        year: i32,
        stats: &mut ChartStats,
    ) -> Result<()> {
        let span = self.config.charts.history_seasons;
        for (category, series) in history::event_history(repo, event, year, span)? {
            let key = format!("{}-{}", event.location, category);
            self.write_chart(&series, ChartStyle::PositionHistory, &key, stats);
        }

        let slots = self.config.charts.q2_seeded_slots;
        for (category, series) in history::session_history(repo, event, year, slots)? {
            let key = format!("{}-{}-{}", year, event.location, category);
            self.write_chart(&series, ChartStyle::PositionHistory, &key, stats);
        }
        Ok(())
    }

    fn chart_path(&self, key: &str) -> PathBuf {
        self.config.charts.out_dir.join(format!("{}.svg", key))
    }

    /// A chart that fails to render is logged and skipped; the batch keeps
    /// going.
    fn write_chart(
        &self,
        series: &ChartSeries,
        style: ChartStyle,
        key: &str,
        stats: &mut ChartStats,
    ) {
        if series.series.is_empty() {
            return;
        }
        let path = self.chart_path(key);
        match render_svg(series, style, &path) {
            Ok(()) => stats.charts_written += 1,
            Err(e) => warn!("Skipping chart {}: {:#}", key, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawResultsTable;

    fn race_table(riders: &[(&str, &str)]) -> RawResultsTable {
        RawResultsTable {
            source_url: "url".into(),
            rows: riders
                .iter()
                .enumerate()
                .map(|(i, (rider, time))| {
                    vec![
                        (i + 1).to_string(),
                        "25".into(),
                        "7".into(),
                        rider.to_string(),
                        "ITA".into(),
                        "Team".into(),
                        "Bike".into(),
                        "340.0".into(),
                        time.to_string(),
                    ]
                })
                .collect(),
            ..Default::default()
        }
    }

    fn seeded_repo() -> Repository {
        let repo = Repository::open_in_memory().unwrap();
        repo.run_migrations().unwrap();

        let riders = [("Dummy RIDERONE", "41'30.0"), ("Dummy RIDERTWO", "41'31.0")];
        for year in [1998, 1999] {
            for event in ["QAT", "ARG"] {
                repo.ingest_session(year, event, "500cc", "RAC", &race_table(&riders))
                    .unwrap();
            }
        }
        repo
    }

    fn pipeline(out_dir: &std::path::Path) -> ChartPipeline {
        let mut config = crate::config::AppConfig::default();
        config.charts.out_dir = out_dir.to_path_buf();
        ChartPipeline::new(config)
    }

    #[test]
    fn writes_all_artifact_kinds_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo();

        let stats = pipeline(dir.path())
            .run_with(&repo, Some(1998), None, 1999)
            .unwrap();

        assert_eq!(stats.seasons_charted, 2);
        assert_eq!(stats.events_charted, 4);

        // Standings per (season, category), cross-year history per
        // (location, category), session history per (season, location,
        // category).
        assert!(dir.path().join("1998-500cc.svg").exists());
        assert!(dir.path().join("1999-500cc.svg").exists());
        assert!(dir.path().join("QAT-500cc.svg").exists());
        assert!(dir.path().join("1999-QAT-500cc.svg").exists());
        assert!(dir.path().join("1998-ARG-500cc.svg").exists());

        let cp = repo.checkpoint().unwrap();
        assert_eq!(cp.charted_season, 1999);
        assert_eq!(cp.charted_event, "ARG");
    }

    #[test]
    fn stops_at_first_missing_season() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo();

        // 1997 has no data, so nothing at all is charted.
        let stats = pipeline(dir.path())
            .run_with(&repo, Some(1997), None, 1999)
            .unwrap();
        assert_eq!(stats.seasons_charted, 0);
        assert_eq!(stats.charts_written, 0);
    }

    #[test]
    fn resumes_mid_season_from_the_checkpoint_location() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo();
        repo.set_charted_season(1999).unwrap();
        repo.set_charted_event("ARG").unwrap();

        let stats = pipeline(dir.path()).run_with(&repo, None, None, 1999).unwrap();

        // Only the events from ARG onward are re-charted.
        assert_eq!(stats.events_charted, 1);
        assert!(dir.path().join("1999-ARG-500cc.svg").exists());
        assert!(!dir.path().join("1999-QAT-500cc.svg").exists());
    }

    #[test]
    fn unknown_checkpoint_location_means_no_filter() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo();
        repo.set_charted_season(1999).unwrap();
        repo.set_charted_event("NEVERSTORED").unwrap();

        let stats = pipeline(dir.path()).run_with(&repo, None, None, 1999).unwrap();
        assert_eq!(stats.events_charted, 2);
    }
}
