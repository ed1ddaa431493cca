use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub storage: StorageConfig,
    pub charts: ChartConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum delay before every page fetch. The source site is throttled
    /// to at most one request per second.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Total fetch attempts per page before the run is aborted.
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,

    /// Pause between fetch attempts.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

/// Chart generation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChartConfig {
    #[serde(default = "default_chart_dir")]
    pub out_dir: PathBuf,

    /// Seasons of history, in addition to the current one, shown in the
    /// per-track results chart.
    #[serde(default = "default_history_seasons")]
    pub history_seasons: i32,

    /// Riders whose practice times are good enough to skip Q1 and be
    /// seeded straight into the front of the qualifying order.
    #[serde(default = "default_q2_seeded_slots")]
    pub q2_seeded_slots: usize,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "http://www.motogp.com/en/Results+Statistics".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_jitter_ms() -> u64 {
    250
}
fn default_fetch_attempts() -> u32 {
    5
}
fn default_retry_backoff_secs() -> u64 {
    180
}
fn default_user_agent() -> String {
    "gpstats-etl/0.1 (historical results archive)".to_string()
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/gpstats.duckdb")
}
fn default_chart_dir() -> PathBuf {
    PathBuf::from("static/charts")
}
fn default_history_seasons() -> i32 {
    5
}
fn default_q2_seeded_slots() -> usize {
    10
}
fn default_true() -> bool {
    true
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("GPSTATS").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        Ok(app_cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig {
                base_url: default_base_url(),
                timeout_secs: default_timeout_secs(),
                request_delay_ms: default_request_delay_ms(),
                jitter_ms: default_jitter_ms(),
                fetch_attempts: default_fetch_attempts(),
                retry_backoff_secs: default_retry_backoff_secs(),
                user_agent: default_user_agent(),
            },
            storage: StorageConfig {
                db_path: default_db_path(),
                run_migrations: true,
            },
            charts: ChartConfig {
                out_dir: default_chart_dir(),
                history_seasons: default_history_seasons(),
                q2_seeded_slots: default_q2_seeded_slots(),
            },
        }
    }
}
