mod charts;
mod config;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::pipeline::{ChartPipeline, ScrapePipeline};
use crate::storage::Repository;

#[derive(Parser)]
#[command(name = "gpstats-etl", about = "Grand Prix results ETL & charting", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape results from the source site (resumes from the checkpoint)
    Scrape {
        /// Season to start from instead of resuming
        #[arg(short, long)]
        season: Option<i32>,

        /// Event code to start after within the starting season
        #[arg(short, long)]
        event: Option<String>,
    },

    /// Regenerate chart artifacts (resumes from the checkpoint)
    Chart {
        /// Season to start from instead of resuming
        #[arg(short, long)]
        season: Option<i32>,

        /// Event location to resume from within the starting season
        #[arg(short, long)]
        event: Option<String>,
    },

    /// Scrape, then chart
    Update {
        #[arg(short, long)]
        season: Option<i32>,
    },

    /// Show database statistics
    Stats,

    /// Print the navigation menu JSON
    Menu {
        /// Recompute the menu from the relational data first
        #[arg(long)]
        rebuild: bool,
    },

    /// Apply schema migrations without scraping
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "gpstats_etl=info,warn",
        1 => "gpstats_etl=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Scrape { season, event } => {
            let _t = utils::Timer::start("Scrape run");
            let stats = ScrapePipeline::new(config).run(season, event).await?;
            info!(
                "Done: {} seasons, {} sessions, {} results, {} rows skipped",
                stats.seasons_processed,
                stats.sessions_ingested,
                stats.results_inserted,
                stats.rows_skipped
            );
        }

        Command::Chart { season, event } => {
            let _t = utils::Timer::start("Chart run");
            let stats = ChartPipeline::new(config).run(season, event)?;
            info!(
                "Done: {} seasons, {} events, {} charts written",
                stats.seasons_charted, stats.events_charted, stats.charts_written
            );
        }

        Command::Update { season } => {
            let _t = utils::Timer::start("Update run");
            let scraped = ScrapePipeline::new(config.clone()).run(season, None).await?;
            info!(
                "Scraped: {} seasons, {} sessions, {} results",
                scraped.seasons_processed, scraped.sessions_ingested, scraped.results_inserted
            );
            let charted = ChartPipeline::new(config).run(season, None)?;
            info!(
                "Charted: {} seasons, {} charts written",
                charted.seasons_charted, charted.charts_written
            );
        }

        Command::Stats => {
            let repo = Repository::open(&config.storage.db_path)?;
            repo.run_migrations()?;
            let cp = repo.checkpoint()?;
            let dash = |s: &str| if s.is_empty() { "—".to_string() } else { s.to_string() };
            println!("─────────────────────────────────");
            println!("  gpstats — Database Stats");
            println!("─────────────────────────────────");
            println!("  Seasons  : {}", utils::fmt_number(repo.season_count()?));
            println!("  Events   : {}", utils::fmt_number(repo.event_count()?));
            println!("  Sessions : {}", utils::fmt_number(repo.session_count()?));
            println!("  Results  : {}", utils::fmt_number(repo.result_count()?));
            println!("  Riders   : {}", utils::fmt_number(repo.rider_count()?));
            println!("  Scraped  : {} / {}", cp.scraped_season, dash(&cp.scraped_event));
            println!("  Charted  : {} / {}", cp.charted_season, dash(&cp.charted_event));
            println!("─────────────────────────────────");
        }

        Command::Menu { rebuild } => {
            let repo = Repository::open(&config.storage.db_path)?;
            repo.run_migrations()?;
            if rebuild {
                repo.rebuild_menu()?;
            } else {
                repo.rebuild_menu_if_dirty()?;
            }
            println!("{}", repo.menu_json()?);
        }

        Command::Migrate => {
            Repository::open(&config.storage.db_path)?.run_migrations()?;
            println!("Migrations applied.");
        }
    }

    Ok(())
}
