pub mod chart;
pub mod scrape;

pub use chart::{ChartPipeline, ChartStats};
pub use scrape::{ScrapePipeline, ScrapeStats};
