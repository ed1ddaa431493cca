use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Raw scraped table ─────────────────────────────────────────────────────────

/// A session results page, parsed but not yet interpreted.
///
/// `rows` holds only data rows; the source URL, the free-text event banner
/// and the header row are carried separately.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResultsTable {
    pub source_url: String,
    pub event_info: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// ── Stored records ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonRec {
    pub id: i64,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRec {
    pub id: i64,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRec {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRec {
    pub id: i64,
    pub session_type: String,
    pub point_event: bool,
    pub source_url: String,
}

/// One classified rider in one session, as the chart engines consume it.
/// `rider` is the display label ("V. ROSSI"); `lap_time` stays the opaque
/// formatted string the source prints.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRec {
    pub rider: String,
    pub position: i64,
    pub lap_time: String,
}

// ── Checkpoint singleton ──────────────────────────────────────────────────────

/// Resume points for the two batch pipelines. Exactly one row exists,
/// seeded by the migration and mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub scraped_season: i32,
    pub scraped_event: String,
    pub charted_season: i32,
    pub charted_event: String,
}

// ── Navigation cache ──────────────────────────────────────────────────────────

/// The navigation tree served to the read side: season → event → categories
/// and event → season → categories.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MenuTree {
    pub season_data: BTreeMap<String, BTreeMap<String, BTreeMap<String, bool>>>,
    pub event_data: BTreeMap<String, BTreeMap<String, BTreeMap<String, bool>>>,
}

// ── Chart series ──────────────────────────────────────────────────────────────

/// Series data handed to the renderer: a title, ordered column labels, and
/// ordered (rider, values) pairs of equal length. `None` marks a column the
/// rider has no value for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub title: String,
    pub columns: Vec<String>,
    pub series: Vec<(String, Vec<Option<i64>>)>,
}

// ── Ingestion outcome ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    pub session_id: Option<i64>,
    pub results_inserted: usize,
    pub rows_skipped: usize,
}
