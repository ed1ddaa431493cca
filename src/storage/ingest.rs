//! Session ingestion: parsed results table → normalized rows.

use anyhow::Result;
use duckdb::params;
use tracing::{debug, warn};

use crate::models::{IngestOutcome, RawResultsTable};
use crate::scraper::names::split_display_name;

use super::Repository;

struct ColumnMap {
    rider: usize,
    nation: usize,
    team: usize,
    bike: usize,
    speed: usize,
    time: usize,
}

/// Point-session rows carry a points column, shifting the data one cell
/// to the right compared to practice/qualifying rows.
const POINT_COLUMNS: ColumnMap = ColumnMap { rider: 3, nation: 4, team: 5, bike: 6, speed: 7, time: 8 };
const REGULAR_COLUMNS: ColumnMap = ColumnMap { rider: 2, nation: 3, team: 4, bike: 5, speed: 6, time: 7 };

struct RowCells<'a> {
    rider: &'a str,
    nation: &'a str,
    team: &'a str,
    bike: &'a str,
    speed: &'a str,
    time: &'a str,
}

fn row_cells<'a>(row: &'a [String], cols: &ColumnMap) -> Option<RowCells<'a>> {
    Some(RowCells {
        rider: row.get(cols.rider)?.as_str(),
        nation: row.get(cols.nation)?.as_str(),
        team: row.get(cols.team)?.as_str(),
        bike: row.get(cols.bike)?.as_str(),
        speed: row.get(cols.speed)?.as_str(),
        time: row.get(cols.time)?.as_str(),
    })
}

impl Repository {
    /// Persist one scraped session.
    ///
    /// All referenced entities are resolved by natural key with
    /// get-or-create semantics; results are appended with positions
    /// assigned 1..K in row order. Rows with short cells or unsplittable
    /// rider names are skipped without advancing the position counter.
    ///
    /// "RAC2"/"WUP2" mark a restarted session: the existing "RAC"/"WUP"
    /// sibling is deleted (results included) and the new session is stored
    /// under the canonical code. Without a predecessor the call is a
    /// logged no-op.
    ///
    /// Re-ingesting an identical table for an existing session appends a
    /// second set of results: raw ingestion is deliberately NOT
    /// idempotent, only entity resolution is.
    pub fn ingest_session(
        &self,
        season: i32,
        event_code: &str,
        category_code: &str,
        session_code: &str,
        table: &RawResultsTable,
    ) -> Result<IngestOutcome> {
        let tx = self.conn.unchecked_transaction()?;

        let season_id = self.season_id(season)?;
        let location_id = self.location_id_or_create(event_code)?;
        let category_id = self.category_id(category_code)?;
        self.link_season_category(season_id, category_id)?;
        let event_id = self.event_id(season_id, location_id)?;
        self.link_event_category(event_id, category_id)?;

        let point_event = matches!(session_code, "RAC" | "RAC2");

        let session_type = match session_code {
            "RAC2" | "WUP2" => {
                let canonical = &session_code[..3];
                match self.session_row_id(event_id, category_id, canonical)? {
                    Some(old_id) => {
                        debug!(
                            "{} supersedes {} for {} {} {} — replacing",
                            session_code, canonical, season, event_code, category_code
                        );
                        self.delete_session(old_id)?;
                        canonical
                    }
                    None => {
                        warn!(
                            "{} arrived with no prior {} session for {} {} {} — skipped",
                            session_code, canonical, season, event_code, category_code
                        );
                        return Ok(IngestOutcome::default());
                    }
                }
            }
            other => other,
        };

        let session_id =
            self.session_id(event_id, category_id, session_type, point_event, &table.source_url)?;

        let cols = if point_event { &POINT_COLUMNS } else { &REGULAR_COLUMNS };
        let mut inserted = 0usize;
        let mut skipped = 0usize;

        for row in &table.rows {
            let Some(cells) = row_cells(row, cols) else {
                skipped += 1;
                continue;
            };
            let Some((first, last)) = split_display_name(cells.rider) else {
                debug!(
                    "unparseable rider name {:?}: s={} e={} c={} sess={}",
                    cells.rider, season, event_code, category_code, session_type
                );
                skipped += 1;
                continue;
            };

            let rider_id =
                self.rider_id(cells.rider, &last, &first, &cells.nation.to_lowercase())?;
            let team_id = self.team_id(cells.team)?;
            let brand_id = self.brand_id(cells.bike)?;

            self.conn.execute(
                "INSERT INTO results (session_id, rider_id, brand_id, team_id, position, top_speed, lap_time)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    session_id,
                    rider_id,
                    brand_id,
                    team_id,
                    (inserted + 1) as i64,
                    cells.speed,
                    cells.time
                ],
            )?;
            inserted += 1;
        }

        // The navigation cache is now stale; the rebuild itself is a
        // separate step so ingestion cost stays flat.
        self.mark_menu_dirty()?;
        tx.commit()?;

        Ok(IngestOutcome {
            session_id: Some(session_id),
            results_inserted: inserted,
            rows_skipped: skipped,
        })
    }
}
