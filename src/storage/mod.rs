mod ingest;
mod menu;

use anyhow::{Context, Result};
use duckdb::{Connection, Params, params};
use std::path::Path;
use tracing::info;

use crate::models::{CategoryRec, Checkpoint, EventRec, ResultRec, SeasonRec, SessionRec};

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS seq_seasons;
CREATE SEQUENCE IF NOT EXISTS seq_event_locations;
CREATE SEQUENCE IF NOT EXISTS seq_events;
CREATE SEQUENCE IF NOT EXISTS seq_categories;
CREATE SEQUENCE IF NOT EXISTS seq_sessions;
CREATE SEQUENCE IF NOT EXISTS seq_riders;
CREATE SEQUENCE IF NOT EXISTS seq_brands;
CREATE SEQUENCE IF NOT EXISTS seq_teams;
CREATE SEQUENCE IF NOT EXISTS seq_results;

CREATE TABLE IF NOT EXISTS seasons (
    id          BIGINT PRIMARY KEY DEFAULT nextval('seq_seasons'),
    year        INTEGER NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS event_locations (
    id          BIGINT PRIMARY KEY DEFAULT nextval('seq_event_locations'),
    -- Doubles as the upstream event code; the two occasionally diverge
    -- in source data (same track, different codes across years).
    location    VARCHAR NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS events (
    id          BIGINT PRIMARY KEY DEFAULT nextval('seq_events'),
    season_id   BIGINT NOT NULL,
    location_id BIGINT NOT NULL,
    UNIQUE (season_id, location_id)
);

CREATE TABLE IF NOT EXISTS categories (
    id          BIGINT PRIMARY KEY DEFAULT nextval('seq_categories'),
    class_name  VARCHAR NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS season_categories (
    season_id   BIGINT NOT NULL,
    category_id BIGINT NOT NULL,
    PRIMARY KEY (season_id, category_id)
);

CREATE TABLE IF NOT EXISTS event_categories (
    event_id    BIGINT NOT NULL,
    category_id BIGINT NOT NULL,
    PRIMARY KEY (event_id, category_id)
);

CREATE TABLE IF NOT EXISTS sessions (
    id           BIGINT PRIMARY KEY DEFAULT nextval('seq_sessions'),
    event_id     BIGINT NOT NULL,
    category_id  BIGINT NOT NULL,
    session_type VARCHAR NOT NULL,
    point_event  BOOLEAN NOT NULL,
    source_url   VARCHAR NOT NULL DEFAULT '',
    UNIQUE (event_id, category_id, session_type)
);

CREATE TABLE IF NOT EXISTS riders (
    id          BIGINT PRIMARY KEY DEFAULT nextval('seq_riders'),
    full_name   VARCHAR NOT NULL,
    last_name   VARCHAR NOT NULL,
    first_name  VARCHAR NOT NULL,
    nationality VARCHAR NOT NULL,
    UNIQUE (full_name, last_name, first_name, nationality)
);

CREATE TABLE IF NOT EXISTS brands (
    id          BIGINT PRIMARY KEY DEFAULT nextval('seq_brands'),
    brand_name  VARCHAR NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS teams (
    id          BIGINT PRIMARY KEY DEFAULT nextval('seq_teams'),
    team_name   VARCHAR NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS results (
    id          BIGINT PRIMARY KEY DEFAULT nextval('seq_results'),
    session_id  BIGINT NOT NULL,
    rider_id    BIGINT NOT NULL,
    brand_id    BIGINT NOT NULL,
    team_id     BIGINT NOT NULL,
    position    INTEGER NOT NULL DEFAULT 0,
    top_speed   VARCHAR NOT NULL DEFAULT '',
    lap_time    VARCHAR NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS update_data (
    id              INTEGER PRIMARY KEY CHECK (id = 1),
    scraped_season  INTEGER NOT NULL,
    scraped_event   VARCHAR NOT NULL,
    charted_season  INTEGER NOT NULL,
    charted_event   VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS menu_options (
    id          INTEGER PRIMARY KEY CHECK (id = 1),
    menu_json   VARCHAR NOT NULL,
    dirty       BOOLEAN NOT NULL
);
"#;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_results_session ON results (session_id);
CREATE INDEX IF NOT EXISTS idx_sessions_event  ON sessions (event_id);
CREATE INDEX IF NOT EXISTS idx_events_season   ON events (season_id);
"#;

/// First season the source site carries results for.
const FIRST_SEASON: i32 = 1993;

// ── Repository ────────────────────────────────────────────────────────────────

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", path))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        self.conn.execute_batch(DDL).context("DDL failed")?;
        self.conn.execute_batch(INDEXES).context("Index creation failed")?;
        // Singleton rows: exactly one of each, seeded once, mutated in place.
        self.conn.execute(
            "INSERT INTO update_data (id, scraped_season, scraped_event, charted_season, charted_event)
             VALUES (1, ?, '', ?, '') ON CONFLICT DO NOTHING",
            params![FIRST_SEASON, FIRST_SEASON],
        )?;
        self.conn.execute(
            "INSERT INTO menu_options (id, menu_json, dirty) VALUES (1, '{}', false)
             ON CONFLICT DO NOTHING",
            [],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    // ── Get-or-create by natural key ──────────────────────────────────────────

    fn get_or_create<P: Params + Clone>(&self, select: &str, insert: &str, p: P) -> Result<i64> {
        if let Ok(id) = self.conn.query_row(select, p.clone(), |r| r.get(0)) {
            return Ok(id);
        }
        self.conn.execute(insert, p.clone())?;
        Ok(self.conn.query_row(select, p, |r| r.get(0))?)
    }

    pub(crate) fn season_id(&self, year: i32) -> Result<i64> {
        self.get_or_create(
            "SELECT id FROM seasons WHERE year = ?",
            "INSERT INTO seasons (year) VALUES (?)",
            params![year],
        )
    }

    pub(crate) fn location_id_or_create(&self, location: &str) -> Result<i64> {
        self.get_or_create(
            "SELECT id FROM event_locations WHERE location = ?",
            "INSERT INTO event_locations (location) VALUES (?)",
            params![location],
        )
    }

    pub(crate) fn category_id(&self, class_name: &str) -> Result<i64> {
        self.get_or_create(
            "SELECT id FROM categories WHERE class_name = ?",
            "INSERT INTO categories (class_name) VALUES (?)",
            params![class_name],
        )
    }

    pub(crate) fn event_id(&self, season_id: i64, location_id: i64) -> Result<i64> {
        self.get_or_create(
            "SELECT id FROM events WHERE season_id = ? AND location_id = ?",
            "INSERT INTO events (season_id, location_id) VALUES (?, ?)",
            params![season_id, location_id],
        )
    }

    pub(crate) fn rider_id(
        &self,
        full_name: &str,
        last_name: &str,
        first_name: &str,
        nationality: &str,
    ) -> Result<i64> {
        self.get_or_create(
            "SELECT id FROM riders
             WHERE full_name = ? AND last_name = ? AND first_name = ? AND nationality = ?",
            "INSERT INTO riders (full_name, last_name, first_name, nationality)
             VALUES (?, ?, ?, ?)",
            params![full_name, last_name, first_name, nationality],
        )
    }

    pub(crate) fn brand_id(&self, brand_name: &str) -> Result<i64> {
        self.get_or_create(
            "SELECT id FROM brands WHERE brand_name = ?",
            "INSERT INTO brands (brand_name) VALUES (?)",
            params![brand_name],
        )
    }

    pub(crate) fn team_id(&self, team_name: &str) -> Result<i64> {
        self.get_or_create(
            "SELECT id FROM teams WHERE team_name = ?",
            "INSERT INTO teams (team_name) VALUES (?)",
            params![team_name],
        )
    }

    pub(crate) fn session_id(
        &self,
        event_id: i64,
        category_id: i64,
        session_type: &str,
        point_event: bool,
        source_url: &str,
    ) -> Result<i64> {
        if let Some(id) = self.session_row_id(event_id, category_id, session_type)? {
            return Ok(id);
        }
        self.conn.execute(
            "INSERT INTO sessions (event_id, category_id, session_type, point_event, source_url)
             VALUES (?, ?, ?, ?, ?)",
            params![event_id, category_id, session_type, point_event, source_url],
        )?;
        self.session_row_id(event_id, category_id, session_type)?
            .context("session vanished after insert")
    }

    pub(crate) fn session_row_id(
        &self,
        event_id: i64,
        category_id: i64,
        session_type: &str,
    ) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM sessions
                 WHERE event_id = ? AND category_id = ? AND session_type = ?",
                params![event_id, category_id, session_type],
                |r| r.get(0),
            )
            .ok())
    }

    pub(crate) fn link_season_category(&self, season_id: i64, category_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO season_categories (season_id, category_id) VALUES (?, ?)
             ON CONFLICT DO NOTHING",
            params![season_id, category_id],
        )?;
        Ok(())
    }

    pub(crate) fn link_event_category(&self, event_id: i64, category_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO event_categories (event_id, category_id) VALUES (?, ?)
             ON CONFLICT DO NOTHING",
            params![event_id, category_id],
        )?;
        Ok(())
    }

    /// Delete a session and its results. The schema carries no FK cascade,
    /// so the children go first.
    pub(crate) fn delete_session(&self, session_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM results WHERE session_id = ?", params![session_id])?;
        self.conn
            .execute("DELETE FROM sessions WHERE id = ?", params![session_id])?;
        Ok(())
    }

    // ── Checkpoint singleton ──────────────────────────────────────────────────

    pub fn checkpoint(&self) -> Result<Checkpoint> {
        self.conn
            .query_row(
                "SELECT scraped_season, scraped_event, charted_season, charted_event
                 FROM update_data WHERE id = 1",
                [],
                |r| {
                    Ok(Checkpoint {
                        scraped_season: r.get(0)?,
                        scraped_event: r.get(1)?,
                        charted_season: r.get(2)?,
                        charted_event: r.get(3)?,
                    })
                },
            )
            .context("checkpoint row missing — run migrations")
    }

    pub fn set_scraped_event(&self, event: &str) -> Result<()> {
        self.conn
            .execute("UPDATE update_data SET scraped_event = ? WHERE id = 1", params![event])?;
        Ok(())
    }

    pub fn set_scraped_season(&self, season: i32) -> Result<()> {
        self.conn
            .execute("UPDATE update_data SET scraped_season = ? WHERE id = 1", params![season])?;
        Ok(())
    }

    pub fn set_charted_event(&self, event: &str) -> Result<()> {
        self.conn
            .execute("UPDATE update_data SET charted_event = ? WHERE id = 1", params![event])?;
        Ok(())
    }

    pub fn set_charted_season(&self, season: i32) -> Result<()> {
        self.conn
            .execute("UPDATE update_data SET charted_season = ? WHERE id = 1", params![season])?;
        Ok(())
    }

    // ── Reads for the chart engines ───────────────────────────────────────────

    pub fn season_by_year(&self, year: i32) -> Result<Option<SeasonRec>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, year FROM seasons WHERE year = ?",
                params![year],
                |r| {
                    Ok(SeasonRec { id: r.get(0)?, year: r.get(1)? })
                },
            )
            .ok())
    }

    /// Events of a season in insertion order, which is the source site's
    /// calendar order.
    pub fn events_for_season(&self, season_id: i64) -> Result<Vec<EventRec>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.id, l.location
             FROM events e JOIN event_locations l ON l.id = e.location_id
             WHERE e.season_id = ? ORDER BY e.id",
        )?;
        let events = stmt
            .query_map(params![season_id], |r| {
                Ok(EventRec { id: r.get(0)?, location: r.get(1)? })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(events)
    }

    pub fn categories_for_season(&self, season_id: i64) -> Result<Vec<CategoryRec>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.class_name
             FROM categories c JOIN season_categories sc ON sc.category_id = c.id
             WHERE sc.season_id = ? ORDER BY c.id",
        )?;
        let cats = stmt
            .query_map(params![season_id], |r| {
                Ok(CategoryRec { id: r.get(0)?, name: r.get(1)? })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(cats)
    }

    pub fn categories_for_event(&self, event_id: i64) -> Result<Vec<CategoryRec>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.class_name
             FROM categories c JOIN event_categories ec ON ec.category_id = c.id
             WHERE ec.event_id = ? ORDER BY c.id",
        )?;
        let cats = stmt
            .query_map(params![event_id], |r| {
                Ok(CategoryRec { id: r.get(0)?, name: r.get(1)? })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(cats)
    }

    pub fn location_id(&self, location: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM event_locations WHERE location = ?",
                params![location],
                |r| r.get(0),
            )
            .ok())
    }

    pub fn event_at(&self, season_id: i64, location_id: i64) -> Result<Option<EventRec>> {
        Ok(self
            .conn
            .query_row(
                "SELECT e.id, l.location
                 FROM events e JOIN event_locations l ON l.id = e.location_id
                 WHERE e.season_id = ? AND e.location_id = ?",
                params![season_id, location_id],
                |r| {
                    Ok(EventRec { id: r.get(0)?, location: r.get(1)? })
                },
            )
            .ok())
    }

    pub fn session_of(
        &self,
        event_id: i64,
        category_id: i64,
        session_type: &str,
    ) -> Result<Option<SessionRec>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, session_type, point_event, source_url FROM sessions
                 WHERE event_id = ? AND category_id = ? AND session_type = ?",
                params![event_id, category_id, session_type],
                |r| {
                    Ok(SessionRec {
                        id: r.get(0)?,
                        session_type: r.get(1)?,
                        point_event: r.get(2)?,
                        source_url: r.get(3)?,
                    })
                },
            )
            .ok())
    }

    /// The championship-scoring session of an event/category, if any.
    pub fn point_session(&self, event_id: i64, category_id: i64) -> Result<Option<SessionRec>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, session_type, point_event, source_url FROM sessions
                 WHERE event_id = ? AND category_id = ? AND point_event LIMIT 1",
                params![event_id, category_id],
                |r| {
                    Ok(SessionRec {
                        id: r.get(0)?,
                        session_type: r.get(1)?,
                        point_event: r.get(2)?,
                        source_url: r.get(3)?,
                    })
                },
            )
            .ok())
    }

    /// Results of a session in finishing order, with the rider rendered as
    /// the display label used in chart series.
    pub fn results_for_session(&self, session_id: i64) -> Result<Vec<ResultRec>> {
        let mut stmt = self.conn.prepare(
            "SELECT upper(substr(d.first_name, 1, 1)) || '. ' || upper(d.last_name),
                    r.position, r.lap_time
             FROM results r JOIN riders d ON d.id = r.rider_id
             WHERE r.session_id = ? ORDER BY r.position",
        )?;
        let results = stmt
            .query_map(params![session_id], |r| {
                Ok(ResultRec {
                    rider: r.get(0)?,
                    position: r.get(1)?,
                    lap_time: r.get(2)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(results)
    }

    // ── Counts for `stats` ────────────────────────────────────────────────────

    pub fn season_count(&self) -> Result<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM seasons", [], |r| r.get(0))?)
    }

    pub fn event_count(&self) -> Result<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?)
    }

    pub fn session_count(&self) -> Result<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?)
    }

    pub fn result_count(&self) -> Result<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM results", [], |r| r.get(0))?)
    }

    pub fn rider_count(&self) -> Result<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM riders", [], |r| r.get(0))?)
    }
}
