//! Navigation-cache singleton.
//!
//! The read side renders its menus from one cached JSON tree instead of
//! walking the relational data per request. Ingestion only flips a dirty
//! flag; the rebuild is an explicit separate step.

use anyhow::{Context, Result};
use duckdb::params;
use tracing::info;

use crate::models::MenuTree;

use super::Repository;

impl Repository {
    pub(crate) fn mark_menu_dirty(&self) -> Result<()> {
        self.conn
            .execute("UPDATE menu_options SET dirty = true WHERE id = 1", [])?;
        Ok(())
    }

    pub fn menu_is_dirty(&self) -> Result<bool> {
        self.conn
            .query_row("SELECT dirty FROM menu_options WHERE id = 1", [], |r| r.get(0))
            .context("menu row missing — run migrations")
    }

    pub fn menu_json(&self) -> Result<String> {
        self.conn
            .query_row("SELECT menu_json FROM menu_options WHERE id = 1", [], |r| r.get(0))
            .context("menu row missing — run migrations")
    }

    /// Rebuild the cache if ingestion marked it stale. Returns whether a
    /// rebuild happened.
    pub fn rebuild_menu_if_dirty(&self) -> Result<bool> {
        if !self.menu_is_dirty()? {
            return Ok(false);
        }
        self.rebuild_menu()?;
        Ok(true)
    }

    /// Recompute the whole navigation tree from the relational data and
    /// store it, clearing the dirty flag.
    pub fn rebuild_menu(&self) -> Result<()> {
        let tree = self.build_menu_tree()?;
        let json = serde_json::to_string(&tree)?;
        self.conn.execute(
            "UPDATE menu_options SET menu_json = ?, dirty = false WHERE id = 1",
            params![json],
        )?;
        info!(
            "Menu rebuilt: {} seasons, {} locations",
            tree.season_data.len(),
            tree.event_data.len()
        );
        Ok(())
    }

    fn build_menu_tree(&self) -> Result<MenuTree> {
        let mut tree = MenuTree::default();

        // Seasons and locations appear even before any event links them.
        let mut stmt = self.conn.prepare("SELECT year FROM seasons")?;
        for year in stmt.query_map([], |r| r.get::<_, i32>(0))?.flatten() {
            tree.season_data.entry(year.to_string()).or_default();
        }
        let mut stmt = self.conn.prepare("SELECT location FROM event_locations")?;
        for loc in stmt.query_map([], |r| r.get::<_, String>(0))?.flatten() {
            tree.event_data.entry(loc).or_default();
        }

        let mut stmt = self.conn.prepare(
            "SELECT s.year, l.location, c.class_name
             FROM events e
             JOIN seasons s ON s.id = e.season_id
             JOIN event_locations l ON l.id = e.location_id
             JOIN event_categories ec ON ec.event_id = e.id
             JOIN categories c ON c.id = ec.category_id",
        )?;
        let triples = stmt.query_map([], |r| {
            Ok((r.get::<_, i32>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
        })?;

        for triple in triples.flatten() {
            let (year, location, category) = triple;
            let year = year.to_string();
            tree.season_data
                .entry(year.clone())
                .or_default()
                .entry(location.clone())
                .or_default()
                .insert(category.clone(), true);
            tree.event_data
                .entry(location)
                .or_default()
                .entry(year)
                .or_default()
                .insert(category, true);
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{MenuTree, RawResultsTable};
    use crate::storage::Repository;

    fn table() -> RawResultsTable {
        RawResultsTable {
            source_url: "url".into(),
            rows: vec![vec![
                "1".into(),
                "25".into(),
                "7".into(),
                "Dummy RIDERONE".into(),
                "ITA".into(),
                "Test Team".into(),
                "TestBike".into(),
                "340.1".into(),
                "1'32.001".into(),
            ]],
            ..Default::default()
        }
    }

    #[test]
    fn ingestion_marks_dirty_and_rebuild_clears_it() {
        let repo = Repository::open_in_memory().unwrap();
        repo.run_migrations().unwrap();
        assert!(!repo.menu_is_dirty().unwrap());

        repo.ingest_session(1999, "TST", "500cc", "RAC", &table()).unwrap();
        assert!(repo.menu_is_dirty().unwrap());

        assert!(repo.rebuild_menu_if_dirty().unwrap());
        assert!(!repo.menu_is_dirty().unwrap());
        // Second call is a no-op.
        assert!(!repo.rebuild_menu_if_dirty().unwrap());
    }

    #[test]
    fn rebuilt_tree_covers_both_orientations() {
        let repo = Repository::open_in_memory().unwrap();
        repo.run_migrations().unwrap();
        repo.ingest_session(1999, "TST", "500cc", "RAC", &table()).unwrap();
        repo.ingest_session(1999, "TST", "250cc", "RAC", &table()).unwrap();
        repo.ingest_session(2000, "TST", "500cc", "RAC", &table()).unwrap();
        repo.rebuild_menu().unwrap();

        let tree: MenuTree = serde_json::from_str(&repo.menu_json().unwrap()).unwrap();

        let by_season = &tree.season_data["1999"]["TST"];
        assert!(by_season["500cc"] && by_season["250cc"]);

        let by_event = &tree.event_data["TST"];
        assert_eq!(by_event.keys().collect::<Vec<_>>(), vec!["1999", "2000"]);
        assert!(by_event["2000"]["500cc"]);
    }
}
