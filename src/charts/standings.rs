//! Championship standings: cumulative points per category across a
//! season's point sessions.

use anyhow::Result;
use std::collections::HashMap;

use crate::models::{ChartSeries, SeasonRec};
use crate::storage::Repository;

use super::points_for_position;

/// One scored round: the event label and the classified riders in
/// finishing order.
#[derive(Debug, Clone)]
pub struct Round {
    pub label: String,
    pub finishers: Vec<(String, i64)>,
}

/// Accumulate points over rounds into one series per rider.
///
/// Riders absent from a round carry their previous total forward; riders
/// appearing for the first time are backfilled with zeros for all earlier
/// rounds. Output is sorted descending by final total.
pub fn accumulate_standings(title: String, rounds: &[Round]) -> ChartSeries {
    let mut columns = Vec::with_capacity(rounds.len());
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, Vec<i64>> = HashMap::new();

    for (n, round) in rounds.iter().enumerate() {
        columns.push(round.label.clone());

        for series in totals.values_mut() {
            let carried = series.last().copied().unwrap_or(0);
            series.push(carried);
        }

        for (rider, position) in &round.finishers {
            let series = totals.entry(rider.clone()).or_insert_with(|| {
                order.push(rider.clone());
                vec![0; n + 1]
            });
            let previous = if series.len() >= 2 { series[series.len() - 2] } else { 0 };
            let last = series.len() - 1;
            series[last] = previous + points_for_position(*position);
        }
    }

    let mut series: Vec<(String, Vec<Option<i64>>)> = order
        .into_iter()
        .map(|rider| {
            let values = totals.remove(&rider).unwrap_or_default();
            (rider, values.into_iter().map(Some).collect())
        })
        .collect();
    series.sort_by(|a, b| b.1.last().cmp(&a.1.last()));

    ChartSeries { title, columns, series }
}

/// Build the standings series for every category a season contains.
///
/// Events without a point session for the category contribute no column:
/// no data this round is a skip, not an error.
pub fn season_standings(repo: &Repository, season: &SeasonRec) -> Result<Vec<(String, ChartSeries)>> {
    let events = repo.events_for_season(season.id)?;
    let mut out = Vec::new();

    for category in repo.categories_for_season(season.id)? {
        let mut rounds = Vec::new();
        for event in &events {
            let Some(session) = repo.point_session(event.id, category.id)? else {
                continue;
            };
            debug_assert!(session.point_event);
            tracing::debug!(
                "{} {} {}: scoring {} ({})",
                season.year, event.location, category.name,
                session.session_type, session.source_url
            );
            let finishers = repo
                .results_for_session(session.id)?
                .into_iter()
                .map(|r| (r.rider, r.position))
                .collect();
            rounds.push(Round { label: event.location.clone(), finishers });
        }

        let title = format!("{} {} Championship", season.year, category.name);
        out.push((category.name.clone(), accumulate_standings(title, &rounds)));
    }

    Ok(out)
}
