//! Result history reconstruction: multi-year series per track, and
//! per-session series across one race weekend.

use anyhow::Result;
use std::collections::{HashMap, HashSet};

use crate::models::{ChartSeries, EventRec};
use crate::storage::Repository;

use super::{fold_category_label, session_order_for};

// ── Event history (per physical location) ─────────────────────────────────────

/// One charted year at a location: the year label and the point-session
/// classification.
#[derive(Debug, Clone)]
pub struct HistoryRound {
    pub label: String,
    pub results: Vec<(String, i64)>,
}

/// Assemble per-rider position series from rounds given newest-first.
///
/// The output runs oldest → newest; riders missing a year are left-padded
/// with `None` so every series spans the same columns. Rounds with no
/// results contribute nothing.
pub fn event_history_series(title: String, rounds_newest_first: &[HistoryRound]) -> ChartSeries {
    let mut columns_rev: Vec<String> = Vec::new();
    let mut order: Vec<String> = Vec::new();
    let mut map: HashMap<String, Vec<Option<i64>>> = HashMap::new();

    for round in rounds_newest_first {
        if round.results.is_empty() {
            continue;
        }
        let completed = columns_rev.len();
        columns_rev.push(round.label.clone());

        for (rider, position) in &round.results {
            let series = map.entry(rider.clone()).or_insert_with(|| {
                order.push(rider.clone());
                vec![None; completed]
            });
            if series.len() == completed {
                series.push(Some(*position));
            }
        }
        for rider in &order {
            let series = map.get_mut(rider).expect("rider in order is in map");
            if series.len() <= completed {
                series.push(None);
            }
        }
    }

    columns_rev.reverse();
    let series = order
        .into_iter()
        .map(|rider| {
            let mut values = map.remove(&rider).unwrap_or_default();
            values.reverse();
            (rider, values)
        })
        .collect();

    ChartSeries { title, columns: columns_rev, series }
}

/// Build the cross-year history at this event's location, one series set
/// per (lineage-folded) category, covering `history_seasons` years before
/// the event's season plus the season itself.
pub fn event_history(
    repo: &Repository,
    event: &EventRec,
    year: i32,
    history_seasons: i32,
) -> Result<Vec<(String, ChartSeries)>> {
    let Some(location_id) = repo.location_id(&event.location)? else {
        return Ok(Vec::new());
    };

    let mut modern_seen: HashSet<String> = HashSet::new();
    let mut order: Vec<String> = Vec::new();
    let mut rounds: HashMap<String, Vec<HistoryRound>> = HashMap::new();

    for y in ((year - history_seasons)..=year).rev() {
        let Some(season) = repo.season_by_year(y)? else { continue };
        let Some(ev) = repo.event_at(season.id, location_id)? else { continue };

        for category in repo.categories_for_season(season.id)? {
            let Some(session) = repo.point_session(ev.id, category.id)? else {
                continue;
            };
            let results: Vec<(String, i64)> = repo
                .results_for_session(session.id)?
                .into_iter()
                .map(|r| (r.rider, r.position))
                .collect();
            if results.is_empty() {
                continue;
            }
            let label = fold_category_label(&category.name, &mut modern_seen);
            if !rounds.contains_key(&label) {
                order.push(label.clone());
            }
            rounds
                .entry(label)
                .or_default()
                .push(HistoryRound { label: y.to_string(), results });
        }
    }

    let mut out = Vec::new();
    for label in order {
        let category_rounds = rounds.remove(&label).unwrap_or_default();
        let title = format!("{} {} Results History", event.location, label);
        out.push((label.clone(), event_history_series(title, &category_rounds)));
    }
    Ok(out)
}

// ── Session history (per race weekend) ────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub rider: String,
    pub position: i64,
    pub lap_time: String,
}

#[derive(Debug, Clone)]
pub struct SessionColumn {
    pub session_type: String,
    pub results: Vec<SessionRow>,
}

/// Sessions whose lap times seed the Q1 re-ranking.
const PRACTICE_SESSIONS: &[&str] = &["FP1", "FP2", "FP3"];

/// Assemble a race weekend's per-session positions, one column per session
/// in running order.
///
/// Cross-session rules:
/// - FP1–FP3 lap times are tracked as a per-rider running best (the
///   formatted strings compare well enough within one weekend).
/// - Q1 raw positions are pushed down by `q2_seeded_slots`; the fastest
///   practice runners take positions 1..N instead, ranked purely by best
///   lap, ties broken by rider label.
/// - Q2 absentees inherit their previous column.
/// - Race absentees are appended at the bottom in series order.
///
/// Output is ordered by final-column position ascending; riders with no
/// final position are dropped.
pub fn session_history_series(
    title: String,
    sessions: &[SessionColumn],
    q2_seeded_slots: usize,
) -> ChartSeries {
    let mut columns: Vec<String> = Vec::new();
    let mut order: Vec<String> = Vec::new();
    let mut map: HashMap<String, Vec<Option<i64>>> = HashMap::new();
    let mut best_times: HashMap<String, String> = HashMap::new();

    for session in sessions {
        let completed = columns.len();
        columns.push(session.session_type.clone());
        for rider in &order {
            map.get_mut(rider).expect("rider in order is in map").push(None);
        }

        let is_practice = PRACTICE_SESSIONS.contains(&session.session_type.as_str());
        let mut last_position: i64 = -100;

        for row in &session.results {
            let series = map.entry(row.rider.clone()).or_insert_with(|| {
                order.push(row.rider.clone());
                vec![None; completed + 1]
            });

            if is_practice && !row.lap_time.is_empty() {
                best_times
                    .entry(row.rider.clone())
                    .and_modify(|t| {
                        if row.lap_time < *t {
                            *t = row.lap_time.clone();
                        }
                    })
                    .or_insert_with(|| row.lap_time.clone());
            }

            let mut position = row.position;
            if session.session_type == "Q1" {
                position += q2_seeded_slots as i64;
            }
            let last = series.len() - 1;
            series[last] = Some(position);
            last_position = last_position.max(position);
        }

        match session.session_type.as_str() {
            "Q1" => {
                let mut fastest: Vec<(&String, &String)> =
                    best_times.iter().map(|(rider, time)| (time, rider)).collect();
                fastest.sort();
                for (i, (_, rider)) in fastest.iter().take(q2_seeded_slots).enumerate() {
                    if let Some(series) = map.get_mut(*rider) {
                        let last = series.len() - 1;
                        series[last] = Some(i as i64 + 1);
                    }
                }
            }
            "Q2" => {
                for rider in &order {
                    let series = map.get_mut(rider).expect("rider in order is in map");
                    let last = series.len() - 1;
                    if series[last].is_none() && last >= 1 {
                        series[last] = series[last - 1];
                    }
                }
            }
            "RAC" => {
                for rider in &order {
                    let series = map.get_mut(rider).expect("rider in order is in map");
                    let last = series.len() - 1;
                    if series[last].is_none() {
                        last_position += 1;
                        series[last] = Some(last_position);
                    }
                }
            }
            _ => {}
        }
    }

    let mut series: Vec<(String, Vec<Option<i64>>)> = order
        .into_iter()
        .filter_map(|rider| {
            let values = map.remove(&rider).unwrap_or_default();
            values.last().copied().flatten().map(|_| (rider, values))
        })
        .collect();
    series.sort_by_key(|(_, values)| values.last().copied().flatten());

    ChartSeries { title, columns, series }
}

/// Build the per-session series for every category run at this event,
/// walking the era's session order.
pub fn session_history(
    repo: &Repository,
    event: &EventRec,
    year: i32,
    q2_seeded_slots: usize,
) -> Result<Vec<(String, ChartSeries)>> {
    let mut out = Vec::new();

    for category in repo.categories_for_event(event.id)? {
        let mut sessions = Vec::new();
        for code in session_order_for(year) {
            let Some(session) = repo.session_of(event.id, category.id, code)? else {
                continue;
            };
            let results = repo
                .results_for_session(session.id)?
                .into_iter()
                .map(|r| SessionRow { rider: r.rider, position: r.position, lap_time: r.lap_time })
                .collect();
            sessions.push(SessionColumn { session_type: session.session_type, results });
        }
        if sessions.is_empty() {
            continue;
        }

        let title = format!("{} {} {} Results", event.location, year, category.name);
        out.push((
            category.name.clone(),
            session_history_series(title, &sessions, q2_seeded_slots),
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(label: &str, results: &[(&str, i64)]) -> HistoryRound {
        HistoryRound {
            label: label.into(),
            results: results.iter().map(|(r, p)| (r.to_string(), *p)).collect(),
        }
    }

    fn column(session_type: &str, results: &[(&str, i64, &str)]) -> SessionColumn {
        SessionColumn {
            session_type: session_type.into(),
            results: results
                .iter()
                .map(|(r, p, t)| SessionRow {
                    rider: r.to_string(),
                    position: *p,
                    lap_time: t.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn event_history_left_pads_and_runs_oldest_first() {
        // Input is newest-first: 2002, 2001, 2000.
        let rounds = vec![
            round("2002", &[("A", 1), ("N", 2)]),
            round("2001", &[("A", 2)]),
            round("2000", &[("A", 3), ("O", 1)]),
        ];
        let chart = event_history_series("t".into(), &rounds);

        assert_eq!(chart.columns, vec!["2000", "2001", "2002"]);
        let a = chart.series.iter().find(|(r, _)| r == "A").unwrap();
        assert_eq!(a.1, vec![Some(3), Some(2), Some(1)]);
        // N only raced the newest year: left-padded.
        let n = chart.series.iter().find(|(r, _)| r == "N").unwrap();
        assert_eq!(n.1, vec![None, None, Some(2)]);
        // O only raced the oldest year.
        let o = chart.series.iter().find(|(r, _)| r == "O").unwrap();
        assert_eq!(o.1, vec![Some(1), None, None]);
    }

    #[test]
    fn event_history_skips_empty_rounds() {
        let rounds = vec![
            round("2002", &[("A", 1)]),
            round("2001", &[]),
            round("2000", &[("A", 2)]),
        ];
        let chart = event_history_series("t".into(), &rounds);
        assert_eq!(chart.columns, vec!["2000", "2002"]);
        assert_eq!(chart.series[0].1.len(), 2);
    }

    #[test]
    fn q1_reseeds_fastest_practice_runners() {
        // Practice best laps order X < Y < Z; Q1 admits the top 2 by time.
        let sessions = vec![
            column("FP1", &[("Z", 1, "1'33.000"), ("X", 2, "1'31.500"), ("Y", 3, "1'32.000")]),
            column("Q1", &[("Z", 1, ""), ("X", 2, ""), ("Y", 3, "")]),
        ];
        let chart = session_history_series("t".into(), &sessions, 2);

        let get = |r: &str| {
            chart
                .series
                .iter()
                .find(|(rider, _)| rider == r)
                .unwrap()
                .1
                .clone()
        };
        // X and Y take 1 and 2 regardless of Q1 row order; Z keeps its raw
        // position offset by the guaranteed-slot count.
        assert_eq!(get("X")[1], Some(1));
        assert_eq!(get("Y")[1], Some(2));
        assert_eq!(get("Z")[1], Some(1 + 2));
    }

    #[test]
    fn practice_best_is_a_running_minimum() {
        let sessions = vec![
            column("FP1", &[("X", 1, "1'33.000"), ("Y", 2, "1'31.000")]),
            column("FP2", &[("X", 1, "1'30.000"), ("Y", 2, "1'32.000")]),
            column("Q1", &[]),
        ];
        // X improves to 1'30.0 in FP2 and out-seeds Y's 1'31.0.
        let chart = session_history_series("t".into(), &sessions, 2);
        let x = chart.series.iter().find(|(r, _)| r == "X").unwrap();
        let y = chart.series.iter().find(|(r, _)| r == "Y").unwrap();
        assert_eq!(x.1[2], Some(1));
        assert_eq!(y.1[2], Some(2));
    }

    #[test]
    fn q2_absentees_inherit_previous_column() {
        let sessions = vec![
            column("Q1", &[("A", 1, ""), ("B", 2, "")]),
            column("Q2", &[("A", 1, "")]),
        ];
        let chart = session_history_series("t".into(), &sessions, 10);
        let b = chart.series.iter().find(|(r, _)| r == "B").unwrap();
        // B sat out Q2 and keeps its Q1 value (raw 2 + 10 slots).
        assert_eq!(b.1, vec![Some(12), Some(12)]);
    }

    #[test]
    fn race_absentees_fill_the_bottom_in_series_order() {
        let sessions = vec![
            column("WUP", &[("A", 1, ""), ("B", 2, ""), ("C", 3, "")]),
            column("RAC", &[("C", 1, "")]),
        ];
        let chart = session_history_series("t".into(), &sessions, 10);

        let get = |r: &str| {
            chart
                .series
                .iter()
                .find(|(rider, _)| rider == r)
                .unwrap()
                .1
                .last()
                .copied()
                .flatten()
        };
        assert_eq!(get("C"), Some(1));
        assert_eq!(get("A"), Some(2));
        assert_eq!(get("B"), Some(3));
        // Display order follows the final column.
        let names: Vec<&str> = chart.series.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn riders_without_a_final_position_are_dropped() {
        let sessions = vec![
            column("FP1", &[("A", 1, "1'31.000"), ("B", 2, "1'32.000")]),
            column("FP2", &[("A", 1, "1'31.000")]),
        ];
        let chart = session_history_series("t".into(), &sessions, 10);
        let names: Vec<&str> = chart.series.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(names, vec!["A"]);
    }

    #[test]
    fn race_only_era_is_a_single_column() {
        let sessions = vec![column("RAC", &[("A", 1, ""), ("B", 2, "")])];
        let chart = session_history_series("t".into(), &sessions, 10);
        assert_eq!(chart.columns, vec!["RAC"]);
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].1, vec![Some(1)]);
    }
}
