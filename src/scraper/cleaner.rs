use crate::models::{Period, PeriodPoints, PlayerRow};
use crate::scraper::parsers::RawTable;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Name-column values that label subtotal rows rather than players.
const AGGREGATE_MARKERS: &[&str] = &["Reserves", "Team Totals"];

/// Minutes-column values meaning the player never took the floor.
const DID_NOT_PLAY_MARKERS: &[&str] = &[
    "Did Not Play",
    "Did Not Dress",
    "Not With Team",
    "Player Suspended",
];

/// Columns not carried into the output.
const DROPPED_COLUMNS: &[&str] = &["ORB", "DRB", "GmSc"];

const MINUTES_LABEL: &str = "MP";
const POINTS_LABEL: &str = "PTS";

// ── Parsers ───────────────────────────────────────────────────────────────────

pub fn is_aggregate_name(name: &str) -> bool {
    AGGREGATE_MARKERS.iter().any(|m| name.contains(m))
}

pub fn is_did_not_play(minutes: &str) -> bool {
    DID_NOT_PLAY_MARKERS.iter().any(|m| minutes.contains(m))
}

/// "12" → 12 | ".455" → 0.455 | "+7" → 7 | "" → None
pub fn parse_stat(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.strip_prefix('+').unwrap_or(s).parse().ok()
}

// ── Table → rows ──────────────────────────────────────────────────────────────

/// Player rows of one team's table. The first column is always the name,
/// whatever the header calls it ("Starters").
pub fn player_rows(team: &str, table: &RawTable) -> Vec<PlayerRow> {
    let minutes_idx = table.headers.iter().position(|h| h == MINUTES_LABEL);
    let stat_columns: Vec<(usize, &String)> = table
        .headers
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(i, h)| Some(*i) != minutes_idx && !DROPPED_COLUMNS.contains(&h.as_str()))
        .collect();

    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for cells in &table.rows {
        let Some(name) = cells.first() else { continue };
        if name.is_empty() || is_aggregate_name(name) {
            continue;
        }

        let minutes = minutes_idx
            .and_then(|i| cells.get(i))
            .cloned()
            .unwrap_or_default();
        if is_did_not_play(&minutes) {
            continue;
        }

        if !seen.insert(name.clone()) {
            warn!("{}: duplicate row for {}, keeping the first", team, name);
            continue;
        }

        rows.push(PlayerRow {
            team: team.to_string(),
            name: name.clone(),
            minutes,
            stats: stat_columns
                .iter()
                .map(|(i, label)| ((*label).clone(), cells.get(*i).and_then(|c| parse_stat(c))))
                .collect(),
        });
    }

    rows
}

/// Points column of a period table.
pub fn period_points(team: &str, period: Period, table: &RawTable) -> PeriodPoints {
    let mut points = PeriodPoints::new(period);
    for row in player_rows(team, table) {
        let pts = row.stat(POINTS_LABEL).unwrap_or(0.0).max(0.0) as u32;
        points.insert(row.key(), pts);
    }
    debug!("{} {:?}: {} players", team, period, points.len());
    points
}

// ── Tests ─────────────────────────────────────────────────────────────────────
