use crate::error::ParseFailure;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use url::Url;

// ── Page locator ──────────────────────────────────────────────────────────────

/// One game's box-score page.
///
/// The last path segment encodes the game: `YYYYMMDD` + a digit + the home
/// team code, e.g. `.../boxscores/202310240DEN.html`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocator {
    raw: String,
    date: NaiveDate,
    home: String,
}

impl PageLocator {
    pub fn parse(raw: &str) -> Result<Self, ParseFailure> {
        let raw = raw.trim();
        let fail = |reason: &str| ParseFailure::Locator {
            locator: raw.to_string(),
            reason: reason.to_string(),
        };

        let segment = match Url::parse(raw) {
            Ok(url) => url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string),
            Err(_) => raw.rsplit('/').find(|s| !s.is_empty()).map(str::to_string),
        }
        .ok_or_else(|| fail("no path segment"))?;

        let stem = segment.split('.').next().unwrap_or_default();
        if !stem.is_ascii() || stem.len() < 11 {
            return Err(fail("segment too short to hold date and home team"));
        }

        let date = NaiveDate::parse_from_str(&stem[..8], "%Y%m%d")
            .map_err(|e| fail(&format!("bad date prefix: {e}")))?;

        let home = &stem[stem.len() - 3..];
        if !home.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(fail("home team code is not alphanumeric"));
        }

        Ok(Self {
            raw: raw.to_string(),
            date,
            home: home.to_uppercase(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    /// `YYYYMMDD`
    pub fn date_compact(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }
}

impl fmt::Display for PageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ── Periods ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Q1,
    Q2,
    Q3,
    Q4,
    H1,
    H2,
}

impl Period {
    pub const ALL: [Period; 6] = [
        Period::Q1,
        Period::Q2,
        Period::Q3,
        Period::Q4,
        Period::H1,
        Period::H2,
    ];

    /// Infix used in the site's table ids (`box-BOS-q1-basic`).
    pub fn table_code(self) -> &'static str {
        match self {
            Period::Q1 => "q1",
            Period::Q2 => "q2",
            Period::Q3 => "q3",
            Period::Q4 => "q4",
            Period::H1 => "h1",
            Period::H2 => "h2",
        }
    }

    /// Output column name.
    pub fn column(self) -> &'static str {
        match self {
            Period::Q1 => "PTS_Q1",
            Period::Q2 => "PTS_Q2",
            Period::Q3 => "PTS_Q3",
            Period::Q4 => "PTS_Q4",
            Period::H1 => "PTS_H1",
            Period::H2 => "PTS_H2",
        }
    }
}

// ── Team locator ──────────────────────────────────────────────────────────────

/// Table ids for one team on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamLocator {
    pub team: String,
    pub game_table: String,
    pub period_tables: Vec<(Period, String)>,
}

impl TeamLocator {
    pub fn new(team: &str) -> Self {
        Self {
            team: team.to_string(),
            game_table: format!("box-{team}-game-basic"),
            period_tables: Period::ALL
                .iter()
                .map(|p| (*p, format!("box-{team}-{}-basic", p.table_code())))
                .collect(),
        }
    }
}

// ── Players ───────────────────────────────────────────────────────────────────

/// Team-qualified player identity. Two fields, so `("A_B", "C")` and
/// `("A", "B_C")` stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerKey {
    pub team: String,
    pub player: String,
}

impl PlayerKey {
    pub fn new(team: &str, player: &str) -> Self {
        Self {
            team: team.to_string(),
            player: player.to_string(),
        }
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.team, self.player)
    }
}

/// One player's full-game line.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRow {
    pub team: String,
    pub name: String,
    pub minutes: String,
    /// Remaining columns in header order; `None` for blank cells.
    pub stats: Vec<(String, Option<f64>)>,
}

impl PlayerRow {
    pub fn key(&self) -> PlayerKey {
        PlayerKey::new(&self.team, &self.name)
    }

    pub fn stat(&self, label: &str) -> Option<f64> {
        self.stats
            .iter()
            .find(|(l, _)| l == label)
            .and_then(|(_, v)| *v)
    }
}

/// Points scored in one period, keyed by team-qualified player.
#[derive(Debug, Clone)]
pub struct PeriodPoints {
    period: Period,
    points: HashMap<PlayerKey, u32>,
}

impl PeriodPoints {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            points: HashMap::new(),
        }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Returns false (and keeps the existing value) if the key is taken.
    pub fn insert(&mut self, key: PlayerKey, points: u32) -> bool {
        if self.points.contains_key(&key) {
            return false;
        }
        self.points.insert(key, points);
        true
    }

    /// Zero when the player has no entry for this period.
    pub fn get(&self, key: &PlayerKey) -> u32 {
        self.points.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ── Enriched rows ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodBreakdown {
    pub q1: u32,
    pub q2: u32,
    pub q3: u32,
    pub q4: u32,
    pub h1: u32,
    pub h2: u32,
}

impl PeriodBreakdown {
    pub fn get(&self, period: Period) -> u32 {
        match period {
            Period::Q1 => self.q1,
            Period::Q2 => self.q2,
            Period::Q3 => self.q3,
            Period::Q4 => self.q4,
            Period::H1 => self.h1,
            Period::H2 => self.h2,
        }
    }

    pub fn set(&mut self, period: Period, points: u32) {
        match period {
            Period::Q1 => self.q1 = points,
            Period::Q2 => self.q2 = points,
            Period::Q3 => self.q3 = points,
            Period::Q4 => self.q4 = points,
            Period::H1 => self.h1 = points,
            Period::H2 => self.h2 = points,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub row: PlayerRow,
    pub periods: PeriodBreakdown,
}

// ── Game record ───────────────────────────────────────────────────────────────

/// A typed output cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(Option<f64>),
    Points(u32),
}

impl Cell {
    /// Text form used by the CSV writer. Whole numbers print without a fraction.
    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(None) => String::new(),
            Cell::Number(Some(v)) if v.fract() == 0.0 => format!("{}", *v as i64),
            Cell::Number(Some(v)) => v.to_string(),
            Cell::Points(p) => p.to_string(),
        }
    }
}

pub const TEAM_COLUMN: &str = "Team";
pub const PLAYER_COLUMN: &str = "Player";
pub const MINUTES_COLUMN: &str = "MP";

/// Both teams' enriched rows for one game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub game_id: String,
    pub date: NaiveDate,
    pub away: String,
    pub home: String,
    /// Union of stat labels across both teams, first-seen order.
    pub stat_columns: Vec<String>,
    pub rows: Vec<EnrichedRow>,
}

impl GameRecord {
    /// `YYYY-MM-DD`
    pub fn date_iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn columns(&self) -> Vec<String> {
        let mut cols = vec![
            "game_id".to_string(),
            "date".to_string(),
            TEAM_COLUMN.to_string(),
            PLAYER_COLUMN.to_string(),
            MINUTES_COLUMN.to_string(),
        ];
        cols.extend(self.stat_columns.iter().cloned());
        cols.extend(Period::ALL.iter().map(|p| p.column().to_string()));
        cols
    }

    /// Cells for one row, aligned with `columns()`.
    pub fn cells(&self, row: &EnrichedRow) -> Vec<Cell> {
        let mut cells = vec![
            Cell::Text(self.game_id.clone()),
            Cell::Text(self.date_iso()),
            Cell::Text(row.row.team.clone()),
            Cell::Text(row.row.name.clone()),
            Cell::Text(row.row.minutes.clone()),
        ];
        cells.extend(self.stat_columns.iter().map(|c| Cell::Number(row.row.stat(c))));
        cells.extend(Period::ALL.iter().map(|p| Cell::Points(row.periods.get(*p))));
        cells
    }

    #[cfg(test)]
    pub fn find(&self, key: &PlayerKey) -> Option<&EnrichedRow> {
        self.rows.iter().find(|r| r.row.key() == *key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_locator_from_url() {
        let loc =
            PageLocator::parse("https://www.basketball-reference.com/boxscores/202310240DEN.html")
                .unwrap();
        assert_eq!(loc.date(), NaiveDate::from_ymd_opt(2023, 10, 24).unwrap());
        assert_eq!(loc.home(), "DEN");
        assert_eq!(loc.date_compact(), "20231024");
    }

    #[test]
    fn test_page_locator_from_bare_path() {
        let loc = PageLocator::parse("boxscores/202401150BBB.html").unwrap();
        assert_eq!(loc.home(), "BBB");
        assert_eq!(loc.date_compact(), "20240115");
    }

    #[test]
    fn test_page_locator_rejects_garbage() {
        assert!(PageLocator::parse("https://example.com/").is_err());
        assert!(PageLocator::parse("game-001").is_err());
        assert!(PageLocator::parse("https://example.com/boxscores/2023XX240DEN.html").is_err());
    }

    #[test]
    fn test_team_locator_ids() {
        let t = TeamLocator::new("BOS");
        assert_eq!(t.game_table, "box-BOS-game-basic");
        let ids: Vec<&str> = t.period_tables.iter().map(|(_, id)| id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "box-BOS-q1-basic",
                "box-BOS-q2-basic",
                "box-BOS-q3-basic",
                "box-BOS-q4-basic",
                "box-BOS-h1-basic",
                "box-BOS-h2-basic",
            ]
        );
    }

    #[test]
    fn test_player_keys_do_not_collide() {
        let a = PlayerKey::new("A_B", "C");
        let b = PlayerKey::new("A", "B_C");
        assert_ne!(a, b);

        let mut pts = PeriodPoints::new(Period::Q1);
        assert!(pts.insert(a.clone(), 4));
        assert!(pts.insert(b.clone(), 7));
        assert!(!pts.insert(a.clone(), 99));
        assert_eq!(pts.get(&a), 4);
        assert_eq!(pts.get(&b), 7);
        assert_eq!(pts.get(&PlayerKey::new("A", "Nobody")), 0);
    }

    #[test]
    fn test_cell_render() {
        assert_eq!(Cell::Number(Some(12.0)).render(), "12");
        assert_eq!(Cell::Number(Some(0.5)).render(), "0.5");
        assert_eq!(Cell::Number(None).render(), "");
        assert_eq!(Cell::Points(18).render(), "18");
    }
}
