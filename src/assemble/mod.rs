use crate::error::ParseFailure;
use crate::models::{EnrichedRow, GameRecord, PageLocator, TeamLocator};
use crate::teams;
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// Outcome of assembling one page.
#[derive(Debug)]
pub enum Assembly {
    Game(GameRecord),
    NoData(NoDataReason),
}

/// Why a well-formed page produced nothing to persist.
#[derive(Debug, Clone, PartialEq)]
pub enum NoDataReason {
    NoTeams,
    TeamCount(usize),
    NoRows,
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoDataReason::NoTeams => f.write_str("no line score"),
            NoDataReason::TeamCount(n) => {
                write!(f, "{}", ParseFailure::TeamCount(*n))
            }
            NoDataReason::NoRows => f.write_str("no player rows"),
        }
    }
}

/// Merge both teams' rows into one record keyed by the page's date and home
/// team. The away team is whichever listed team is not home.
pub fn assemble(
    locator: &PageLocator,
    teams: Vec<(TeamLocator, Vec<EnrichedRow>)>,
) -> Result<Assembly, ParseFailure> {
    if teams.len() != 2 {
        warn!("{}: {} teams on page", locator, teams.len());
        return Ok(Assembly::NoData(NoDataReason::TeamCount(teams.len())));
    }

    let home = locator.home().to_string();
    let codes: Vec<String> = teams.iter().map(|(t, _)| t.team.clone()).collect();
    let away = match codes.iter().find(|c| **c != home) {
        Some(away) if codes.contains(&home) => away.clone(),
        _ => {
            return Err(ParseFailure::HomeTeamMismatch {
                home,
                teams: codes,
            });
        }
    };

    for code in &codes {
        if teams::franchise(code).is_none() {
            warn!("{}: unrecognised team code {}", locator, code);
        }
    }

    let mut stat_columns: Vec<String> = Vec::new();
    let mut rows = Vec::new();
    let mut keys = HashSet::new();

    for (_, team_rows) in teams {
        for row in team_rows {
            if !keys.insert(row.row.key()) {
                warn!("{}: duplicate player {}, keeping the first", locator, row.row.key());
                continue;
            }
            for (label, _) in &row.row.stats {
                if !stat_columns.contains(label) {
                    stat_columns.push(label.clone());
                }
            }
            rows.push(row);
        }
    }

    if rows.is_empty() {
        return Ok(Assembly::NoData(NoDataReason::NoRows));
    }

    Ok(Assembly::Game(GameRecord {
        game_id: format!("{}_{}_{}", away, home, locator.date_compact()),
        date: locator.date(),
        away,
        home,
        stat_columns,
        rows,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PeriodBreakdown, PlayerKey, PlayerRow};

    fn row(team: &str, name: &str, stats: &[(&str, f64)]) -> EnrichedRow {
        EnrichedRow {
            row: PlayerRow {
                team: team.to_string(),
                name: name.to_string(),
                minutes: "20:00".to_string(),
                stats: stats.iter().map(|(l, v)| (l.to_string(), Some(*v))).collect(),
            },
            periods: PeriodBreakdown::default(),
        }
    }

    fn locator() -> PageLocator {
        PageLocator::parse("https://www.basketball-reference.com/boxscores/202310240DEN.html").unwrap()
    }

    #[test]
    fn test_assemble_game_identity() {
        let teams = vec![
            (TeamLocator::new("LAL"), vec![row("LAL", "A", &[("PTS", 10.0)])]),
            (TeamLocator::new("DEN"), vec![row("DEN", "B", &[("PTS", 12.0), ("+/-", 3.0)])]),
        ];
        let Assembly::Game(game) = assemble(&locator(), teams).unwrap() else {
            panic!("expected a game");
        };
        assert_eq!(game.game_id, "LAL_DEN_20231024");
        assert_eq!(game.date_iso(), "2023-10-24");
        assert_eq!(game.away, "LAL");
        assert_eq!(game.stat_columns, vec!["PTS", "+/-"]);
        assert_eq!(&game.columns()[..2], &["game_id".to_string(), "date".to_string()]);
        assert_eq!(game.rows.len(), 2);
    }

    #[test]
    fn test_same_name_on_both_teams_is_two_players() {
        let teams = vec![
            (TeamLocator::new("LAL"), vec![row("LAL", "Smith", &[])]),
            (TeamLocator::new("DEN"), vec![row("DEN", "Smith", &[])]),
        ];
        let Assembly::Game(game) = assemble(&locator(), teams).unwrap() else {
            panic!("expected a game");
        };
        assert_eq!(game.rows.len(), 2);
        assert!(game.find(&PlayerKey::new("LAL", "Smith")).is_some());
        assert!(game.find(&PlayerKey::new("DEN", "Smith")).is_some());
    }

    #[test]
    fn test_empty_rows_is_no_data() {
        let teams = vec![(TeamLocator::new("LAL"), vec![]), (TeamLocator::new("DEN"), vec![])];
        assert!(matches!(
            assemble(&locator(), teams),
            Ok(Assembly::NoData(NoDataReason::NoRows))
        ));
    }

    #[test]
    fn test_wrong_team_count_is_no_data() {
        let teams = vec![(TeamLocator::new("DEN"), vec![row("DEN", "B", &[])])];
        assert!(matches!(
            assemble(&locator(), teams),
            Ok(Assembly::NoData(NoDataReason::TeamCount(1)))
        ));
    }

    #[test]
    fn test_home_not_listed_is_parse_failure() {
        let teams = vec![
            (TeamLocator::new("LAL"), vec![row("LAL", "A", &[])]),
            (TeamLocator::new("BOS"), vec![row("BOS", "B", &[])]),
        ];
        assert!(matches!(
            assemble(&locator(), teams),
            Err(ParseFailure::HomeTeamMismatch { .. })
        ));
    }
}
