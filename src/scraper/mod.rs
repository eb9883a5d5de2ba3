pub mod cleaner;
pub mod document;
pub mod http_client;
pub mod parsers;

use crate::assemble::{assemble, Assembly, NoDataReason};
use crate::error::{FetchFailure, ParseFailure};
use crate::models::{PageLocator, PeriodPoints, PlayerRow, TeamLocator};
use crate::reconcile::enrich;
use async_trait::async_trait;
use tracing::{debug, info};

use self::cleaner::{period_points, player_rows};
use self::document::{Document, TableLookup};
use self::http_client::HttpClient;
use self::parsers::{locate_teams, parse_stat_table};

// ── Source trait ──────────────────────────────────────────────────────────────

/// Where page bodies come from. The crawl only ever talks to this.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchFailure>;
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchFailure> {
        self.get_text(url).await
    }
}

pub async fn fetch_document(
    source: &dyn PageSource,
    locator: &PageLocator,
) -> Result<Document, FetchFailure> {
    let body = source.fetch_page(locator.as_str()).await?;
    debug!("Fetched {} ({} bytes)", locator, body.len());
    Ok(Document::parse(&body))
}

// ── Extraction ────────────────────────────────────────────────────────────────

/// Full-game rows plus the six period maps for one team.
/// Missing or unreadable tables come back empty.
pub fn extract_team(doc: &Document, team: &TeamLocator) -> (Vec<PlayerRow>, Vec<PeriodPoints>) {
    let rows = match read_table(doc, &team.game_table) {
        Some(raw) => player_rows(&team.team, &raw),
        None => Vec::new(),
    };

    let periods = team
        .period_tables
        .iter()
        .map(|(period, id)| match read_table(doc, id) {
            Some(raw) => period_points(&team.team, *period, &raw),
            None => PeriodPoints::new(*period),
        })
        .collect();

    (rows, periods)
}

fn read_table(doc: &Document, id: &str) -> Option<parsers::RawTable> {
    match doc.table(id) {
        TableLookup::Found(table) => match parse_stat_table(table, id) {
            Ok(raw) => Some(raw),
            Err(e) => {
                debug!("{}: {}", id, e);
                None
            }
        },
        TableLookup::NotFound => {
            debug!("Table not found: {}", id);
            None
        }
    }
}

/// Locate teams, extract and reconcile each, then assemble the game.
pub fn extract_page(doc: &Document, locator: &PageLocator) -> Result<Assembly, ParseFailure> {
    let teams = locate_teams(doc);
    if teams.is_empty() {
        return Ok(Assembly::NoData(NoDataReason::NoTeams));
    }

    let enriched = teams
        .into_iter()
        .map(|team| {
            let (rows, periods) = extract_team(doc, &team);
            info!(
                "{}: {} players, period tables with data: {}",
                team.team,
                rows.len(),
                periods.iter().filter(|p| !p.is_empty()).count()
            );
            let rows = enrich(rows, &periods);
            (team, rows)
        })
        .collect();

    assemble(locator, enriched)
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub(crate) fn box_table(team: &str, id_suffix: &str, players: &[(&str, &str, u32)]) -> String {
        let body: String = players
            .iter()
            .map(|(name, mp, pts)| {
                format!(
                    "<tr><th>{name}</th><td>{mp}</td><td>{}</td><td>{pts}</td></tr>",
                    pts / 2
                )
            })
            .collect();
        format!(
            r#"<table id="box-{team}-{id_suffix}-basic"><thead>
                 <tr class="over_header"><th></th><th colspan="3">Basic Box Score Stats</th></tr>
                 <tr><th>Starters</th><th>MP</th><th>FG</th><th>PTS</th></tr>
               </thead><tbody>{body}
                 <tr class="thead"><th>Reserves</th><td>MP</td><td>FG</td><td>PTS</td></tr>
                 <tr><th>Bench Guy</th><td colspan="3">Did Not Play</td></tr>
               </tbody></table>"#
        )
    }

    pub(crate) fn page(teams: &[&str], tables: &[String]) -> String {
        let rows: String = teams
            .iter()
            .map(|t| format!("<tr><th>{t}</th><td>25</td></tr>"))
            .collect();
        format!(
            r#"<html><body><div id="all_line_score"><!--
                <table id="line_score"><thead><tr><th colspan="2">Scoring</th></tr><tr><th></th><th>1</th></tr></thead>
                <tbody>{rows}</tbody></table>
              --></div>{}</body></html>"#,
            tables.concat()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{box_table, page};
    use super::*;
    use crate::models::{Period, PlayerKey};

    #[test]
    fn test_extract_team_without_period_tables() {
        let html = page(
            &["AAA", "BBB"],
            &[box_table("AAA", "game", &[("X", "30:00", 20)])],
        );
        let doc = Document::parse(&html);
        let (rows, periods) = extract_team(&doc, &TeamLocator::new("AAA"));
        assert_eq!(rows.len(), 1);
        assert_eq!(periods.len(), 6);
        assert!(periods.iter().all(|p| p.is_empty()));
    }

    #[test]
    fn test_extract_team_reads_quarters() {
        let html = page(
            &["AAA", "BBB"],
            &[
                box_table("AAA", "game", &[("X", "30:00", 20)]),
                box_table("AAA", "q3", &[("X", "8:00", 6)]),
            ],
        );
        let doc = Document::parse(&html);
        let (_, periods) = extract_team(&doc, &TeamLocator::new("AAA"));
        let q3 = periods.iter().find(|p| p.period() == Period::Q3).unwrap();
        assert_eq!(q3.get(&PlayerKey::new("AAA", "X")), 6);
    }

    #[test]
    fn test_extract_page_without_line_score_is_no_data() {
        let doc = Document::parse("<html><body></body></html>");
        let locator = PageLocator::parse("https://x.test/boxscores/202401150BBB.html").unwrap();
        assert!(matches!(
            extract_page(&doc, &locator),
            Ok(Assembly::NoData(NoDataReason::NoTeams))
        ));
    }

    #[test]
    fn test_fetch_document_passes_failures_through() {
        struct Refusing;

        #[async_trait]
        impl PageSource for Refusing {
            async fn fetch_page(&self, _url: &str) -> Result<String, FetchFailure> {
                Err(FetchFailure::Status { status: 403 })
            }
        }

        let locator = PageLocator::parse("https://x.test/boxscores/202401150BBB.html").unwrap();
        let result = tokio_test::block_on(fetch_document(&Refusing, &locator));
        assert_eq!(result.err(), Some(FetchFailure::Status { status: 403 }));
    }
}
