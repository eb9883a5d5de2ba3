use crate::error::ParseFailure;
use crate::models::TeamLocator;
use crate::scraper::document::{Document, TableLookup};
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};

const LINE_SCORE_ID: &str = "line_score";
const LINE_SCORE_MARKER: &str = r#"id="line_score""#;

static HEADER_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("thead tr").unwrap_or_else(|_| unreachable!()));
static BODY_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody tr").unwrap_or_else(|_| unreachable!()));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").unwrap_or_else(|_| unreachable!()));

// ── Generic stats table ───────────────────────────────────────────────────────

/// A table as text: the innermost header row plus body rows.
///
/// Stats tables carry two header rows; the outer one only groups columns
/// ("Basic Box Score Stats") and is dropped. `tfoot` is never read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn parse_stat_table(table: ElementRef<'_>, id: &str) -> Result<RawTable, ParseFailure> {
    let headers: Vec<String> = table
        .select(&HEADER_ROW)
        .last()
        .map(|tr| tr.select(&CELL).map(cell_text).collect())
        .unwrap_or_default();

    if headers.is_empty() {
        return Err(ParseFailure::MissingHeader(id.to_string()));
    }

    let rows: Vec<Vec<String>> = table
        .select(&BODY_ROW)
        .map(|tr| tr.select(&CELL).map(cell_text).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect();

    debug!("{}: {} columns, {} rows", id, headers.len(), rows.len());
    Ok(RawTable { headers, rows })
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

// ── Line score → teams ────────────────────────────────────────────────────────

/// Team abbreviations from the line score, in page order (away first).
pub fn parse_line_score(doc: &Document) -> Result<Vec<String>, ParseFailure> {
    let raw = match doc.find_in_comments(LINE_SCORE_MARKER) {
        Some(fragment) => match fragment.table(LINE_SCORE_ID) {
            TableLookup::Found(table) => parse_stat_table(table, LINE_SCORE_ID)?,
            TableLookup::NotFound => return Err(ParseFailure::MissingLineScore),
        },
        // Occasionally served uncommented.
        None => match doc.table(LINE_SCORE_ID) {
            TableLookup::Found(table) => parse_stat_table(table, LINE_SCORE_ID)?,
            TableLookup::NotFound => return Err(ParseFailure::MissingLineScore),
        },
    };

    Ok(raw
        .rows
        .iter()
        .filter_map(|row| row.first())
        .filter(|team| !team.is_empty())
        .cloned()
        .collect())
}

/// Teams on the page with their table ids. Empty when the line score is
/// missing or unreadable, which callers treat as "no data".
pub fn locate_teams(doc: &Document) -> Vec<TeamLocator> {
    match parse_line_score(doc) {
        Ok(teams) => teams.iter().map(|t| TeamLocator::new(t)).collect(),
        Err(e) => {
            warn!("Error extracting teams: {}", e);
            Vec::new()
        }
    }
}
