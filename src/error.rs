use thiserror::Error;

/// Substrings that mark a failure reason as a likely anti-scraping block.
/// Matched against reasons only, never against anything carrying the url.
const BLOCK_SIGNATURES: &[&str] = &["forbidden", "blocked", "too many requests", "rate limit"];

// ── Fetch ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchFailure {
    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchFailure::Status { status } => Some(*status),
            FetchFailure::Transport(_) => None,
        }
    }
}

// ── Parse ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseFailure {
    #[error("invalid page locator {locator:?}: {reason}")]
    Locator { locator: String, reason: String },

    #[error("line score table not found")]
    MissingLineScore,

    #[error("table {0} has no header row")]
    MissingHeader(String),

    #[error("expected 2 teams, page lists {0}")]
    TeamCount(usize),

    #[error("home team {home} not among {teams:?}")]
    HomeTeamMismatch { home: String, teams: Vec<String> },
}

// ── Storage ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),
}

// ── Crawl attempt ─────────────────────────────────────────────────────────────

/// Anything that can make a single crawl attempt fail and be retried.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchFailure),

    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

impl CrawlError {
    /// True when the failure looks like the server refusing automated access.
    pub fn is_block_suspected(&self) -> bool {
        let reason = match self {
            CrawlError::Fetch(f) => match f.status() {
                Some(status) => return matches!(status, 403 | 429),
                None => f.to_string().to_lowercase(),
            },
            CrawlError::Parse(ParseFailure::Locator { .. }) => return false,
            CrawlError::Parse(p) => p.to_string().to_lowercase(),
        };
        BLOCK_SIGNATURES.iter().any(|sig| reason.contains(sig))
    }
}
