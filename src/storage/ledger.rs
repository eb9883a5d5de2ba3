//! Append-only crawl ledger.
//!
//! One event per line, `{timestamp}: {event}`. Lines are only ever
//! appended; on startup the file is scanned for success lines to rebuild
//! the set of finished locators.

use chrono::Local;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const SUCCESS: &str = "Successfully processed: ";
const BLOCK: &str = "Possible scraping block detected: ";
const FAILED: &str = "Failed after ";
const PAUSE: &str = "Pausing for ";
const PROGRESS: &str = "Progress summary - ";
const RUN_COMPLETE: &str = " (run complete)";

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEntry {
    Success {
        url: String,
    },
    BlockSuspected {
        url: String,
        detail: String,
    },
    Failed {
        url: String,
        attempts: u32,
        detail: String,
    },
    Pause {
        hours: f64,
    },
    Progress {
        processed: usize,
        total: usize,
        failed: usize,
        complete: bool,
    },
}

impl LedgerEntry {
    fn body(&self) -> String {
        match self {
            LedgerEntry::Success { url } => format!("{SUCCESS}{url}"),
            LedgerEntry::BlockSuspected { url, detail } => {
                format!("{BLOCK}{url} - {}", single_line(detail))
            }
            LedgerEntry::Failed {
                url,
                attempts,
                detail,
            } => format!("{FAILED}{attempts} attempts: {url} - {}", single_line(detail)),
            LedgerEntry::Pause { hours } => {
                format!("{PAUSE}{hours} hours due to multiple blocks")
            }
            LedgerEntry::Progress {
                processed,
                total,
                failed,
                complete,
            } => format!(
                "{PROGRESS}{processed}/{total} processed, {failed} failed{}",
                if *complete { RUN_COMPLETE } else { "" }
            ),
        }
    }

    fn parse_body(body: &str) -> Option<Self> {
        if let Some(url) = body.strip_prefix(SUCCESS) {
            return Some(LedgerEntry::Success {
                url: url.trim().to_string(),
            });
        }
        if let Some(rest) = body.strip_prefix(BLOCK) {
            let (url, detail) = rest.split_once(" - ").unwrap_or((rest, ""));
            return Some(LedgerEntry::BlockSuspected {
                url: url.trim().to_string(),
                detail: detail.trim().to_string(),
            });
        }
        if let Some(rest) = body.strip_prefix(FAILED) {
            let (attempts, rest) = rest.split_once(" attempts: ")?;
            let (url, detail) = rest.split_once(" - ").unwrap_or((rest, ""));
            return Some(LedgerEntry::Failed {
                url: url.trim().to_string(),
                attempts: attempts.trim().parse().ok()?,
                detail: detail.trim().to_string(),
            });
        }
        if let Some(rest) = body.strip_prefix(PAUSE) {
            let (hours, _) = rest.split_once(" hours")?;
            return Some(LedgerEntry::Pause {
                hours: hours.trim().parse().ok()?,
            });
        }
        if let Some(rest) = body.strip_prefix(PROGRESS) {
            let complete = rest.ends_with(RUN_COMPLETE);
            let rest = rest.trim_end_matches(RUN_COMPLETE);
            let (counts, failed) = rest.split_once(" processed, ")?;
            let (processed, total) = counts.split_once('/')?;
            return Some(LedgerEntry::Progress {
                processed: processed.trim().parse().ok()?,
                total: total.trim().parse().ok()?,
                failed: failed.trim_end_matches(" failed").trim().parse().ok()?,
                complete,
            });
        }
        None
    }

    /// Parse a full ledger line. Unknown lines yield `None`.
    pub fn parse_line(line: &str) -> Option<(String, Self)> {
        let (timestamp, body) = line.split_once(": ")?;
        Some((timestamp.to_string(), Self::parse_body(body.trim_end())?))
    }
}

/// One event per line.
fn single_line(detail: &str) -> String {
    detail.replace(['\r', '\n'], " ")
}

// ── Writer ────────────────────────────────────────────────────────────────────

pub struct Ledger {
    path: PathBuf,
    file: File,
}

impl Ledger {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one line and flush it to disk before returning.
    pub fn append(&mut self, entry: &LedgerEntry) -> io::Result<()> {
        let line = format!("{}: {}\n", Local::now().format(TIMESTAMP_FORMAT), entry.body());
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.file.sync_data()
    }

    /// Every parseable entry in file order. A missing file is an empty ledger.
    pub fn read(path: &Path) -> io::Result<Vec<LedgerEntry>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            if let Some((_, entry)) = LedgerEntry::parse_line(&line?) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Locators already marked successful.
    pub fn succeeded(path: &Path) -> io::Result<HashSet<String>> {
        Ok(Self::read(path)?
            .into_iter()
            .filter_map(|entry| match entry {
                LedgerEntry::Success { url } => Some(url),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.basketball-reference.com/boxscores/202310240DEN.html";

    #[test]
    fn test_lines_parse_back() {
        let entries = [
            LedgerEntry::Success { url: URL.into() },
            LedgerEntry::BlockSuspected {
                url: URL.into(),
                detail: "HTTP 403".into(),
            },
            LedgerEntry::Failed {
                url: URL.into(),
                attempts: 3,
                detail: "HTTP 500".into(),
            },
            LedgerEntry::Pause { hours: 12.0 },
            LedgerEntry::Progress {
                processed: 4,
                total: 10,
                failed: 1,
                complete: true,
            },
        ];
        for entry in entries {
            let line = format!("2024-01-15 10:00:00.000001: {}", entry.body());
            let (ts, parsed) = LedgerEntry::parse_line(&line).unwrap();
            assert_eq!(ts, "2024-01-15 10:00:00.000001");
            assert_eq!(parsed, entry);
        }
    }

    #[test]
    fn test_reads_legacy_lines() {
        let (_, entry) = LedgerEntry::parse_line(&format!(
            "2025-03-01 08:12:44.102934: Failed after 3 attempts: {URL}"
        ))
        .unwrap();
        assert_eq!(
            entry,
            LedgerEntry::Failed {
                url: URL.into(),
                attempts: 3,
                detail: String::new()
            }
        );
        assert!(LedgerEntry::parse_line("2025-03-01 08:12:44: Completed processing all links.").is_none());
        assert!(LedgerEntry::parse_line("garbage").is_none());
    }

    #[test]
    fn test_append_and_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("scraping_log.txt");

        let mut ledger = Ledger::open(&path).unwrap();
        ledger.append(&LedgerEntry::Success { url: URL.into() }).unwrap();
        ledger
            .append(&LedgerEntry::Failed {
                url: "https://x.test/boxscores/202310250BOS.html".into(),
                attempts: 3,
                detail: "HTTP 500".into(),
            })
            .unwrap();
        drop(ledger);

        // Reopening appends instead of truncating.
        let mut ledger = Ledger::open(&path).unwrap();
        ledger
            .append(&LedgerEntry::Progress {
                processed: 1,
                total: 2,
                failed: 1,
                complete: true,
            })
            .unwrap();

        assert_eq!(Ledger::read(&path).unwrap().len(), 3);
        let done = Ledger::succeeded(&path).unwrap();
        assert_eq!(done.len(), 1);
        assert!(done.contains(URL));
    }

    #[test]
    fn test_multiline_detail_stays_on_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scraping_log.txt");

        let mut ledger = Ledger::open(&path).unwrap();
        ledger
            .append(&LedgerEntry::Failed {
                url: URL.into(),
                attempts: 3,
                detail: "transport error: reset\r\ncaused by: eof".into(),
            })
            .unwrap();
        ledger.append(&LedgerEntry::Success { url: URL.into() }).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(
            Ledger::read(&path).unwrap()[0],
            LedgerEntry::Failed {
                url: URL.into(),
                attempts: 3,
                detail: "transport error: reset  caused by: eof".into(),
            }
        );
    }

    #[test]
    fn test_missing_ledger_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Ledger::succeeded(&dir.path().join("nope.txt")).unwrap().is_empty());
    }
}
