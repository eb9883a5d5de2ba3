//! Crawl driver: walks the worklist strictly in order, one locator at a time.
//!
//! ## Per locator
//!   1. Skip it if the ledger already holds a success line for it.
//!   2. Fetch → extract → write, up to `max_attempts` times with
//!      `retry_delay` between attempts.
//!   3. Append the terminal outcome to the ledger, then wait
//!      `request_delay` (+ jitter) before the next locator.
//!
//! Failures that look like the site refusing us (403/429, "forbidden", ...)
//! are counted across locators. `block_threshold` of them in a row trigger
//! one `block_pause`, after which the same locator is retried at once. The
//! pause keeps the attempt count; the first pause on a locator adds one
//! attempt to its budget, so a locator that stays blocked still ends up
//! `failed`. Any other attempt outcome resets the block count.
//!
//! Only configuration problems (worklist, output dir, ledger) end the run;
//! every per-page problem becomes a ledger line.

use crate::assemble::{Assembly, NoDataReason};
use crate::config::{AppConfig, CrawlConfig};
use crate::error::{CrawlError, StorageError};
use crate::models::PageLocator;
use crate::scraper::http_client::HttpClient;
use crate::scraper::{extract_page, fetch_document, PageSource};
use crate::storage::ledger::{Ledger, LedgerEntry};
use crate::storage::ArtifactWriter;
use crate::utils::hours;
use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, error, info, warn};

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, worklist: &[String]) -> Result<CrawlStats> {
        let storage = &self.config.storage;
        let writer = ArtifactWriter::new(storage)
            .with_context(|| format!("Output path {:?} is not writable", storage.output_dir))?;
        let ledger = Ledger::open(&storage.ledger_path)
            .with_context(|| format!("Could not open ledger {:?}", storage.ledger_path))?;
        let client = HttpClient::new(&self.config.scraper)?;

        CrawlDriver::new(&client, &writer, ledger, self.config.crawl.clone())
            .run(worklist)
            .await
    }

    /// Fetch and write a single page. No ledger, no retry.
    pub async fn extract_one(&self, url: &str) -> Result<Option<PathBuf>> {
        let locator = PageLocator::parse(url)?;
        let writer = ArtifactWriter::new(&self.config.storage).with_context(|| {
            format!("Output path {:?} is not writable", self.config.storage.output_dir)
        })?;
        let client = HttpClient::new(&self.config.scraper)?;

        let doc = fetch_document(&client, &locator)
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        match extract_page(&doc, &locator)? {
            Assembly::Game(game) => Ok(Some(writer.write(&game)?)),
            Assembly::NoData(reason) => {
                warn!("No data extracted for {}: {}", url, reason);
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CrawlStats {
    pub total: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub no_data: usize,
    pub failed: usize,
    pub attempts: usize,
    pub block_suspicions: usize,
    pub pauses: usize,
}

/// Transient counters, never persisted.
#[derive(Debug, Default)]
struct CrawlState {
    consecutive_blocks: u32,
}

enum Attempt {
    Saved(PathBuf),
    NoData(NoDataReason),
    Error(CrawlError),
}

enum Resolution {
    Saved(PathBuf),
    NoData { attempts: u32, reason: NoDataReason },
    Failed { attempts: u32, error: CrawlError },
}

pub struct CrawlDriver<'a> {
    source: &'a dyn PageSource,
    writer: &'a ArtifactWriter,
    ledger: Ledger,
    policy: CrawlConfig,
    state: CrawlState,
    stats: CrawlStats,
}

impl<'a> CrawlDriver<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        writer: &'a ArtifactWriter,
        ledger: Ledger,
        policy: CrawlConfig,
    ) -> Self {
        Self {
            source,
            writer,
            ledger,
            policy,
            state: CrawlState::default(),
            stats: CrawlStats::default(),
        }
    }

    pub async fn run(mut self, worklist: &[String]) -> Result<CrawlStats> {
        let mut done = Ledger::succeeded(self.ledger.path())
            .with_context(|| format!("Could not read ledger {:?}", self.ledger.path()))?;

        let total = worklist.len();
        let mut processed = worklist.iter().filter(|u| done.contains(*u)).count();
        let mut failed = 0usize;
        self.stats.total = total;

        info!(
            "Starting to process {} boxscore links. {} already processed.",
            total, processed
        );

        for (i, url) in worklist.iter().enumerate() {
            if done.contains(url) {
                debug!("Skipping already processed URL ({}/{}): {}", i + 1, total, url);
                self.stats.skipped += 1;
                continue;
            }

            info!("Processing URL ({}/{}): {}", i + 1, total, url);

            match self.resolve(url).await? {
                Resolution::Saved(path) => {
                    debug!("{} → {:?}", url, path);
                    self.ledger.append(&LedgerEntry::Success { url: url.clone() })?;
                    done.insert(url.clone());
                    processed += 1;
                    self.stats.succeeded += 1;
                }
                Resolution::NoData { attempts, reason } => {
                    warn!("No data extracted for {}: {}", url, reason);
                    self.ledger.append(&LedgerEntry::Failed {
                        url: url.clone(),
                        attempts,
                        detail: format!("no data: {reason}"),
                    })?;
                    failed += 1;
                    self.stats.no_data += 1;
                }
                Resolution::Failed { attempts, error } => {
                    error!("Failed after {} attempts: {} - {}", attempts, url, error);
                    self.ledger.append(&LedgerEntry::Failed {
                        url: url.clone(),
                        attempts,
                        detail: error.to_string(),
                    })?;
                    failed += 1;
                    self.stats.failed += 1;
                }
            }

            self.polite_delay().await;

            info!("Progress: {}/{} processed, {} failed", processed, total, failed);
            self.ledger.append(&LedgerEntry::Progress {
                processed,
                total,
                failed,
                complete: false,
            })?;
        }

        self.ledger.append(&LedgerEntry::Progress {
            processed,
            total,
            failed,
            complete: true,
        })?;

        info!(
            "Completed processing {} boxscore links: {} succeeded, {} no data, {} failed, {} skipped, {} pauses",
            total,
            self.stats.succeeded,
            self.stats.no_data,
            self.stats.failed,
            self.stats.skipped,
            self.stats.pauses
        );

        Ok(self.stats)
    }

    /// Drive one locator to a terminal outcome.
    async fn resolve(&mut self, url: &str) -> Result<Resolution, StorageError> {
        let locator = match PageLocator::parse(url) {
            Ok(locator) => locator,
            Err(e) => {
                return Ok(Resolution::Failed {
                    attempts: 0,
                    error: e.into(),
                });
            }
        };

        let mut max_attempts = self.policy.max_attempts.max(1);
        let mut pause_retry_granted = false;
        let mut delays = FixedInterval::new(self.policy.retry_delay());
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.stats.attempts += 1;

            let error = match self.attempt(&locator).await? {
                Attempt::Saved(path) => {
                    self.state.consecutive_blocks = 0;
                    return Ok(Resolution::Saved(path));
                }
                Attempt::NoData(reason) => {
                    self.state.consecutive_blocks = 0;
                    return Ok(Resolution::NoData {
                        attempts: attempt,
                        reason,
                    });
                }
                Attempt::Error(error) => error,
            };

            if error.is_block_suspected() {
                self.state.consecutive_blocks += 1;
                self.stats.block_suspicions += 1;
                warn!(
                    "Possible scraping block detected ({} in a row, attempt {}/{}): {} - {}",
                    self.state.consecutive_blocks, attempt, max_attempts, url, error
                );
                self.ledger.append(&LedgerEntry::BlockSuspected {
                    url: url.to_string(),
                    detail: error.to_string(),
                })?;

                if self.state.consecutive_blocks >= self.policy.block_threshold.max(1) {
                    self.long_pause().await?;
                    // One extra attempt per locator after a pause, never more.
                    if !pause_retry_granted {
                        pause_retry_granted = true;
                        max_attempts += 1;
                    }
                    if attempt < max_attempts {
                        continue;
                    }
                }
            } else {
                self.state.consecutive_blocks = 0;
                warn!(
                    "Error processing URL (attempt {}/{}): {} - {}",
                    attempt, max_attempts, url, error
                );
            }

            if attempt >= max_attempts {
                return Ok(Resolution::Failed {
                    attempts: attempt,
                    error,
                });
            }

            if let Some(delay) = delays.next() {
                sleep(delay).await;
            }
        }
    }

    async fn attempt(&self, locator: &PageLocator) -> Result<Attempt, StorageError> {
        let assembly = {
            let doc = match fetch_document(self.source, locator).await {
                Ok(doc) => doc,
                Err(e) => return Ok(Attempt::Error(e.into())),
            };
            match extract_page(&doc, locator) {
                Ok(assembly) => assembly,
                Err(e) => return Ok(Attempt::Error(e.into())),
            }
        };

        match assembly {
            Assembly::Game(game) => Ok(Attempt::Saved(self.writer.write(&game)?)),
            Assembly::NoData(reason) => Ok(Attempt::NoData(reason)),
        }
    }

    async fn long_pause(&mut self) -> Result<(), StorageError> {
        let pause = self.policy.block_pause();
        let resume_at =
            Local::now() + chrono::Duration::from_std(pause).unwrap_or(chrono::Duration::zero());

        warn!(
            "Multiple scraping blocks detected. Pausing for {} hours, resuming at approximately {}",
            hours(pause),
            resume_at.format("%Y-%m-%d %H:%M:%S")
        );
        self.ledger.append(&LedgerEntry::Pause {
            hours: hours(pause),
        })?;
        self.stats.pauses += 1;

        sleep(pause).await;
        self.state.consecutive_blocks = 0;
        Ok(())
    }

    async fn polite_delay(&self) {
        let jitter = if self.policy.jitter_ms > 0 {
            rand::random_range(0..=self.policy.jitter_ms)
        } else {
            0
        };
        let total = self.policy.request_delay() + Duration::from_millis(jitter);
        if !total.is_zero() {
            sleep(total).await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
