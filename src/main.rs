mod assemble;
mod config;
mod error;
mod loader;
mod models;
mod pipeline;
mod reconcile;
mod scraper;
mod storage;
mod teams;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::loader::load_worklist;
use crate::pipeline::Pipeline;
use crate::storage::ledger::{Ledger, LedgerEntry};

#[derive(Parser)]
#[command(name = "boxscore-etl", about = "Basketball box score scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl every box score in the worklist, resuming from the ledger
    Crawl {
        /// JSON ({group: [urls]} or [urls]) or one url per line
        #[arg(short, long, default_value = "data/input/Game Links.json")]
        worklist: PathBuf,
    },

    /// Fetch and write a single box score page (ledger untouched)
    Extract { url: String },

    /// Summarise the crawl ledger
    Status,

    /// Print the franchise → code table, or look up one franchise
    Teams { name: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "boxscore_etl=info,warn",
        1 => "boxscore_etl=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Crawl { worklist } => {
            let _t = utils::Timer::start("Crawl");
            let urls = load_worklist(&worklist)?;
            let stats = Pipeline::new(config).run(&urls).await?;
            info!(
                "Done: {} links, {} saved, {} no data, {} failed, {} skipped, {} fetch attempts, {} pauses",
                stats.total,
                stats.succeeded,
                stats.no_data,
                stats.failed,
                stats.skipped,
                stats.attempts,
                stats.pauses
            );
        }

        Command::Extract { url } => match Pipeline::new(config).extract_one(&url).await? {
            Some(path) => println!("Saved {}", path.display()),
            None => println!("No data on {}", url),
        },

        Command::Status => {
            let path = &config.storage.ledger_path;
            let entries =
                Ledger::read(path).with_context(|| format!("Could not read ledger {:?}", path))?;

            let mut successes = 0usize;
            let mut blocks = 0usize;
            let mut failures = 0usize;
            let mut pauses = 0usize;
            let mut distinct = HashSet::new();
            let mut last_progress = None;

            for entry in &entries {
                match entry {
                    LedgerEntry::Success { url } => {
                        successes += 1;
                        distinct.insert(url.as_str());
                    }
                    LedgerEntry::BlockSuspected { .. } => blocks += 1,
                    LedgerEntry::Failed { .. } => failures += 1,
                    LedgerEntry::Pause { .. } => pauses += 1,
                    LedgerEntry::Progress { .. } => last_progress = Some(entry),
                }
            }

            println!("─────────────────────────────────");
            println!("  Box score crawl ledger");
            println!("─────────────────────────────────");
            println!("  Ledger     : {}", path.display());
            println!("  Successes  : {}", utils::fmt_number(successes));
            println!("  Distinct   : {}", utils::fmt_number(distinct.len()));
            println!("  Failures   : {}", utils::fmt_number(failures));
            println!("  Blocks     : {}", utils::fmt_number(blocks));
            println!("  Pauses     : {}", utils::fmt_number(pauses));
            if let Some(LedgerEntry::Progress {
                processed,
                total,
                failed,
                complete,
            }) = last_progress
            {
                println!(
                    "  Last run   : {}/{} processed, {} failed{}",
                    processed,
                    total,
                    failed,
                    if *complete { "" } else { " (interrupted)" }
                );
            }
            println!("─────────────────────────────────");
        }

        Command::Teams { name } => match name {
            Some(name) => match teams::abbreviation(&name) {
                Some(code) => println!("{}", code),
                None => println!("Unknown franchise: {}", name),
            },
            None => {
                for (franchise, code) in teams::TEAMS {
                    println!("  {}  {}", code, franchise);
                }
            }
        },
    }

    Ok(())
}
