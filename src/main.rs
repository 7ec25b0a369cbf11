//! CLI entry point for the image fetcher.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use image_fetcher::Fetcher;
use tracing::{debug, info};

mod app_config;
mod cli;
mod input;
mod report;

use cli::Args;
use input::InputSource;
use report::RunSummary;

/// Process exit outcome for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// Every URL was admitted (or there was nothing to do).
    Success,
    /// Some URLs were admitted, some were not.
    Partial,
    /// No URL was admitted.
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => Self::SUCCESS,
            ProcessExit::Partial => Self::from(2_u8),
            ProcessExit::Failure => Self::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(args.default_log_level());
    debug!(?args, "CLI arguments parsed");

    let file_config = app_config::load_file_config(args.config.as_deref())?;
    let config = app_config::build_fetch_config(&args, file_config.as_ref());
    debug!(?config, "effective configuration");

    let (urls, source) = input::collect_urls(&args.urls)?;
    if urls.is_empty() {
        if source != InputSource::Prompt {
            println!("{}", input::NO_INPUT_GUIDANCE);
            println!("{}", input::INPUT_PIPE_EXAMPLE);
        }
        return Ok(ExitCode::SUCCESS);
    }
    info!(urls = urls.len(), ?source, "collected input");

    let mut fetcher = Fetcher::new(config).context("Failed to prepare the download directory")?;

    let mut summary = RunSummary::default();
    for url in &urls {
        let outcome = fetcher.fetch(url).await;
        for line in report::outcome_lines(url, &outcome, fetcher.ledger().path()) {
            println!("{line}");
        }
        summary.record(&outcome);
    }

    if urls.len() > 1 {
        println!("{}", summary.summary_line());
    }
    info!(
        admitted = summary.admitted,
        not_admitted = summary.not_admitted,
        "run complete"
    );

    Ok(summary.exit_outcome().into())
}

/// Logs go to stderr; `RUST_LOG` overrides the level implied by `-q`/`-v`.
fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}
