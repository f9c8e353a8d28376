//! # feedsmith
//!
//! Scrapes article sources that do not publish a usable feed and emits
//! RSS 2.0 documents with full article bodies.
//!
//! ## Features
//!
//! - Blog listing pages: article cards are found through ordered fallback
//!   cascades over the rendered markup, so cosmetic class changes degrade
//!   titles and dates instead of breaking the run
//! - Upstream feed relay: items from an existing RSS feed are republished
//!   with the article body fetched from each link
//! - Output carries `dc:identifier`, `dc:creator` and `content:encoded`, with
//!   GUIDs that stay stable across runs
//!
//! ## Usage
//!
//! ```sh
//! feedsmith                              # built-in pipelines
//! feedsmith -c feedsmith.yaml --only blog
//! ```
//!
//! ## Architecture
//!
//! Each pipeline is a sequential run:
//! 1. **Source**: render the listing page or fetch the upstream feed
//! 2. **Extract**: turn it into article records
//! 3. **Enrich**: render each article page and pull out its body
//! 4. **Publish**: sort by date and write the RSS file
//!
//! Pipelines run one after another; a failure in one does not stop the rest.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dates;
mod error;
mod extract;
mod feed;
mod models;
mod outputs;
mod pipeline;
mod render;
mod retry;
mod run_all;
mod sources;
mod utils;

use cli::Cli;
use config::AppConfig;
use run_all::{exit_status, log_summary, run_all};

/// Exit status after Ctrl-C, as a shell reports SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "feedsmith starting up");

    let args = Cli::parse();

    let config = match AppConfig::load(args.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Could not load configuration");
            return ExitCode::FAILURE;
        }
    };

    let (pages, documents) = match (config.renderer.build(), config.renderer.document_renderer()) {
        (Ok(pages), Ok(documents)) => (pages, documents),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Could not set up the page renderer");
            return ExitCode::FAILURE;
        }
    };

    let outcomes = tokio::select! {
        outcomes = run_all(&config, &args.only, &pages, &documents) => outcomes,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; abandoning the current pipeline");
            return ExitCode::from(EXIT_INTERRUPTED);
        }
    };

    log_summary(&outcomes);
    info!(elapsed_secs = start_time.elapsed().as_secs(), "feedsmith finished");
    ExitCode::from(exit_status(&outcomes))
}
