//! Command-line interface definitions for feedsmith.
//!
//! Everything about the pipelines themselves lives in the config file; the
//! command line only picks the file and, optionally, a subset of pipelines.

use clap::Parser;
use std::path::PathBuf;

/// Scrape article sources and publish them as RSS feeds.
///
/// # Examples
///
/// ```sh
/// # Run the built-in pipelines
/// feedsmith
///
/// # Run pipelines from a config file
/// feedsmith -c feedsmith.yaml
///
/// # Run only one of them
/// feedsmith -c feedsmith.yaml --only binance_square
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML config file; the built-in pipelines are used when omitted
    #[arg(short, long, env = "FEEDSMITH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run only the named pipeline (repeatable); others are reported as skipped
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,
}
