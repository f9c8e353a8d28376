//! Error types for the fetch, config, feed and pipeline layers.
//!
//! Only failures that abort something live here. Extraction misses,
//! unparseable dates and malformed listing entries are handled inline with
//! fallbacks and log events, so they never become one of these values.

use thiserror::Error;

/// A page or feed could not be obtained.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure from the HTTP client.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The external render command could not be run or exited non-zero.
    #[error("render command `{program}` failed for {url}: {detail}")]
    Command {
        program: String,
        url: String,
        detail: String,
    },

    /// The render did not finish inside its time budget.
    #[error("rendering {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
}

/// The configuration file is unreadable or describes an impossible run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config for pipeline `{pipeline}`: {reason}")]
    Invalid { pipeline: String, reason: String },
}

impl ConfigError {
    pub fn invalid(pipeline: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            pipeline: pipeline.to_string(),
            reason: reason.into(),
        }
    }
}

/// Reading an upstream feed or writing an output file failed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to serialize records: {0}")]
    Json(#[from] serde_json::Error),

    #[error("upstream document has no <channel> element")]
    MissingChannel,
}

/// A whole pipeline run failed and produced no feed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("no articles extracted from {source_url}")]
    NoArticles { source_url: String },
}
