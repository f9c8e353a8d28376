//! Sequential execution of every configured pipeline.
//!
//! Pipelines are independent: one failing is recorded and the next one
//! still runs. The per-pipeline outcomes are logged as a summary at the end
//! and folded into the process exit code.

use crate::config::AppConfig;
use crate::pipeline::run_pipeline;
use crate::render::Renderer;
use chrono::Utc;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// How one pipeline ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded { items: usize, path: PathBuf },
    Failed { error: String },
    Skipped { reason: String },
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Succeeded { items, path } => write!(f, "ok ({items} items -> {})", path.display()),
            RunStatus::Failed { error } => write!(f, "FAILED ({error})"),
            RunStatus::Skipped { reason } => write!(f, "skipped ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub name: String,
    pub status: RunStatus,
    pub elapsed: Duration,
}

/// Run every pipeline in config order. A non-empty `only` restricts the
/// run to the named pipelines; the rest are reported as skipped.
pub async fn run_all<P, D>(config: &AppConfig, only: &[String], pages: &P, documents: &D) -> Vec<RunOutcome>
where
    P: Renderer,
    D: Renderer,
{
    for name in only {
        if !config.pipelines.iter().any(|p| &p.name == name) {
            warn!(%name, "--only names a pipeline that is not configured");
        }
    }

    let mut outcomes = Vec::with_capacity(config.pipelines.len());
    for pipeline in &config.pipelines {
        let t0 = Instant::now();
        let skip = if !pipeline.enabled {
            Some("disabled in config")
        } else if !only.is_empty() && !only.contains(&pipeline.name) {
            Some("not selected with --only")
        } else {
            None
        };

        let status = match skip {
            Some(reason) => {
                info!(pipeline = %pipeline.name, reason, "Skipping pipeline");
                RunStatus::Skipped {
                    reason: reason.to_string(),
                }
            }
            None => {
                info!(pipeline = %pipeline.name, source = %pipeline.source.origin(), "Starting pipeline");
                match run_pipeline(pipeline, pages, documents, Utc::now()).await {
                    Ok(report) => {
                        if let Some(stats) = report.content {
                            info!(
                                pipeline = %pipeline.name,
                                fetched = stats.fetched,
                                empty = stats.empty,
                                failed = stats.failed,
                                "Article bodies"
                            );
                        }
                        RunStatus::Succeeded {
                            items: report.items,
                            path: report.path,
                        }
                    }
                    Err(e) => {
                        error!(pipeline = %pipeline.name, error = %e, "Pipeline failed");
                        RunStatus::Failed { error: e.to_string() }
                    }
                }
            }
        };

        outcomes.push(RunOutcome {
            name: pipeline.name.clone(),
            status,
            elapsed: t0.elapsed(),
        });
    }
    outcomes
}

/// Log one line per pipeline plus totals.
pub fn log_summary(outcomes: &[RunOutcome]) {
    info!("Run summary");
    for o in outcomes {
        info!(
            pipeline = %o.name,
            elapsed_ms = o.elapsed.as_millis() as u64,
            "  {}",
            o.status
        );
    }
    let failed = outcomes
        .iter()
        .filter(|o| matches!(o.status, RunStatus::Failed { .. }))
        .count();
    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o.status, RunStatus::Skipped { .. }))
        .count();
    info!(
        total = outcomes.len(),
        succeeded = outcomes.len() - failed - skipped,
        failed,
        skipped,
        "Finished"
    );
}

/// 0 when nothing failed, 1 otherwise.
pub fn exit_status(outcomes: &[RunOutcome]) -> u8 {
    if outcomes.iter().any(|o| matches!(o.status, RunStatus::Failed { .. })) {
        1
    } else {
        0
    }
}
