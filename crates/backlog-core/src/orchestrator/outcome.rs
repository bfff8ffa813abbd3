use serde::{Deserialize, Serialize};

use super::convergence::{LoopReport, Termination};
use crate::error::{BacklogError, ErrorKind};

/// Result of an entry point, serialised as
/// `{"status": "success", ...}` or `{"status": "failed", "error": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome<T> {
    Success(T),
    Failed { kind: ErrorKind, error: String },
}

impl<T> RunOutcome<T> {
    /// Convert an entry point's result, logging failures with `operation`
    /// as context.
    pub fn from_result(result: Result<T, BacklogError>, operation: &str) -> Self {
        match result {
            Ok(value) => RunOutcome::Success(value),
            Err(e) if e.is_expected() => {
                tracing::error!(operation, kind = ?e.kind(), error = %e, "run failed");
                RunOutcome::Failed {
                    kind: e.kind(),
                    error: e.to_string(),
                }
            }
            Err(e) => {
                tracing::error!(operation, error = ?e, "unexpected failure");
                RunOutcome::Failed {
                    kind: e.kind(),
                    error: format!("unexpected system error: {e}"),
                }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RunOutcome::Success(_) => None,
            RunOutcome::Failed { error, .. } => Some(error),
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            RunOutcome::Success(value) => Some(value),
            RunOutcome::Failed { .. } => None,
        }
    }
}

/// Everything a full run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverablesSummary {
    pub project_id: u64,
    pub project_name: String,
    pub requirements_doc_id: u64,
    pub requirement_document: String,
    pub backlog_id: u64,
    pub product_backlog: String,
    /// Tag of the last review round.
    pub feedback_cycles: u32,
    pub rounds_run: u32,
    /// Rounds whose feedback asked for changes.
    pub total_feedback_items: usize,
    pub termination: Termination,
}

/// What a resumed run did to an existing snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuationSummary {
    pub project_id: u64,
    pub backlog_id: u64,
    /// Highest round recorded before this run.
    pub resumed_after_round: u32,
    pub product_backlog: String,
    pub feedback_cycles: u32,
    pub rounds_run: u32,
    pub total_feedback_items: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NfrSummary {
    pub project_id: u64,
    pub source_backlog_id: u64,
    pub backlog_id: u64,
    pub nfr_backlog: String,
}

impl ContinuationSummary {
    pub(crate) fn from_report(
        project_id: u64,
        backlog_id: u64,
        resumed_after_round: u32,
        report: LoopReport,
    ) -> Self {
        Self {
            project_id,
            backlog_id,
            resumed_after_round,
            product_backlog: report.content,
            feedback_cycles: report.iteration,
            rounds_run: report.rounds_run,
            total_feedback_items: report.feedback.len(),
            termination: report.termination,
        }
    }
}
