//! The reviewer/editor convergence loop.
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            v                                              │
//! round < max? ── no ──> CapReached                         │
//!            │ yes                                          │
//!            v                                              │
//!     review (round) ── empty or prose ──> Converged        │
//!            │ changes                                      │
//!            v                                              │
//!   canonicalize feedback + backlog ── parse error ──> abort│
//!            v                                              │
//!     improve ──> update snapshot ──────────────────────────┘
//! ```

use llm_agent::Generator;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::editor::Editor;
use crate::error::Result;
use crate::repair;
use crate::reviewer::Reviewer;
use crate::store::ArtifactStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The reviewer asked for no further changes.
    Converged,
    /// The round cap was hit with changes still outstanding.
    CapReached,
}

#[derive(Debug, Clone)]
pub struct LoopReport {
    /// Backlog content after the last completed round.
    pub content: String,
    /// Tag of the last round started, or the starting tag minus one when no
    /// round ran.
    pub iteration: u32,
    /// Rounds performed by this invocation.
    pub rounds_run: u32,
    /// Canonical feedback text of every round that requested changes.
    pub feedback: Vec<String>,
    pub termination: Termination,
}

/// Where a loop starts and which snapshot it edits.
#[derive(Debug, Clone, Copy)]
pub struct LoopTarget {
    pub project_id: u64,
    pub backlog_id: u64,
    /// Tag for the first round: 1 for a fresh backlog, max recorded + 1 on resume.
    pub first_round: u32,
    pub max_iterations: u32,
}

/// True when a repaired review asks for nothing: no `feedback` object, or a
/// `required_changes` entry that is missing, null, not a list, or empty.
pub fn is_feedback_empty(review: &Value) -> bool {
    let Some(feedback) = review.get("feedback") else {
        return true;
    };
    match feedback.get("required_changes") {
        Some(Value::Array(changes)) => changes.is_empty(),
        _ => true,
    }
}

/// Run review/improve rounds against `target.backlog_id` starting from
/// `content` until the reviewer is satisfied or the cap is reached.
///
/// The snapshot is only written after a round's improvement succeeds, so an
/// aborted round leaves the previous content in place.
pub async fn converge<G, S>(
    reviewer: &Reviewer<'_, G, S>,
    editor: &Editor<'_, G, S>,
    store: &S,
    target: LoopTarget,
    content: String,
) -> Result<LoopReport>
where
    G: Generator + ?Sized,
    S: ArtifactStore + ?Sized,
{
    let LoopTarget {
        project_id,
        backlog_id,
        first_round,
        max_iterations,
    } = target;

    let mut current = content;
    let mut feedback_log = Vec::new();
    let mut iteration = first_round.saturating_sub(1);
    let mut rounds_run = 0;

    while iteration < max_iterations {
        iteration += 1;
        rounds_run += 1;
        tracing::info!(backlog_id, round = iteration, max = max_iterations, "review round");

        let review_text = reviewer
            .review_backlog(&current, project_id, backlog_id, iteration)
            .await
            .inspect_err(|e| tracing::error!(backlog_id, round = iteration, error = %e, "review failed"))?;
        let review = match repair::repair(&review_text) {
            Ok(review) => Some(review),
            // Prose without a feedback key carries no requested change.
            Err(_) if !review_text.contains("feedback") => None,
            Err(e) => {
                tracing::error!(backlog_id, round = iteration, error = %e, "feedback could not be parsed");
                return Err(e.into());
            }
        };
        let Some(review) = review.filter(|r| !is_feedback_empty(r)) else {
            tracing::info!(backlog_id, round = iteration, "no changes requested, backlog converged");
            return Ok(LoopReport {
                content: current,
                iteration,
                rounds_run,
                feedback: feedback_log,
                termination: Termination::Converged,
            });
        };

        let feedback = review["feedback"].to_string();
        let backlog = repair::canonicalize(&current).inspect_err(
            |e| tracing::error!(backlog_id, round = iteration, error = %e, "backlog could not be parsed"),
        )?;
        feedback_log.push(feedback.clone());

        let improved = editor
            .improve_backlog(&backlog, &feedback)
            .await
            .inspect_err(|e| tracing::error!(backlog_id, round = iteration, error = %e, "improvement failed"))?;
        store
            .update_backlog_snapshot(backlog_id, &improved)
            .inspect_err(|e| tracing::error!(backlog_id, round = iteration, error = %e, "snapshot update failed"))?;
        tracing::info!(backlog_id, round = iteration, chars = improved.len(), "backlog updated");
        current = improved;
    }

    tracing::warn!(backlog_id, max = max_iterations, "iteration cap reached before convergence");
    Ok(LoopReport {
        content: current,
        iteration,
        rounds_run,
        feedback: feedback_log,
        termination: Termination::CapReached,
    })
}
