//! Entry points that drive a whole run: project intake, requirements,
//! initial backlog and the convergence loop, or resumption of an existing
//! backlog.
//!
//! Both entry points catch every error and return a [`RunOutcome`], so a
//! caller never has to unwind a failure to report it.

pub mod convergence;
pub mod outcome;

pub use convergence::{converge, is_feedback_empty, LoopReport, LoopTarget, Termination};
pub use outcome::{ContinuationSummary, DeliverablesSummary, NfrSummary, RunOutcome};

use llm_agent::Generator;

use crate::config::ConvergenceConfig;
use crate::editor::Editor;
use crate::error::{BacklogError, Result};
use crate::prompts::ReviewFocus;
use crate::reviewer::Reviewer;
use crate::store::ArtifactStore;
use crate::types::{BacklogSnapshot, ProjectInput};

pub struct Orchestrator<'a, G: ?Sized, S: ?Sized> {
    generator: &'a G,
    store: &'a S,
    max_iterations: u32,
    focus: ReviewFocus,
}

impl<'a, G, S> Orchestrator<'a, G, S>
where
    G: Generator + ?Sized,
    S: ArtifactStore + ?Sized,
{
    pub fn new(generator: &'a G, store: &'a S, convergence: &ConvergenceConfig) -> Self {
        Self {
            generator,
            store,
            max_iterations: convergence.max_iterations,
            focus: convergence.focus,
        }
    }

    pub fn with_focus(mut self, focus: ReviewFocus) -> Self {
        self.focus = focus;
        self
    }

    fn reviewer(&self) -> Reviewer<'a, G, S> {
        Reviewer::new(self.generator, self.store).with_focus(self.focus)
    }

    fn editor(&self) -> Editor<'a, G, S> {
        Editor::new(self.generator, self.store).with_focus(self.focus)
    }

    /// Create the project, its requirements document and first backlog, then
    /// refine the backlog until the reviewer is satisfied.
    pub async fn generate_deliverables(&self, input: ProjectInput) -> RunOutcome<DeliverablesSummary> {
        RunOutcome::from_result(self.try_generate(input).await, "generate_deliverables")
    }

    async fn try_generate(&self, input: ProjectInput) -> Result<DeliverablesSummary> {
        tracing::info!(
            project = %input.name,
            generator = self.generator.name(),
            max_iterations = self.max_iterations,
            "starting run"
        );
        let project = self.store.create_project(&input)?;
        let reviewer = self.reviewer();
        let editor = self.editor();

        let doc = reviewer.create_requirements_document(project.id).await?;
        let snapshot = editor.create_backlog(project.id, doc.id, &doc.content).await?;

        let target = LoopTarget {
            project_id: project.id,
            backlog_id: snapshot.id,
            first_round: 1,
            max_iterations: self.max_iterations,
        };
        let report = converge(&reviewer, &editor, self.store, target, snapshot.content).await?;
        tracing::info!(
            project_id = project.id,
            backlog_id = snapshot.id,
            rounds = report.rounds_run,
            termination = ?report.termination,
            "run finished"
        );

        Ok(DeliverablesSummary {
            project_id: project.id,
            project_name: project.name,
            requirements_doc_id: doc.id,
            requirement_document: doc.content,
            backlog_id: snapshot.id,
            product_backlog: report.content,
            feedback_cycles: report.iteration,
            rounds_run: report.rounds_run,
            total_feedback_items: report.feedback.len(),
            termination: report.termination,
        })
    }

    /// Resume refinement of `backlog_id`, or of the most recent snapshot
    /// when `None` (or `Some(0)`), picking up after its last recorded round.
    pub async fn continue_backlog(&self, backlog_id: Option<u64>) -> RunOutcome<ContinuationSummary> {
        RunOutcome::from_result(self.try_continue(backlog_id).await, "continue_backlog")
    }

    async fn try_continue(&self, backlog_id: Option<u64>) -> Result<ContinuationSummary> {
        let snapshot = self.resolve_snapshot(backlog_id)?;
        let last_round = self.store.max_feedback_iteration(snapshot.id)?;
        tracing::info!(backlog_id = snapshot.id, last_round, "resuming backlog");

        let target = LoopTarget {
            project_id: snapshot.project_id,
            backlog_id: snapshot.id,
            first_round: last_round + 1,
            max_iterations: self.max_iterations,
        };
        let report = converge(
            &self.reviewer(),
            &self.editor(),
            self.store,
            target,
            snapshot.content,
        )
        .await?;

        Ok(ContinuationSummary::from_report(
            snapshot.project_id,
            snapshot.id,
            last_round,
            report,
        ))
    }

    /// Derive a non-functional backlog from an existing snapshot and store it
    /// as a new snapshot of the same project.
    pub async fn draft_nfr(&self, backlog_id: Option<u64>) -> RunOutcome<NfrSummary> {
        RunOutcome::from_result(self.try_draft_nfr(backlog_id).await, "draft_nfr")
    }

    async fn try_draft_nfr(&self, backlog_id: Option<u64>) -> Result<NfrSummary> {
        let source = self.resolve_snapshot(backlog_id)?;
        let nfr = self
            .editor()
            .draft_nfr_backlog(source.project_id, source.requirements_doc_id, &source.content)
            .await?;
        Ok(NfrSummary {
            project_id: source.project_id,
            source_backlog_id: source.id,
            backlog_id: nfr.id,
            nfr_backlog: nfr.content,
        })
    }

    fn resolve_snapshot(&self, backlog_id: Option<u64>) -> Result<BacklogSnapshot> {
        let id = match backlog_id.filter(|id| *id != 0) {
            Some(id) => id,
            None => self
                .store
                .latest_backlog_snapshot_id()?
                .ok_or(BacklogError::NothingToResume)?,
        };
        self.store
            .get_backlog_snapshot(id)?
            .ok_or(BacklogError::BacklogNotFound(id))
    }
}
