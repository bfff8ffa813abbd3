//! Requirements reviewer role: writes the requirements document and reviews
//! backlog drafts against it.

use llm_agent::{check_output, Generator};

use crate::error::{BacklogError, Result};
use crate::prompts::{self, ReviewFocus};
use crate::store::ArtifactStore;
use crate::types::{NewFeedback, RequirementsDocument};

/// Recorded as `created_by` on everything the reviewer persists.
pub const REVIEWER_AGENT_ID: &str = "req_agent";

/// `action_required` text stored with every feedback record.
pub const ACTION_REQUIRED: &str = "Action required";

pub struct Reviewer<'a, G: ?Sized, S: ?Sized> {
    generator: &'a G,
    store: &'a S,
    focus: ReviewFocus,
}

impl<'a, G, S> Reviewer<'a, G, S>
where
    G: Generator + ?Sized,
    S: ArtifactStore + ?Sized,
{
    pub fn new(generator: &'a G, store: &'a S) -> Self {
        Self {
            generator,
            store,
            focus: ReviewFocus::default(),
        }
    }

    pub fn with_focus(mut self, focus: ReviewFocus) -> Self {
        self.focus = focus;
        self
    }

    /// Generate and persist a requirements document for `project_id`.
    pub async fn create_requirements_document(
        &self,
        project_id: u64,
    ) -> Result<RequirementsDocument> {
        let project = self
            .store
            .get_project(project_id)?
            .ok_or(BacklogError::ProjectNotFound(project_id))?;
        tracing::info!(project_id, name = %project.name, "creating requirements document");

        let prompt = prompts::requirements_document(&project);
        let text = check_output(self.generator.invoke(&prompt).await?)?;

        let doc = self
            .store
            .save_requirements_document(project_id, &text, REVIEWER_AGENT_ID)?;
        tracing::debug!(doc_id = doc.id, chars = doc.content.len(), "requirements document generated");
        Ok(doc)
    }

    /// Review `backlog` and record the raw feedback text as round `round`.
    ///
    /// A record is written for every review, including ones that ask for no
    /// changes, so the iteration sequence has no gaps.
    pub async fn review_backlog(
        &self,
        backlog: &str,
        project_id: u64,
        backlog_id: u64,
        round: u32,
    ) -> Result<String> {
        tracing::info!(backlog_id, round, focus = %self.focus, "reviewing backlog");
        let prompt = prompts::review_backlog(backlog, self.focus);
        let text = check_output(self.generator.invoke(&prompt).await?)?;

        self.store.add_feedback_record(NewFeedback {
            iteration_id: round,
            project_id,
            backlog_id,
            content: &text,
            action_required: ACTION_REQUIRED,
            created_by: REVIEWER_AGENT_ID,
        })?;
        Ok(text)
    }
}
