//! Backlog editor role: drafts the backlog and rewrites it from feedback.

use llm_agent::{check_output, Generator};

use crate::error::Result;
use crate::prompts::{self, ReviewFocus};
use crate::store::ArtifactStore;
use crate::types::BacklogSnapshot;

/// Recorded as `created_by` on snapshots the editor creates.
pub const EDITOR_AGENT_ID: &str = "backlog_agent";

pub struct Editor<'a, G: ?Sized, S: ?Sized> {
    generator: &'a G,
    store: &'a S,
    focus: ReviewFocus,
}

impl<'a, G, S> Editor<'a, G, S>
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

    /// Draft the initial backlog from a requirements document and persist it
    /// as a new snapshot.
    pub async fn create_backlog(
        &self,
        project_id: u64,
        requirements_doc_id: u64,
        requirements: &str,
    ) -> Result<BacklogSnapshot> {
        tracing::info!(project_id, requirements_doc_id, "creating product backlog");
        let prompt = prompts::create_backlog(requirements);
        let text = check_output(self.generator.invoke(&prompt).await?)?;
        self.store
            .add_backlog_snapshot(project_id, requirements_doc_id, &text, EDITOR_AGENT_ID)
    }

    /// Rewrite `backlog` to address `feedback`. Nothing is persisted; the
    /// caller owns the snapshot update.
    pub async fn improve_backlog(&self, backlog: &str, feedback: &str) -> Result<String> {
        tracing::info!(focus = %self.focus, "improving backlog from feedback");
        let prompt = prompts::improve_backlog(backlog, feedback, self.focus);
        Ok(check_output(self.generator.invoke(&prompt).await?)?)
    }

    /// Derive non-functional epics and stories from an existing backlog and
    /// persist them as a separate snapshot.
    pub async fn draft_nfr_backlog(
        &self,
        project_id: u64,
        requirements_doc_id: u64,
        backlog: &str,
    ) -> Result<BacklogSnapshot> {
        tracing::info!(project_id, "drafting non-functional backlog");
        let prompt = prompts::nfr_backlog(backlog);
        let text = check_output(self.generator.invoke(&prompt).await?)?;
        self.store
            .add_backlog_snapshot(project_id, requirements_doc_id, &text, EDITOR_AGENT_ID)
    }
}
