//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use llm_agent::{GenerationError, Generator};

use crate::error::{BacklogError, Result};
use crate::store::ArtifactStore;
use crate::types::{
    BacklogSnapshot, FeedbackRecord, FeedbackStatus, NewFeedback, Project, ProjectInput,
    RequirementsDocument,
};

/// Generator that replays a fixed script of responses and records every
/// prompt it receives. An exhausted script fails with a transport error.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<std::result::Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, T>(responses: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::from_results(responses.into_iter().map(|r| Ok(r.into())))
    }

    pub fn from_results(results: impl IntoIterator<Item = std::result::Result<String, GenerationError>>) -> Self {
        Self {
            script: Mutex::new(results.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: GenerationError) -> Self {
        Self::from_results([Err(err)])
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn invoke(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Transport("script exhausted".into())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn seed_project(store: &impl ArtifactStore) -> Project {
    store
        .create_project(&ProjectInput {
            name: "P1".into(),
            description: "Customer portal".into(),
            user_requirements: "Customers can sign up and manage their profile".into(),
            tech_stack: serde_json::json!({"backend": "Rust"}),
        })
        .unwrap()
}

/// Store wrapper whose snapshot updates always fail, for checking that an
/// aborted round leaves persisted content untouched.
pub struct FailingUpdates<S>(pub S);

impl<S: ArtifactStore> ArtifactStore for FailingUpdates<S> {
    fn create_project(&self, input: &ProjectInput) -> Result<Project> {
        self.0.create_project(input)
    }
    fn get_project(&self, id: u64) -> Result<Option<Project>> {
        self.0.get_project(id)
    }
    fn save_requirements_document(
        &self,
        project_id: u64,
        content: &str,
        created_by: &str,
    ) -> Result<RequirementsDocument> {
        self.0.save_requirements_document(project_id, content, created_by)
    }
    fn latest_requirements_document(&self, project_id: u64) -> Result<Option<RequirementsDocument>> {
        self.0.latest_requirements_document(project_id)
    }
    fn add_backlog_snapshot(
        &self,
        project_id: u64,
        requirements_doc_id: u64,
        content: &str,
        created_by: &str,
    ) -> Result<BacklogSnapshot> {
        self.0
            .add_backlog_snapshot(project_id, requirements_doc_id, content, created_by)
    }
    fn update_backlog_snapshot(&self, _id: u64, _content: &str) -> Result<BacklogSnapshot> {
        Err(BacklogError::Persistence("write rejected".into()))
    }
    fn get_backlog_snapshot(&self, id: u64) -> Result<Option<BacklogSnapshot>> {
        self.0.get_backlog_snapshot(id)
    }
    fn latest_backlog_snapshot_id(&self) -> Result<Option<u64>> {
        self.0.latest_backlog_snapshot_id()
    }
    fn list_backlog_snapshots(&self, project_id: u64) -> Result<Vec<BacklogSnapshot>> {
        self.0.list_backlog_snapshots(project_id)
    }
    fn add_feedback_record(&self, new: NewFeedback<'_>) -> Result<FeedbackRecord> {
        self.0.add_feedback_record(new)
    }
    fn max_feedback_iteration(&self, backlog_id: u64) -> Result<u32> {
        self.0.max_feedback_iteration(backlog_id)
    }
    fn list_feedback(&self, project_id: u64, status: Option<FeedbackStatus>) -> Result<Vec<FeedbackRecord>> {
        self.0.list_feedback(project_id, status)
    }
    fn list_feedback_for_backlog(&self, backlog_id: u64) -> Result<Vec<FeedbackRecord>> {
        self.0.list_feedback_for_backlog(backlog_id)
    }
    fn resolve_feedback(&self, id: u64) -> Result<FeedbackRecord> {
        self.0.resolve_feedback(id)
    }
}
