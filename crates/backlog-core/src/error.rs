use serde::{Deserialize, Serialize};
use thiserror::Error;

use llm_agent::GenerationError;

use crate::repair::RepairError;

#[derive(Debug, Error)]
pub enum BacklogError {
    #[error("not initialized: run 'backlog init'")]
    NotInitialized,

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Parse(#[from] RepairError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("project not found: {0}")]
    ProjectNotFound(u64),

    #[error("backlog not found: {0}")]
    BacklogNotFound(u64),

    #[error("no backlog found to continue")]
    NothingToResume,

    #[error("feedback not found: {0}")]
    FeedbackNotFound(u64),

    #[error("unknown provider '{0}': not listed under generation.providers")]
    UnknownProvider(String),

    #[error("artifact store error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The four failure classes a run can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Generation,
    Parse,
    Validation,
    Persistence,
}

impl BacklogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BacklogError::Generation(_) => ErrorKind::Generation,
            BacklogError::Parse(_) => ErrorKind::Parse,
            BacklogError::Validation(_)
            | BacklogError::ProjectNotFound(_)
            | BacklogError::BacklogNotFound(_)
            | BacklogError::NothingToResume
            | BacklogError::FeedbackNotFound(_)
            | BacklogError::NotInitialized
            | BacklogError::UnknownProvider(_) => ErrorKind::Validation,
            BacklogError::Persistence(_)
            | BacklogError::Io(_)
            | BacklogError::Yaml(_)
            | BacklogError::Json(_) => ErrorKind::Persistence,
        }
    }

    /// Expected failures carry a message meant for the user; everything else
    /// is reported as an unexpected system error.
    pub fn is_expected(&self) -> bool {
        self.kind() != ErrorKind::Persistence
    }
}

/// Map any store-layer error into [`BacklogError::Persistence`].
pub(crate) fn store_err(e: impl std::fmt::Display) -> BacklogError {
    BacklogError::Persistence(e.to_string())
}

pub type Result<T> = std::result::Result<T, BacklogError>;
