use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BacklogError;

// ---------------------------------------------------------------------------
// ProjectInput / Project
// ---------------------------------------------------------------------------

/// Business input for a fresh run, as supplied on the command line or in an
/// input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInput {
    #[serde(alias = "project_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub user_requirements: String,
    /// Free-form technology description; maps and lists are accepted and
    /// serialised to text before storage.
    #[serde(default)]
    pub tech_stack: serde_json::Value,
}

impl ProjectInput {
    pub fn validate(&self) -> Result<(), BacklogError> {
        if self.name.trim().is_empty() {
            return Err(BacklogError::Validation("project name is required".into()));
        }
        if self.user_requirements.trim().is_empty() {
            return Err(BacklogError::Validation(
                "user requirements are required".into(),
            ));
        }
        Ok(())
    }

    /// Text form of the tech stack as stored on the project.
    pub fn tech_stack_text(&self) -> String {
        match &self.tech_stack {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub user_requirements: String,
    pub tech_stack: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// RequirementsDocument
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementsDocument {
    pub id: u64,
    pub project_id: u64,
    pub content: String,
    /// 1 for the first document of a project, then incremented.
    pub version: u32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// BacklogSnapshot
// ---------------------------------------------------------------------------

/// The iteratively revised backlog. One record per backlog, updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklogSnapshot {
    pub id: u64,
    pub project_id: u64,
    pub requirements_doc_id: u64,
    pub content: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every in-place update; 0 when freshly created.
    #[serde(default)]
    pub revision: u64,
}

// ---------------------------------------------------------------------------
// FeedbackRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Open,
    Resolved,
}

impl FeedbackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackStatus::Open => "open",
            FeedbackStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackStatus {
    type Err = BacklogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(FeedbackStatus::Open),
            "resolved" => Ok(FeedbackStatus::Resolved),
            other => Err(BacklogError::Validation(format!(
                "unknown feedback status '{other}' (expected open or resolved)"
            ))),
        }
    }
}

/// One review round's raw critique of a backlog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: u64,
    pub project_id: u64,
    pub backlog_id: u64,
    /// Round number; strictly increasing per backlog, starting at 1.
    pub iteration_id: u32,
    pub content: String,
    pub action_required: String,
    pub status: FeedbackStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Fields supplied when appending a [`FeedbackRecord`].
#[derive(Debug, Clone)]
pub struct NewFeedback<'a> {
    pub iteration_id: u32,
    pub project_id: u64,
    pub backlog_id: u64,
    pub content: &'a str,
    pub action_required: &'a str,
    pub created_by: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_input_accepts_map_tech_stack() {
        let yaml = r#"
project_name: Automated Web Trading Platform
description: Executes predefined strategies
user_requirements: |
  1. Secure broker API integration
  2. Real-time market data
tech_stack:
  frontend: React with TypeScript
  backend: Rust (axum)
"#;
        let input: ProjectInput = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(input.name, "Automated Web Trading Platform");
        input.validate().unwrap();
        let stack = input.tech_stack_text();
        assert!(stack.contains("\"frontend\":\"React with TypeScript\""));
    }

    #[test]
    fn project_input_plain_text_tech_stack() {
        let input = ProjectInput {
            name: "P1".into(),
            description: String::new(),
            user_requirements: "login".into(),
            tech_stack: serde_json::Value::String("Rust, SQLite".into()),
        };
        assert_eq!(input.tech_stack_text(), "Rust, SQLite");
    }

    #[test]
    fn project_input_requires_name_and_requirements() {
        let mut input = ProjectInput {
            name: " ".into(),
            description: String::new(),
            user_requirements: "x".into(),
            tech_stack: serde_json::Value::Null,
        };
        assert!(matches!(input.validate(), Err(BacklogError::Validation(_))));
        input.name = "P".into();
        input.user_requirements = String::new();
        assert!(matches!(input.validate(), Err(BacklogError::Validation(_))));
    }

    #[test]
    fn feedback_status_parse_and_display() {
        assert_eq!("open".parse::<FeedbackStatus>().unwrap(), FeedbackStatus::Open);
        assert_eq!(FeedbackStatus::Resolved.to_string(), "resolved");
        assert!("closed".parse::<FeedbackStatus>().is_err());
    }
}
