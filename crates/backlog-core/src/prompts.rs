//! Prompt templates for the reviewer and editor roles.
//!
//! Wording is free to change; the JSON shapes are not. Reviews must answer
//! with `{"feedback": {"required_changes": [...]}}` regardless of focus, and
//! backlogs use the `product_backlog.epics[].user_stories[]` layout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Project;

// ---------------------------------------------------------------------------
// ReviewFocus
// ---------------------------------------------------------------------------

/// Which class of requirements a review/improve cycle concentrates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewFocus {
    #[default]
    Functional,
    NonFunctional,
}

impl ReviewFocus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewFocus::Functional => "functional",
            ReviewFocus::NonFunctional => "non_functional",
        }
    }
}

impl fmt::Display for ReviewFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewFocus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "functional" | "fr" => Ok(ReviewFocus::Functional),
            "non_functional" | "non-functional" | "nfr" => Ok(ReviewFocus::NonFunctional),
            other => Err(format!(
                "unknown review focus '{other}' (expected functional or non_functional)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Substitute `{{key}}` markers in a single pass, so substituted values are
/// never themselves scanned for markers. Unknown markers are left verbatim.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

const REQUIREMENTS_TEMPLATE: &str = r#"Write a complete, professional software requirements document for this project.

PROJECT NAME: {{name}}
PROJECT DESCRIPTION: {{description}}
TECHNOLOGY STACK: {{tech_stack}}
USER REQUIREMENTS: {{user_requirements}}

Use these sections:
1. PROJECT OVERVIEW (description, objectives, scope and boundaries)
2. BUSINESS REQUIREMENTS (objectives, success criteria, KPIs)
3. FUNCTIONAL REQUIREMENTS (features, high-level user stories, data management)
4. NON-FUNCTIONAL REQUIREMENTS (performance, security, usability, reliability)
5. TECHNICAL SPECIFICATIONS (architecture, stack details, integrations)
6. CONSTRAINTS AND ASSUMPTIONS

Return only the document, with no text before or after it.
"#;

const BACKLOG_SCHEMA: &str = r#"{
  "product_backlog": {
    "project_name": "string",
    "version": "string",
    "created_date": "YYYY-MM-DD",
    "epics": [
      {
        "epic_name": "string",
        "user_stories": [
          {
            "story_id": "US-1",
            "title": "string",
            "description": "string",
            "user_story": "As a [role], I want to [action], so that [benefit]",
            "acceptance_criteria": ["string"],
            "priority": "must have|should have|could have|won't have",
            "estimate": "S|M|L|XL",
            "depends_on": ["story_id"],
            "definition_of_done": ["string"]
          }
        ]
      }
    ]
  }
}"#;

const CREATE_BACKLOG_TEMPLATE: &str = r#"You are a product manager turning a requirements document into a functional product backlog.

INPUT DOCUMENT:
{{document}}

Rules:
- Include functional requirements only. Leave out performance, security hardening, localisation, accessibility, infrastructure and other non-functional concerns.
- Group stories into epics. Every story uses "As a [role], I want to [action], so that [benefit]".
- Acceptance criteria must be testable. Prioritise with MoSCoW and estimate with T-shirt sizes.

Answer with JSON only, no markdown fences, matching:
{{schema}}
"#;

const NFR_BACKLOG_TEMPLATE: &str = r#"BACKLOG:
{{backlog}}

From the functional backlog above, derive the non-functional requirements as epics and user stories covering:
1. Performance and scalability
2. Security and compliance
3. Reliability and availability
4. Maintainability and supportability
5. Usability and accessibility
6. Compatibility and integration

Split any story larger than L into independent stories. Answer with JSON only, no markdown fences, matching:
{{schema}}
"#;

const REVIEW_TEMPLATE: &str = r#"You are an experienced product owner reviewing a product backlog. Give specific, actionable feedback.

PRODUCT BACKLOG:
{{backlog}}

FEEDBACK STRUCTURE:
{
  "feedback": {
    "required_changes": [
      {"action": "update", "story_id": "US-1", "field": "acceptance_criteria", "change": "Add validation for email format"},
      {"action": "split", "story_id": "US-3", "reason": "Story too large (XL)", "new_stories": 2},
      {"action": "add", "epic": "Customer Management", "story_description": "Delete customer"}
    ]
  }
}

Guidelines:
- {{focus_rule}}
- Reference story ids so every change can be traced.
- When the backlog needs no further changes, return "required_changes": [].

Answer with JSON only, following the structure above.
"#;

const IMPROVE_TEMPLATE: &str = r#"You maintain a product backlog and must apply review feedback to it.

ORIGINAL BACKLOG:
{{backlog}}

FEEDBACK TO INCORPORATE:
{{feedback}}

Update rules:
1. Apply each required change in order; skip changes the backlog already satisfies.
2. "update" edits the named field of the story; "split" breaks the story into the requested number of smaller stories; "add" creates a story in the named epic.
3. Renumber story ids after changes and keep every depends_on reference valid.
4. No story may be larger than L.
5. {{focus_rule}}

Answer with the complete updated backlog as JSON only, keeping the original structure and fields. No explanations and no markdown fences.
"#;

fn review_rule(focus: ReviewFocus) -> &'static str {
    match focus {
        ReviewFocus::Functional => {
            "Review functional requirements only; do not raise non-functional concerns."
        }
        ReviewFocus::NonFunctional => {
            "Review non-functional requirements only: performance, security, reliability, maintainability, usability, compatibility."
        }
    }
}

fn improve_rule(focus: ReviewFocus) -> &'static str {
    match focus {
        ReviewFocus::Functional => "Change functional stories only; do not add non-functional stories.",
        ReviewFocus::NonFunctional => "Change non-functional stories only.",
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn requirements_document(project: &Project) -> String {
    render(
        REQUIREMENTS_TEMPLATE,
        &[
            ("name", project.name.as_str()),
            ("description", project.description.as_str()),
            ("tech_stack", project.tech_stack.as_str()),
            ("user_requirements", project.user_requirements.as_str()),
        ],
    )
}

pub fn create_backlog(document: &str) -> String {
    render(
        CREATE_BACKLOG_TEMPLATE,
        &[("document", document), ("schema", BACKLOG_SCHEMA)],
    )
}

pub fn nfr_backlog(backlog: &str) -> String {
    render(
        NFR_BACKLOG_TEMPLATE,
        &[("backlog", backlog), ("schema", BACKLOG_SCHEMA)],
    )
}

pub fn review_backlog(backlog: &str, focus: ReviewFocus) -> String {
    render(
        REVIEW_TEMPLATE,
        &[("backlog", backlog), ("focus_rule", review_rule(focus))],
    )
}

pub fn improve_backlog(backlog: &str, feedback: &str, focus: ReviewFocus) -> String {
    render(
        IMPROVE_TEMPLATE,
        &[
            ("backlog", backlog),
            ("feedback", feedback),
            ("focus_rule", improve_rule(focus)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_is_single_pass() {
        let out = render("a {{x}} b {{y}}", &[("x", "{{y}}"), ("y", "Y")]);
        assert_eq!(out, "a {{y}} b Y");
    }

    #[test]
    fn render_leaves_unknown_and_unterminated_markers() {
        assert_eq!(render("{{nope}} {{x}}", &[("x", "1")]), "{{nope}} 1");
        assert_eq!(render("tail {{open", &[]), "tail {{open");
    }

    #[test]
    fn review_prompt_embeds_backlog_and_schema() {
        let p = review_backlog("{\"epics\": []}", ReviewFocus::Functional);
        assert!(p.contains("FEEDBACK STRUCTURE"));
        assert!(p.contains("\"required_changes\""));
        assert!(p.contains("{\"epics\": []}"));
        assert!(p.contains("functional requirements only"));
    }

    #[test]
    fn focus_changes_rules_not_schema() {
        let f = review_backlog("B", ReviewFocus::Functional);
        let n = review_backlog("B", ReviewFocus::NonFunctional);
        assert_ne!(f, n);
        assert!(n.contains("\"required_changes\""));
        let i = improve_backlog("B", "F", ReviewFocus::NonFunctional);
        assert!(i.contains("FEEDBACK TO INCORPORATE:\nF"));
        assert!(i.contains("non-functional stories only"));
    }

    #[test]
    fn create_prompts_include_schema() {
        assert!(create_backlog("DOC").contains("INPUT DOCUMENT:\nDOC"));
        assert!(create_backlog("DOC").contains("\"user_stories\""));
        assert!(nfr_backlog("B0").starts_with("BACKLOG:\nB0"));
    }

    #[test]
    fn focus_parses_aliases() {
        assert_eq!("nfr".parse::<ReviewFocus>().unwrap(), ReviewFocus::NonFunctional);
        assert_eq!("functional".parse::<ReviewFocus>().unwrap(), ReviewFocus::Functional);
        assert!("bogus".parse::<ReviewFocus>().is_err());
        assert_eq!(ReviewFocus::NonFunctional.to_string(), "non_functional");
    }
}
