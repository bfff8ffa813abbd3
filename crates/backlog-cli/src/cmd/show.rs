use backlog_core::store::ArtifactStore;
use backlog_core::BacklogError;
use clap::Subcommand;
use std::path::Path;

use super::Session;
use crate::output::{pretty_content, print_json, print_table};

#[derive(Subcommand)]
pub enum ShowSubcommand {
    /// Show a project with its latest requirements document and backlogs
    Project {
        /// Project id
        id: u64,
    },

    /// Show a backlog snapshot (default: the most recent one)
    Backlog {
        /// Backlog id
        id: Option<u64>,
    },
}

pub fn run(root: &Path, subcmd: ShowSubcommand, json: bool) -> anyhow::Result<()> {
    let session = Session::open(root)?;
    match subcmd {
        ShowSubcommand::Project { id } => project(&session, id, json),
        ShowSubcommand::Backlog { id } => backlog(&session, id, json),
    }
}

// ---------------------------------------------------------------------------
// project
// ---------------------------------------------------------------------------

fn project(session: &Session, id: u64, json: bool) -> anyhow::Result<()> {
    let store = &session.store;
    let project = store
        .get_project(id)?
        .ok_or(BacklogError::ProjectNotFound(id))?;
    let requirements = store.latest_requirements_document(id)?;
    let backlogs = store.list_backlog_snapshots(id)?;

    if json {
        return print_json(&serde_json::json!({
            "project": project,
            "requirements_document": requirements,
            "backlogs": backlogs,
        }));
    }

    println!("Project {}: {}", project.id, project.name);
    if !project.description.is_empty() {
        println!("Description:  {}", project.description);
    }
    if !project.tech_stack.is_empty() {
        println!("Tech stack:   {}", project.tech_stack);
    }
    println!("Requirements: {}", project.user_requirements);
    println!("Created:      {}", project.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();

    if backlogs.is_empty() {
        println!("No backlogs.");
    } else {
        let rows = backlogs
            .iter()
            .map(|b| {
                let rounds = store
                    .max_feedback_iteration(b.id)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|_| "?".to_string());
                vec![
                    b.id.to_string(),
                    b.created_by.clone(),
                    b.revision.to_string(),
                    rounds,
                    b.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                ]
            })
            .collect();
        print_table(&["BACKLOG", "CREATED BY", "REVISION", "ROUNDS", "UPDATED"], rows);
    }

    if let Some(doc) = requirements {
        println!();
        println!("Requirements document {} (version {}):", doc.id, doc.version);
        println!("{}", doc.content);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// backlog
// ---------------------------------------------------------------------------

fn backlog(session: &Session, id: Option<u64>, json: bool) -> anyhow::Result<()> {
    let store = &session.store;
    let id = match id {
        Some(id) => id,
        None => store
            .latest_backlog_snapshot_id()?
            .ok_or_else(|| anyhow::anyhow!("no backlog found"))?,
    };
    let snapshot = store
        .get_backlog_snapshot(id)?
        .ok_or(BacklogError::BacklogNotFound(id))?;
    let rounds = store.max_feedback_iteration(id)?;

    if json {
        return print_json(&serde_json::json!({
            "backlog": snapshot,
            "rounds": rounds,
        }));
    }

    println!(
        "Backlog {} (project {}, requirements document {})",
        snapshot.id, snapshot.project_id, snapshot.requirements_doc_id
    );
    println!(
        "Revision {} after {} review round(s), updated {}",
        snapshot.revision,
        rounds,
        snapshot.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    println!("{}", pretty_content(&snapshot.content));
    Ok(())
}
