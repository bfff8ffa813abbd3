use backlog_core::store::ArtifactStore;
use backlog_core::types::FeedbackStatus;
use clap::Subcommand;
use std::path::Path;

use super::Session;
use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum FeedbackSubcommand {
    /// List review feedback recorded for a project
    List {
        /// Project id
        #[arg(long)]
        project: u64,
        /// Only show feedback with this status: open or resolved
        #[arg(long)]
        status: Option<FeedbackStatus>,
    },

    /// Mark a feedback record as resolved
    Resolve {
        /// Feedback id
        id: u64,
    },
}

pub fn run(root: &Path, subcmd: FeedbackSubcommand, json: bool) -> anyhow::Result<()> {
    let session = Session::open(root)?;
    match subcmd {
        FeedbackSubcommand::List { project, status } => list(&session, project, status, json),
        FeedbackSubcommand::Resolve { id } => resolve(&session, id, json),
    }
}

fn list(
    session: &Session,
    project: u64,
    status: Option<FeedbackStatus>,
    json: bool,
) -> anyhow::Result<()> {
    let records = session.store.list_feedback(project, status)?;
    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No feedback.");
        return Ok(());
    }
    let rows = records
        .iter()
        .map(|f| {
            vec![
                f.id.to_string(),
                f.backlog_id.to_string(),
                f.iteration_id.to_string(),
                f.status.to_string(),
                f.created_by.clone(),
                f.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "BACKLOG", "ROUND", "STATUS", "BY", "CREATED"], rows);
    Ok(())
}

fn resolve(session: &Session, id: u64, json: bool) -> anyhow::Result<()> {
    let record = session.store.resolve_feedback(id)?;
    if json {
        return print_json(&record);
    }
    println!(
        "Resolved feedback {} (backlog {}, round {})",
        record.id, record.backlog_id, record.iteration_id
    );
    Ok(())
}
