use anyhow::Context;
use backlog_core::orchestrator::{DeliverablesSummary, Orchestrator};
use backlog_core::types::ProjectInput;
use clap::Args;
use std::path::{Path, PathBuf};

use super::{finish, runtime, Session};
use crate::output::pretty_content;

#[derive(Args)]
pub struct RunArgs {
    /// Read project fields from a YAML or JSON file
    #[arg(long, conflicts_with_all = ["name", "description", "requirements", "tech_stack"])]
    pub input: Option<PathBuf>,

    /// Project name
    #[arg(long, required_unless_present = "input")]
    pub name: Option<String>,

    /// Short project description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Free-text user requirements
    #[arg(long, required_unless_present = "input")]
    pub requirements: Option<String>,

    /// Technology stack, as plain text or JSON
    #[arg(long)]
    pub tech_stack: Option<String>,

    /// Override convergence.max_iterations for this run
    #[arg(long)]
    pub max_iterations: Option<u32>,
}

impl RunArgs {
    fn project_input(&self) -> anyhow::Result<ProjectInput> {
        if let Some(path) = &self.input {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let input: ProjectInput = serde_yaml::from_str(&data)
                .with_context(|| format!("invalid project input in {}", path.display()))?;
            return Ok(input);
        }
        let tech_stack = match self.tech_stack.as_deref() {
            Some(text) => serde_json::from_str(text)
                .unwrap_or_else(|_| serde_json::Value::String(text.to_string())),
            None => serde_json::Value::Null,
        };
        Ok(ProjectInput {
            name: self.name.clone().unwrap_or_default(),
            description: self.description.clone(),
            user_requirements: self.requirements.clone().unwrap_or_default(),
            tech_stack,
        })
    }
}

pub fn run(root: &Path, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let input = args.project_input()?;
    let session = Session::open(root)?;
    let generator = session.generator()?;
    let convergence = session.convergence(args.max_iterations);
    let orchestrator = Orchestrator::new(generator.as_ref(), &session.store, &convergence);

    let outcome = runtime()?.block_on(orchestrator.generate_deliverables(input));
    finish(outcome, json, print_summary)
}

fn print_summary(s: &DeliverablesSummary) {
    println!("Project:        {} (id {})", s.project_name, s.project_id);
    println!("Requirements:   document {}", s.requirements_doc_id);
    println!("Backlog:        {}", s.backlog_id);
    println!(
        "Review rounds:  {} ({} with changes, {:?})",
        s.rounds_run, s.total_feedback_items, s.termination
    );
    println!();
    println!("{}", pretty_content(&s.product_backlog));
}
