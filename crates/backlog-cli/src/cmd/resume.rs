use backlog_core::orchestrator::{ContinuationSummary, Orchestrator};
use backlog_core::prompts::ReviewFocus;
use clap::Args;
use std::path::Path;

use super::{finish, runtime, Session};
use crate::output::pretty_content;

#[derive(Args)]
pub struct ResumeArgs {
    /// Backlog to continue (default: the most recent one)
    #[arg(long)]
    pub backlog_id: Option<u64>,

    /// Review focus: functional or non_functional (default: from config)
    #[arg(long)]
    pub focus: Option<ReviewFocus>,

    /// Override convergence.max_iterations for this run
    #[arg(long)]
    pub max_iterations: Option<u32>,
}

pub fn run(root: &Path, args: ResumeArgs, json: bool) -> anyhow::Result<()> {
    let session = Session::open(root)?;
    let generator = session.generator()?;
    let mut convergence = session.convergence(args.max_iterations);
    if let Some(focus) = args.focus {
        convergence.focus = focus;
    }
    let orchestrator = Orchestrator::new(generator.as_ref(), &session.store, &convergence);

    let outcome = runtime()?.block_on(orchestrator.continue_backlog(args.backlog_id));
    finish(outcome, json, print_summary)
}

fn print_summary(s: &ContinuationSummary) {
    println!("Backlog:        {} (project {})", s.backlog_id, s.project_id);
    println!("Resumed after:  round {}", s.resumed_after_round);
    println!(
        "Review rounds:  {} ({} with changes, {:?})",
        s.rounds_run, s.total_feedback_items, s.termination
    );
    println!();
    println!("{}", pretty_content(&s.product_backlog));
}
