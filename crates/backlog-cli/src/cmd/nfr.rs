use backlog_core::orchestrator::{NfrSummary, Orchestrator};
use std::path::Path;

use super::{finish, runtime, Session};
use crate::output::pretty_content;

pub fn run(root: &Path, backlog_id: Option<u64>, json: bool) -> anyhow::Result<()> {
    let session = Session::open(root)?;
    let generator = session.generator()?;
    let convergence = session.convergence(None);
    let orchestrator = Orchestrator::new(generator.as_ref(), &session.store, &convergence);

    let outcome = runtime()?.block_on(orchestrator.draft_nfr(backlog_id));
    finish(outcome, json, print_summary)
}

fn print_summary(s: &NfrSummary) {
    println!(
        "Non-functional backlog {} drafted from backlog {} (project {})",
        s.backlog_id, s.source_backlog_id, s.project_id
    );
    println!();
    println!("{}", pretty_content(&s.nfr_backlog));
}
