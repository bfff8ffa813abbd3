pub mod config;
pub mod feedback;
pub mod init;
pub mod nfr;
pub mod resume;
pub mod run;
pub mod show;

use anyhow::Context;
use backlog_core::config::{Config, ConvergenceConfig};
use backlog_core::orchestrator::RunOutcome;
use backlog_core::store::RedbStore;
use llm_agent::{build_generator, Generator};
use serde::Serialize;
use std::path::Path;

use crate::output::print_json;

/// Loaded config plus the opened artifact store for one command.
pub struct Session {
    pub config: Config,
    pub store: RedbStore,
}

impl Session {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let config = Config::load(root).context("failed to load config")?;
        let path = config.store_path(root);
        let store = RedbStore::open(&path)
            .with_context(|| format!("failed to open artifact store at {}", path.display()))?;
        Ok(Self { config, store })
    }

    /// Build the generator named by `generation.provider`.
    pub fn generator(&self) -> anyhow::Result<Box<dyn Generator>> {
        let provider = self.config.active_provider()?;
        let generator = build_generator(provider, &self.config.generation.retry)
            .with_context(|| format!("failed to set up provider '{}'", self.config.generation.provider))?;
        tracing::debug!(provider = generator.name(), model = provider.model(), "generator ready");
        Ok(generator)
    }

    /// Convergence settings with an optional cap override from the command line.
    pub fn convergence(&self, max_iterations: Option<u32>) -> ConvergenceConfig {
        let mut convergence = self.config.convergence.clone();
        if let Some(max) = max_iterations {
            convergence.max_iterations = max;
        }
        convergence
    }
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}

/// Print an entry point's outcome and turn a failure into an error exit.
pub fn finish<T: Serialize>(
    outcome: RunOutcome<T>,
    json: bool,
    print_success: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if json {
        print_json(&outcome)?;
    }
    match outcome {
        RunOutcome::Success(summary) => {
            if !json {
                print_success(&summary);
            }
            Ok(())
        }
        RunOutcome::Failed { error, .. } => Err(anyhow::anyhow!(error)),
    }
}
