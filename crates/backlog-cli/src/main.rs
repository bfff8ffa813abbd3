mod cmd;
mod output;
mod root;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, feedback::FeedbackSubcommand, resume::ResumeArgs, run::RunArgs,
    show::ShowSubcommand,
};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "backlog",
    about = "Generate a requirements document and refine a product backlog through LLM review rounds",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .backlog/)
    #[arg(long, global = true, env = "BACKLOG_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Also append logs to this file
    #[arg(long, global = true, env = "BACKLOG_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .backlog/config.yaml
    Init,

    /// Create a project, its requirements document and a reviewed backlog
    Run(RunArgs),

    /// Continue review rounds on an existing backlog
    Resume(ResumeArgs),

    /// Draft a non-functional backlog from an existing one
    Nfr {
        /// Source backlog (default: the most recent one)
        #[arg(long)]
        backlog_id: Option<u64>,
    },

    /// Show stored projects and backlogs
    Show {
        #[command(subcommand)]
        subcommand: ShowSubcommand,
    },

    /// List and resolve review feedback
    Feedback {
        #[command(subcommand)]
        subcommand: FeedbackSubcommand,
    },

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn init_tracing(level: tracing::Level, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let file = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .init();
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run(_) | Commands::Resume(_) | Commands::Nfr { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };
    if let Err(e) = init_tracing(default_level, cli.log_file.as_deref()) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Run(args) => cmd::run::run(&root, args, cli.json),
        Commands::Resume(args) => cmd::resume::run(&root, args, cli.json),
        Commands::Nfr { backlog_id } => cmd::nfr::run(&root, backlog_id, cli.json),
        Commands::Show { subcommand } => cmd::show::run(&root, subcommand, cli.json),
        Commands::Feedback { subcommand } => cmd::feedback::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
