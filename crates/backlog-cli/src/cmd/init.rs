use anyhow::Context;
use backlog_core::config::Config;
use backlog_core::{io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing backlog project in: {}", root.display());

    let dir = paths::backlog_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    if Config::init(root).context("failed to write config.yaml")? {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    println!();
    println!("Set DEEPSEEK_API_KEY, or point generation.provider at another entry in");
    println!("{} before running 'backlog run'.", paths::CONFIG_FILE);
    Ok(())
}
