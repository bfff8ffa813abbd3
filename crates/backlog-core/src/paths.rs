use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const BACKLOG_DIR: &str = ".backlog";
pub const CONFIG_FILE: &str = ".backlog/config.yaml";
pub const DEFAULT_STORE_FILE: &str = ".backlog/artifacts.redb";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn backlog_dir(root: &Path) -> PathBuf {
    root.join(BACKLOG_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured store path. Relative paths are taken from `root`.
pub fn store_path(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}
