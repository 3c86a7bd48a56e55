//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::info;

/// Write a default config file under `base_dir` (default `~/.ragchain`).
///
/// Refuses to replace an existing file unless `force` is set. Returns the
/// path that was written.
pub fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<PathBuf> {
    let mut config = Config::default();
    config.init_paths(base_dir);

    let config_path = config.paths.config_file.clone();
    if config_path.exists() && !force {
        return Err(Error::AlreadyInitialized(config_path.display().to_string()));
    }

    config.validate()?;
    config.save()?;
    info!("Created config at {:?}", config_path);

    Ok(config_path)
}

pub fn print_init_summary(config_path: &std::path::Path) {
    println!("✓ ragchain initialized");
    println!("  Config: {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Set the API key variable named in the config (default: PGKEY)");
    println!("  2. Build a store: ragchain ingest <url-or-file> -o chunks.json");
    println!("  3. Ask a question: ragchain ask \"...\" -s chunks.json");
}
