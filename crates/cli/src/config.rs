use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use threadline_core::config::{ThreadlineConfig, CONFIG_FILE_NAME};

/// Get the config directory path (~/.config/threadline/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("threadline"))
}

/// Canonical config file path.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

fn read_config(path: &Path) -> Result<ThreadlineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config at {}", path.display()))
}

/// Load config from an explicit path (which must exist) or from the default
/// location, falling back to defaults when no default file is present.
pub fn load_config(explicit: Option<&Path>) -> Result<ThreadlineConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    let Ok(path) = config_path() else {
        return Ok(ThreadlineConfig::default());
    };
    if !path.exists() {
        return Ok(ThreadlineConfig::default());
    }
    tracing::debug!(path = %path.display(), "loading config");
    read_config(&path)
}
