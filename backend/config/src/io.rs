//! Config file and prompt override loading.

use crate::schema::SandboxConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Per-project (and per-user) configuration directory name.
pub const CONFIG_DIR_NAME: &str = ".devclaw";

/// Sandbox config file name within the config directory.
const CONFIG_FILE_NAME: &str = "sandbox.yaml";

/// Resolve `<project>/.devclaw/sandbox.yaml`.
pub fn config_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Load and parse the project's sandbox config.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub async fn load_sandbox_config(project_dir: &Path) -> Result<Option<SandboxConfig>> {
    let path = config_file_path(project_dir);
    if !path.exists() {
        debug!(path = %path.display(), "Sandbox config does not exist; using defaults");
        return Ok(None);
    }

    let raw = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read sandbox config: {}", path.display()))?;

    let config: SandboxConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse sandbox config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded sandbox config");
    Ok(Some(config))
}

/// Return the trimmed content of the first readable prompt file.
///
/// Lookup order: `flag_path`, `<project>/.devclaw/<filename>`, `~/.devclaw/<filename>`.
/// Returns `None` when no candidate exists or all are empty.
pub fn resolve_prompt_file(
    flag_path: Option<&Path>,
    project_dir: Option<&Path>,
    filename: &str,
) -> Option<String> {
    let mut candidates = Vec::new();
    if let Some(path) = flag_path {
        candidates.push(path.to_path_buf());
    }
    if let Some(dir) = project_dir {
        candidates.push(dir.join(CONFIG_DIR_NAME).join(filename));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(CONFIG_DIR_NAME).join(filename));
    }

    candidates.into_iter().find_map(|path| {
        let content = std::fs::read_to_string(&path).ok()?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return None;
        }
        debug!(path = %path.display(), "Using prompt override");
        Some(trimmed.to_string())
    })
}
