//! `.env` file loading.
//!
//! Priority (highest to lowest):
//! 1. Variables already present in the process environment (never overwritten)
//! 2. The explicitly requested env file
//! 3. `.env` in the current working directory
//! 4. `~/.devclaw.env`

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Global env file name in the home directory.
const HOME_ENV_FILE: &str = ".devclaw.env";

/// Load env files in priority order. An explicit file that doesn't exist is an error.
pub fn load_env(explicit: Option<&Path>) -> Result<()> {
    let mut files: Vec<PathBuf> = Vec::new();

    if let Some(path) = explicit {
        if !path.exists() {
            bail!("env file not found: {}", path.display());
        }
        files.push(path.to_path_buf());
    }

    if let Ok(cwd) = std::env::current_dir() {
        let local = cwd.join(".env");
        if local.exists() {
            files.push(local);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let global = home.join(HOME_ENV_FILE);
        if global.exists() {
            files.push(global);
        }
    }

    // Earlier files win because dotenvy never replaces a variable that is already set.
    for file in &files {
        dotenvy::from_path(file)
            .with_context(|| format!("Failed to load env file: {}", file.display()))?;
        debug!(path = %file.display(), "Loaded env file");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_env(Some(&dir.path().join("absent.env"))).unwrap_err();
        assert!(err.to_string().contains("env file not found"));
    }

    #[test]
    fn explicit_file_sets_unset_vars_only() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.env");
        std::fs::write(
            &file,
            "DEVCLAW_ENV_TEST_NEW=from_file\nDEVCLAW_ENV_TEST_EXISTING=from_file\n",
        )
        .unwrap();
        std::env::set_var("DEVCLAW_ENV_TEST_EXISTING", "from_process");

        load_env(Some(&file)).unwrap();

        assert_eq!(std::env::var("DEVCLAW_ENV_TEST_NEW").unwrap(), "from_file");
        assert_eq!(
            std::env::var("DEVCLAW_ENV_TEST_EXISTING").unwrap(),
            "from_process"
        );
    }
}
