//! `devclaw-config` — project configuration for the devclaw agent.
//!
//! Provides:
//! - Typed schema for `<project>/.devclaw/sandbox.yaml`
//! - YAML loading (absence is not an error)
//! - `.env` file loading that never overrides the process environment
//! - Prompt override file resolution
//! - Default value application and validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::load_env;
pub use io::{config_file_path, load_sandbox_config, resolve_prompt_file, CONFIG_DIR_NAME};
pub use schema::{DockerConfig, MountConfig, PathsConfig, SandboxConfig, ShellConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::Result;
use std::path::Path;

/// Load, default, and validate the sandbox config for a project.
///
/// Returns `Ok(None)` when the project has no config file.
pub async fn load_and_prepare(project_dir: &Path) -> Result<Option<SandboxConfig>> {
    let Some(config) = load_sandbox_config(project_dir).await? else {
        return Ok(None);
    };

    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok(Some(config))
}
