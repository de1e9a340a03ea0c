//! Sandbox error types.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a tool invocation was refused by the policy engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SandboxError {
    #[error("blocked by sandbox policy: {0}")]
    Blocked(String),

    #[error("operation requires user approval")]
    NeedsApproval,

    #[error("path {path} escapes working directory {workdir}")]
    PathEscape { path: PathBuf, workdir: PathBuf },

    #[error("access denied: {0} matches a protected path")]
    PathDenied(String),
}

/// Failures of the isolated execution backend.
#[derive(Debug, Error)]
pub enum DockerError {
    #[error("docker command timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("docker unavailable: {0}")]
    Unavailable(String),

    #[error("container lifecycle failed: {0}")]
    Lifecycle(String),

    #[error("docker call cancelled")]
    Cancelled,
}
