//! Schema for `<project>/.devclaw/sandbox.yaml`.

use serde::{Deserialize, Serialize};

/// Root of the per-project sandbox configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Policy mode: "permissive", "normal" or "strict".
    #[serde(default)]
    pub mode: String,

    #[serde(default)]
    pub shell: ShellConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub docker: DockerConfig,
}

/// Extra shell pattern lists. Entries are glob-like (`*` wildcard) and are
/// appended to the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub block: Vec<String>,
    #[serde(default)]
    pub approve: Vec<String>,
    #[serde(default)]
    pub allow: Vec<String>,
}

/// Path deny additions and outside-workdir exceptions. `~` is home-expanded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub allow_outside_workdir: Vec<String>,
}

/// Isolated execution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockerConfig {
    /// Defaults to enabled when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub cpus: String,
    #[serde(default)]
    pub extra_mounts: Vec<MountConfig>,
}

impl DockerConfig {
    pub fn docker_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// An additional volume mount for the container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub readonly: bool,
}
