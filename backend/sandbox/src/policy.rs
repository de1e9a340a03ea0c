//! Sandbox policy: mode, shell rules, path rules and the approval callback.

use crate::analysis::ShellPolicy;
use crate::approval::Approver;
use crate::path::PathPolicy;
use devclaw_config::SandboxConfig;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// How strictly operations are gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SandboxMode {
    /// Only blocked commands are refused.
    Permissive,
    /// High-risk commands need approval.
    #[default]
    Normal,
    /// High and medium risk commands and every mutating tool need approval.
    Strict,
}

impl SandboxMode {
    /// Parse a mode name. Unknown and empty strings map to `Normal`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "permissive" => SandboxMode::Permissive,
            "strict" => SandboxMode::Strict,
            "normal" | "" => SandboxMode::Normal,
            other => {
                warn!(mode = %other, "Unknown sandbox mode; using normal");
                SandboxMode::Normal
            }
        }
    }
}

impl fmt::Display for SandboxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SandboxMode::Permissive => "permissive",
            SandboxMode::Normal => "normal",
            SandboxMode::Strict => "strict",
        })
    }
}

/// Immutable policy consulted by [`crate::Sandbox::check`].
#[derive(Clone)]
pub struct Policy {
    pub mode: SandboxMode,
    pub workdir: PathBuf,
    pub shell: ShellPolicy,
    pub paths: PathPolicy,
    pub approver: Option<Arc<dyn Approver>>,
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("mode", &self.mode)
            .field("workdir", &self.workdir)
            .field("shell", &self.shell)
            .field("paths", &self.paths)
            .field("approver", &self.approver.is_some())
            .finish()
    }
}

impl Policy {
    /// Default rules for `workdir` in the given mode.
    pub fn new(workdir: impl Into<PathBuf>, mode: SandboxMode) -> Self {
        Self {
            mode,
            workdir: workdir.into(),
            shell: ShellPolicy::with_defaults(),
            paths: PathPolicy::with_defaults(&[], &[]),
            approver: None,
        }
    }

    pub fn with_approver(mut self, approver: Arc<dyn Approver>) -> Self {
        self.approver = Some(approver);
        self
    }

    /// Build a policy from the optional project config.
    ///
    /// A non-empty `cli_mode` overrides the config's mode. Config patterns
    /// and paths are appended to the defaults.
    pub fn from_config(
        workdir: impl Into<PathBuf>,
        config: Option<&SandboxConfig>,
        cli_mode: Option<&str>,
        approver: Option<Arc<dyn Approver>>,
    ) -> Self {
        let mode = match (cli_mode.filter(|m| !m.trim().is_empty()), config) {
            (Some(m), _) => SandboxMode::parse(m),
            (None, Some(cfg)) => SandboxMode::parse(&cfg.mode),
            (None, None) => SandboxMode::Normal,
        };

        let mut policy = Policy::new(workdir, mode);
        if let Some(cfg) = config {
            policy
                .shell
                .extend_from_globs(&cfg.shell.block, &cfg.shell.approve, &cfg.shell.allow);
            policy.paths = PathPolicy::with_defaults(&cfg.paths.deny, &cfg.paths.allow_outside_workdir);
        }
        policy.approver = approver;

        info!(
            mode = %policy.mode,
            workdir = %policy.workdir.display(),
            block = policy.shell.block.len(),
            approve = policy.shell.approve.len(),
            allow = policy.shell.allow.len(),
            "Sandbox policy ready"
        );
        policy
    }

    /// Ask the approver; no approver means no.
    pub(crate) fn ask(&self, prompt: &str) -> bool {
        self.approver.as_ref().is_some_and(|a| a.approve(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devclaw_config::schema::{PathsConfig, ShellConfig};

    #[test]
    fn parse_mode() {
        assert_eq!(SandboxMode::parse("permissive"), SandboxMode::Permissive);
        assert_eq!(SandboxMode::parse("STRICT"), SandboxMode::Strict);
        assert_eq!(SandboxMode::parse(""), SandboxMode::Normal);
        assert_eq!(SandboxMode::parse("paranoid"), SandboxMode::Normal);
    }

    #[test]
    fn cli_mode_overrides_config() {
        let cfg = SandboxConfig {
            mode: "strict".into(),
            ..Default::default()
        };
        let p = Policy::from_config("/proj", Some(&cfg), Some("permissive"), None);
        assert_eq!(p.mode, SandboxMode::Permissive);
        let p = Policy::from_config("/proj", Some(&cfg), None, None);
        assert_eq!(p.mode, SandboxMode::Strict);
        let p = Policy::from_config("/proj", None, None, None);
        assert_eq!(p.mode, SandboxMode::Normal);
    }

    #[test]
    fn config_lists_extend_defaults() {
        let cfg = SandboxConfig {
            shell: ShellConfig {
                block: vec!["terraform destroy*".into()],
                approve: vec![],
                allow: vec!["make *".into()],
            },
            paths: PathsConfig {
                deny: vec!["~/.kube".into()],
                allow_outside_workdir: vec!["/opt/shared".into()],
            },
            ..Default::default()
        };
        let p = Policy::from_config("/proj", Some(&cfg), None, None);
        let defaults = Policy::new("/proj", SandboxMode::Normal);
        assert_eq!(p.shell.block.len(), defaults.shell.block.len() + 1);
        assert_eq!(p.shell.allow.len(), 1);
        assert!(p.paths.deny.contains(&"/etc/".to_string()));
        assert!(p.paths.deny.contains(&"~/.kube".to_string()));
        assert_eq!(p.paths.allow_outside_workdir, vec!["/opt/shared"]);
    }

    #[test]
    fn missing_approver_denies() {
        let p = Policy::new("/proj", SandboxMode::Normal);
        assert!(!p.ask("Allow?"));
        let p = p.with_approver(Arc::new(|_: &str| true));
        assert!(p.ask("Allow?"));
    }
}
