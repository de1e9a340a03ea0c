//! Config validation: reports problems without rejecting the config.

use crate::schema::SandboxConfig;
use thiserror::Error;

/// A config validation finding with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation findings from one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &SandboxConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_mode(config, &mut report);
    validate_shell(config, &mut report);
    validate_paths(config, &mut report);
    validate_docker(config, &mut report);
    report
}

fn validate_mode(config: &SandboxConfig, report: &mut ValidationReport) {
    let mode = config.mode.trim().to_lowercase();
    if !mode.is_empty() && !matches!(mode.as_str(), "permissive" | "normal" | "strict") {
        report.warn(
            "mode",
            format!("Unknown mode '{mode}'; falling back to 'normal'"),
        );
    }
}

fn validate_shell(config: &SandboxConfig, report: &mut ValidationReport) {
    let lists = [
        ("shell.block", &config.shell.block),
        ("shell.approve", &config.shell.approve),
        ("shell.allow", &config.shell.allow),
    ];
    for (path, patterns) in lists {
        for (i, pattern) in patterns.iter().enumerate() {
            if pattern.trim().is_empty() {
                report.warn(format!("{path}[{i}]"), "Empty pattern matches every command");
            }
        }
    }
}

fn validate_paths(config: &SandboxConfig, report: &mut ValidationReport) {
    for (i, entry) in config.paths.allow_outside_workdir.iter().enumerate() {
        let trimmed = entry.trim();
        if trimmed == "/" || trimmed == "~" {
            report.warn(
                format!("paths.allow_outside_workdir[{i}]"),
                format!("'{trimmed}' disables workdir confinement for a very broad tree"),
            );
        }
    }
}

fn validate_docker(config: &SandboxConfig, report: &mut ValidationReport) {
    for (i, mount) in config.docker.extra_mounts.iter().enumerate() {
        let path = format!("docker.extra_mounts[{i}]");
        if mount.source.trim().is_empty() {
            report.error(format!("{path}.source"), "Mount source cannot be empty");
        }
        if !mount.target.starts_with('/') {
            report.error(
                format!("{path}.target"),
                "Mount target must be an absolute container path",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MountConfig;

    #[test]
    fn empty_config_is_valid() {
        let report = validate(&SandboxConfig::default());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unknown_mode_is_warning() {
        let cfg = SandboxConfig {
            mode: "paranoid".into(),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "mode");
    }

    #[test]
    fn relative_mount_target_is_error() {
        let mut cfg = SandboxConfig::default();
        cfg.docker.extra_mounts.push(MountConfig {
            source: "~/.cache".into(),
            target: "cache".into(),
            readonly: false,
        });
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert!(report.errors[0].path.contains("target"));
    }
}
