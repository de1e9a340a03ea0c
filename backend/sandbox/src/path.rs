//! Path guard: workdir confinement and symlink-aware deny-list checks.

use crate::error::SandboxError;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Deny prefixes that are always in force.
pub const DEFAULT_PATH_DENY: &[&str] = &["/etc/", "~/.ssh/", "~/.aws/"];

/// Path rules: deny prefixes plus explicit exceptions outside the workdir.
/// Entries may start with `~`.
#[derive(Debug, Clone, Default)]
pub struct PathPolicy {
    pub deny: Vec<String>,
    pub allow_outside_workdir: Vec<String>,
}

impl PathPolicy {
    /// Default deny list extended with extra entries.
    pub fn with_defaults(extra_deny: &[String], allow_outside_workdir: &[String]) -> Self {
        let mut deny: Vec<String> = DEFAULT_PATH_DENY.iter().map(|s| s.to_string()).collect();
        deny.extend(extra_deny.iter().cloned());
        Self {
            deny,
            allow_outside_workdir: allow_outside_workdir.to_vec(),
        }
    }
}

/// Check that `target` stays inside `workdir` (or an allowed exception) and
/// that its canonical form is not under a denied prefix.
pub fn validate_path(workdir: &Path, target: &str, policy: &PathPolicy) -> Result<(), SandboxError> {
    let work = absolutize(workdir);
    let resolved = resolve_path(&work, target);

    if !resolved.starts_with(&work) {
        let allowed = policy
            .allow_outside_workdir
            .iter()
            .filter_map(|entry| expand_home(entry))
            .map(|entry| absolutize(&entry))
            .any(|entry| resolved.starts_with(&entry));
        if allowed {
            debug!(path = %resolved.display(), "Path outside workdir covered by exception");
            return Ok(());
        }
        return Err(SandboxError::PathEscape {
            path: PathBuf::from(target),
            workdir: work,
        });
    }

    let canonical = canonicalize_existing(&resolved);
    for entry in &policy.deny {
        let Some(expanded) = expand_home(entry) else {
            continue;
        };
        let deny = absolutize(&expanded);
        let deny_canonical = canonicalize_existing(&deny);
        if canonical.starts_with(&deny) || canonical.starts_with(&deny_canonical) {
            return Err(SandboxError::PathDenied(target.to_string()));
        }
    }
    Ok(())
}

/// Resolve `target` against `workdir`: empty or "." is the workdir itself,
/// absolute paths are cleaned as-is, relative paths are joined.
pub fn resolve_path(workdir: &Path, target: &str) -> PathBuf {
    let target = target.trim();
    if target.is_empty() || target == "." {
        return clean_path(workdir);
    }
    let p = Path::new(target);
    if p.is_absolute() {
        clean_path(p)
    } else {
        clean_path(&workdir.join(p))
    }
}

/// Lexically normalise a path: drop `.`, fold `..` into its parent.
/// `..` at the root stays at the root.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Expand a leading `~` to the home directory. Returns `None` when the home
/// directory is unknown, so the entry can be skipped.
pub fn expand_home(path: &str) -> Option<PathBuf> {
    if path == "~" {
        return home_or_warn(path);
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return home_or_warn(path).map(|home| home.join(rest));
    }
    Some(PathBuf::from(path))
}

fn home_or_warn(path: &str) -> Option<PathBuf> {
    let home = dirs::home_dir();
    if home.is_none() {
        warn!(path = %path, "Cannot expand ~ without a home directory; skipping");
    }
    home
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return clean_path(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => clean_path(&cwd.join(path)),
        Err(_) => clean_path(path),
    }
}

/// Canonicalize the longest existing ancestor and re-append the rest, so a
/// not-yet-created file under a symlinked directory resolves through the link.
fn canonicalize_existing(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();
    loop {
        if let Ok(canonical) = std::fs::canonicalize(&existing) {
            let mut out = canonical;
            for part in tail.iter().rev() {
                out.push(part);
            }
            return out;
        }
        match (existing.file_name().map(|n| n.to_os_string()), existing.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name);
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }
}
