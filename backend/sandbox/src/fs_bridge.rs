//! Host ↔ container path mapping for the mounted workspace.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Mount point of the project inside the container.
pub const CONTAINER_WORKSPACE: &str = "/workspace";

/// Maps paths between the host workspace and its container mount.
#[derive(Debug, Clone)]
pub struct FsBridge {
    /// Host-side workspace root.
    host_workspace: PathBuf,
    /// Container-side workspace mount point.
    container_workspace: PathBuf,
}

impl FsBridge {
    pub fn new(host_workspace: impl Into<PathBuf>, container_workspace: impl Into<PathBuf>) -> Self {
        Self {
            host_workspace: host_workspace.into(),
            container_workspace: container_workspace.into(),
        }
    }

    /// Bridge for the standard `/workspace` mount.
    pub fn for_workspace(host_workspace: impl Into<PathBuf>) -> Self {
        Self::new(host_workspace, CONTAINER_WORKSPACE)
    }

    pub fn container_workspace(&self) -> &Path {
        &self.container_workspace
    }

    /// Translate a host path to the equivalent container path.
    pub fn host_to_container(&self, host_path: &Path) -> Option<PathBuf> {
        let rel = host_path.strip_prefix(&self.host_workspace).ok()?;
        Some(join_relative(&self.container_workspace, rel))
    }

    /// Translate a container path to the equivalent host path.
    pub fn container_to_host(&self, container_path: &Path) -> Option<PathBuf> {
        let rel = container_path.strip_prefix(&self.container_workspace).ok()?;
        Some(join_relative(&self.host_workspace, rel))
    }

    /// Rewrite a path argument the model produced. The mount root and paths
    /// under it become host paths; anything else is returned unchanged.
    pub fn translate_arg(&self, arg: &str) -> String {
        match self.container_to_host(Path::new(arg)) {
            Some(host) => {
                let host = host.to_string_lossy().into_owned();
                debug!(from = %arg, to = %host, "Translated container path");
                host
            }
            None => arg.to_string(),
        }
    }
}

fn join_relative(root: &Path, rel: &Path) -> PathBuf {
    if rel.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> FsBridge {
        FsBridge::for_workspace("/home/dev/proj")
    }

    #[test]
    fn translates_mount_root_and_children() {
        let b = bridge();
        assert_eq!(b.translate_arg("/workspace"), "/home/dev/proj");
        assert_eq!(b.translate_arg("/workspace/src/main.rs"), "/home/dev/proj/src/main.rs");
    }

    #[test]
    fn leaves_other_paths_alone() {
        let b = bridge();
        assert_eq!(b.translate_arg("src/main.rs"), "src/main.rs");
        assert_eq!(b.translate_arg("/workspace2/x"), "/workspace2/x");
        assert_eq!(b.translate_arg("/etc/passwd"), "/etc/passwd");
        assert_eq!(b.translate_arg(""), "");
    }

    #[test]
    fn host_to_container_round() {
        let b = bridge();
        assert_eq!(
            b.host_to_container(Path::new("/home/dev/proj/a/b.txt")),
            Some(PathBuf::from("/workspace/a/b.txt"))
        );
        assert_eq!(b.host_to_container(Path::new("/tmp/x")), None);
    }
}
