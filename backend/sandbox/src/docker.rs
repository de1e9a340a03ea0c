//! Docker-based isolated execution: one persistent container per project.
//!
//! The container name is derived from the working directory, so running the
//! agent again on the same project reuses (and restarts) the same container.

use crate::error::DockerError;
use crate::fs_bridge::CONTAINER_WORKSPACE;
use crate::path::expand_home;
use async_trait::async_trait;
use devclaw_config::defaults::{DEFAULT_CPUS, DEFAULT_IMAGE, DEFAULT_MEMORY, DEFAULT_NETWORK};
use devclaw_config::{DockerConfig, MountConfig};
use devclaw_core::{combine_output, CancellationToken};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const CONTAINER_PREFIX: &str = "devclaw-";

/// Default wall-clock limit for a command run inside the container.
pub const EXEC_TIMEOUT: Duration = Duration::from_secs(300);

const CREATE_TIMEOUT: Duration = Duration::from_secs(120);
const START_TIMEOUT: Duration = Duration::from_secs(30);
const STOP_TIMEOUT: Duration = Duration::from_secs(10);
const INSPECT_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Docker CLI seam
// ---------------------------------------------------------------------------

/// Raw result of one `docker` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockerOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl DockerOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs `docker <args>`.
#[async_trait]
pub trait DockerCli: Send + Sync {
    async fn run(
        &self,
        args: &[String],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<DockerOutput, DockerError>;
}

/// Shells out to the `docker` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessDockerCli;

#[async_trait]
impl DockerCli for ProcessDockerCli {
    async fn run(
        &self,
        args: &[String],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<DockerOutput, DockerError> {
        debug!(args = ?args, "docker");
        let child = tokio::process::Command::new("docker")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DockerError::Unavailable(format!("failed to spawn docker: {e}")))?;

        // Dropping the wait future kills the child.
        tokio::select! {
            out = child.wait_with_output() => {
                let out = out.map_err(|e| DockerError::Unavailable(e.to_string()))?;
                Ok(DockerOutput {
                    status: out.status.code(),
                    stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                })
            }
            _ = tokio::time::sleep(timeout) => Err(DockerError::Timeout(timeout)),
            _ = cancel.cancelled() => Err(DockerError::Cancelled),
        }
    }
}

/// Check whether a Docker daemon is reachable (`docker info`, 5 s limit).
pub async fn docker_available() -> bool {
    docker_available_with(&ProcessDockerCli).await
}

pub async fn docker_available_with(cli: &dyn DockerCli) -> bool {
    let args = vec!["info".to_string()];
    match cli.run(&args, INSPECT_TIMEOUT, &CancellationToken::new()).await {
        Ok(out) if out.success() => true,
        Ok(out) => {
            debug!(stderr = %out.stderr.trim(), "docker info failed");
            false
        }
        Err(e) => {
            debug!(error = %e, "docker not available");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Container lifecycle
// ---------------------------------------------------------------------------

/// Observed container state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Absent,
    Created,
    Running,
    Stopped,
    /// Anything the inspector reported that we don't recognise.
    Unknown(String),
}

impl ContainerState {
    fn from_status(status: &str) -> Self {
        match status.trim() {
            "running" => ContainerState::Running,
            "created" => ContainerState::Created,
            "exited" => ContainerState::Stopped,
            "" => ContainerState::Absent,
            other => ContainerState::Unknown(other.to_string()),
        }
    }
}

/// Result of a command run inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Combined stdout and `[stderr]` section.
    pub output: String,
    pub exit_code: i32,
}

/// Persistent per-project container.
pub struct DockerExecutor {
    image: String,
    workdir: PathBuf,
    network: String,
    memory: String,
    cpus: String,
    extra_mounts: Vec<MountConfig>,
    timeout: Duration,
    container_name: String,
    cli: Arc<dyn DockerCli>,
    lifecycle: Mutex<()>,
}

impl DockerExecutor {
    /// Executor for `workdir` using the real `docker` binary.
    pub fn new(workdir: impl Into<PathBuf>, config: &DockerConfig) -> Self {
        Self::with_cli(workdir, config, Arc::new(ProcessDockerCli))
    }

    pub fn with_cli(workdir: impl Into<PathBuf>, config: &DockerConfig, cli: Arc<dyn DockerCli>) -> Self {
        let workdir = workdir.into();
        let container_name = container_name(&workdir);
        Self {
            image: or_default(&config.image, DEFAULT_IMAGE),
            network: or_default(&config.network, DEFAULT_NETWORK),
            memory: or_default(&config.memory, DEFAULT_MEMORY),
            cpus: or_default(&config.cpus, DEFAULT_CPUS),
            extra_mounts: config.extra_mounts.clone(),
            timeout: EXEC_TIMEOUT,
            container_name,
            workdir,
            cli,
            lifecycle: Mutex::new(()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Arguments for `docker create`.
    pub fn create_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "create",
            "--name",
            self.container_name.as_str(),
            "--network",
            self.network.as_str(),
            "--memory",
            self.memory.as_str(),
            "--cpus",
            self.cpus.as_str(),
            "--security-opt",
            "no-new-privileges",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push("-v".into());
        args.push(format!("{}:{CONTAINER_WORKSPACE}", self.workdir.display()));
        args.push("-w".into());
        args.push(CONTAINER_WORKSPACE.into());

        for mount in &self.extra_mounts {
            let Some(source) = expand_home(&mount.source) else {
                continue;
            };
            let mut spec = format!("{}:{}", source.display(), mount.target);
            if mount.readonly {
                spec.push_str(":ro");
            }
            args.push("-v".into());
            args.push(spec);
        }

        args.push(self.image.clone());
        args.push("sleep".into());
        args.push("infinity".into());
        args
    }

    /// Current container state. Inspect failures mean the container is absent.
    pub async fn state(&self, cancel: &CancellationToken) -> Result<ContainerState, DockerError> {
        let args = strings(&["inspect", "-f", "{{.State.Status}}", self.container_name.as_str()]);
        match self.cli.run(&args, INSPECT_TIMEOUT, cancel).await {
            Ok(out) if out.success() => Ok(ContainerState::from_status(&out.stdout)),
            Ok(_) => Ok(ContainerState::Absent),
            Err(DockerError::Cancelled) => Err(DockerError::Cancelled),
            Err(e) => {
                debug!(error = %e, "docker inspect failed; treating container as absent");
                Ok(ContainerState::Absent)
            }
        }
    }

    /// Make sure the container exists and is running.
    #[instrument(skip(self, cancel), fields(container = %self.container_name))]
    pub async fn ensure_running(&self, cancel: &CancellationToken) -> Result<(), DockerError> {
        let _guard = self.lifecycle.lock().await;

        match self.state(cancel).await? {
            ContainerState::Running => Ok(()),
            ContainerState::Created | ContainerState::Stopped => self.start(cancel).await,
            ContainerState::Absent => {
                self.create(cancel).await?;
                self.start(cancel).await
            }
            ContainerState::Unknown(status) => {
                warn!(status = %status, "Unexpected container state; recreating");
                if let Err(e) = self.remove(cancel).await {
                    debug!(error = %e, "Removing container before recreate failed");
                }
                self.create(cancel).await?;
                self.start(cancel).await
            }
        }
    }

    /// Run `command` via `bash -c` inside the container.
    pub async fn execute(&self, command: &str, cancel: &CancellationToken) -> Result<ExecOutput, DockerError> {
        self.ensure_running(cancel).await?;

        let args = strings(&[
            "exec",
            "-w",
            CONTAINER_WORKSPACE,
            self.container_name.as_str(),
            "bash",
            "-c",
            command,
        ]);
        let out = self.cli.run(&args, self.timeout, cancel).await?;
        Ok(ExecOutput {
            output: combine_output(&out.stdout, &out.stderr),
            exit_code: out.status.unwrap_or(-1),
        })
    }

    /// Stop the container without removing it.
    pub async fn stop(&self) {
        let _guard = self.lifecycle.lock().await;
        let args = strings(&["stop", self.container_name.as_str()]);
        match self.cli.run(&args, STOP_TIMEOUT, &CancellationToken::new()).await {
            Ok(out) if out.success() => info!(container = %self.container_name, "Container stopped"),
            Ok(out) => debug!(stderr = %out.stderr.trim(), "docker stop failed"),
            Err(e) => debug!(error = %e, "docker stop failed"),
        }
    }

    /// Force-remove the container.
    pub async fn cleanup(&self) {
        let _guard = self.lifecycle.lock().await;
        if let Err(e) = self.remove(&CancellationToken::new()).await {
            debug!(error = %e, "docker rm failed");
        } else {
            info!(container = %self.container_name, "Container removed");
        }
    }

    async fn create(&self, cancel: &CancellationToken) -> Result<(), DockerError> {
        info!(container = %self.container_name, image = %self.image, "Creating container");
        let out = self.cli.run(&self.create_args(), CREATE_TIMEOUT, cancel).await?;
        if !out.success() {
            return Err(DockerError::Lifecycle(format!(
                "docker create failed: {}",
                out.stderr.trim()
            )));
        }
        Ok(())
    }

    async fn start(&self, cancel: &CancellationToken) -> Result<(), DockerError> {
        info!(container = %self.container_name, "Starting container");
        let args = strings(&["start", self.container_name.as_str()]);
        let out = self.cli.run(&args, START_TIMEOUT, cancel).await?;
        if !out.success() {
            return Err(DockerError::Lifecycle(format!(
                "docker start failed: {}",
                out.stderr.trim()
            )));
        }
        Ok(())
    }

    async fn remove(&self, cancel: &CancellationToken) -> Result<(), DockerError> {
        let args = strings(&["rm", "-f", self.container_name.as_str()]);
        let out = self.cli.run(&args, STOP_TIMEOUT, cancel).await?;
        if !out.success() {
            return Err(DockerError::Lifecycle(format!(
                "docker rm failed: {}",
                out.stderr.trim()
            )));
        }
        Ok(())
    }
}

/// `devclaw-` followed by 12 hex chars of sha256(workdir).
pub fn container_name(workdir: &Path) -> String {
    let digest = Sha256::digest(workdir.to_string_lossy().as_bytes());
    format!("{CONTAINER_PREFIX}{}", hex::encode(&digest[..6]))
}

fn or_default(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn strings(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
