//! Shell execution on the host or inside the project container.

use async_trait::async_trait;
use devclaw_core::{
    combine_output, parse_args, truncate_middle, CancellationToken, Tool, ToolArgs, ToolResult,
    SHELL_OUTPUT_LIMIT, TRUNCATION_MARKER,
};
use devclaw_sandbox::{DockerError, DockerExecutor};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Wall-clock limit for one shell command.
pub const SHELL_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct ShellArgs {
    #[serde(default)]
    command: String,
}

/// Outcome of a direct `bash -c` run.
#[derive(Debug)]
enum ShellRun {
    Finished { output: String, exit_code: Option<i32> },
    TimedOut,
    Cancelled,
}

/// Runs `command` with `bash -c` in `workdir`, bounded by `timeout` and `cancel`.
async fn run_bash(
    command: &str,
    workdir: &std::path::Path,
    timeout: Duration,
    cancel: &CancellationToken,
) -> std::io::Result<ShellRun> {
    let child = Command::new("bash")
        .arg("-c")
        .arg(command)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    tokio::select! {
        out = child.wait_with_output() => {
            let out = out?;
            Ok(ShellRun::Finished {
                output: combine_output(
                    &String::from_utf8_lossy(&out.stdout),
                    &String::from_utf8_lossy(&out.stderr),
                ),
                exit_code: out.status.code(),
            })
        }
        _ = tokio::time::sleep(timeout) => Ok(ShellRun::TimedOut),
        _ = cancel.cancelled() => Ok(ShellRun::Cancelled),
    }
}

fn truncate_output(output: &str) -> String {
    truncate_middle(output, SHELL_OUTPUT_LIMIT, TRUNCATION_MARKER)
}

/// The `shell` tool. With a [`DockerExecutor`] attached, commands run inside
/// the project container; otherwise on the host in the workdir.
pub struct ShellTool {
    workdir: PathBuf,
    docker: Option<Arc<DockerExecutor>>,
    timeout: Duration,
}

impl ShellTool {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            docker: None,
            timeout: SHELL_TIMEOUT,
        }
    }

    pub fn with_docker(mut self, docker: Arc<DockerExecutor>) -> Self {
        self.docker = Some(docker);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn execute_direct(&self, command: &str, cancel: &CancellationToken) -> ToolResult {
        debug!(command = %command, "Running shell command on host");
        let run = match run_bash(command, &self.workdir, self.timeout, cancel).await {
            Ok(r) => r,
            Err(e) => return ToolResult::failure(format!("failed to start bash: {e}")),
        };
        match run {
            ShellRun::Finished { output, exit_code } => {
                let output = truncate_output(&output);
                match exit_code {
                    Some(0) if output.is_empty() => ToolResult::success("(no output)"),
                    Some(0) => ToolResult::success(output),
                    Some(code) => ToolResult::failure(format!("exit code: {code}\n{output}")),
                    None => ToolResult::failure(format!("exit code: terminated by signal\n{output}")),
                }
            }
            ShellRun::TimedOut => {
                warn!(command = %command, timeout_secs = self.timeout.as_secs(), "Shell command timed out");
                ToolResult::failure(format!("command timed out after {}s", self.timeout.as_secs()))
            }
            ShellRun::Cancelled => ToolResult::failure("command cancelled"),
        }
    }

    async fn execute_docker(
        &self,
        docker: &DockerExecutor,
        command: &str,
        cancel: &CancellationToken,
    ) -> ToolResult {
        debug!(command = %command, container = %docker.container_name(), "Running shell command in container");
        match docker.execute(command, cancel).await {
            Ok(out) => {
                let output = truncate_output(&out.output);
                if out.exit_code != 0 {
                    return ToolResult::failure(format!("[docker] exit code: {}\n{output}", out.exit_code));
                }
                if output.is_empty() {
                    ToolResult::success("(no output)")
                } else {
                    ToolResult::success(output)
                }
            }
            Err(DockerError::Timeout(t)) => {
                ToolResult::failure(format!("[docker] command timed out after {}s", t.as_secs()))
            }
            Err(e) => {
                info!(error = %e, "Container execution failed");
                ToolResult::failure(format!("[docker] {e}"))
            }
        }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    async fn execute(&self, args: &ToolArgs, cancel: &CancellationToken) -> ToolResult {
        let args: ShellArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(e),
        };
        if args.command.trim().is_empty() {
            return ToolResult::failure("empty command");
        }
        match &self.docker {
            Some(docker) => self.execute_docker(docker, &args.command, cancel).await,
            None => self.execute_direct(&args.command, cancel).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devclaw_config::DockerConfig;
    use devclaw_sandbox::FakeDockerCli;

    fn args(cmd: &str) -> ToolArgs {
        [("command".to_string(), cmd.to_string())].into_iter().collect()
    }

    #[tokio::test]
    async fn runs_in_workdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let res = ShellTool::new(dir.path())
            .execute(&args("ls"), &CancellationToken::new())
            .await;
        assert!(res.success);
        assert!(res.output.contains("marker.txt"));
    }

    #[tokio::test]
    async fn empty_output_and_empty_command() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ShellTool::new(dir.path());
        let cancel = CancellationToken::new();
        assert_eq!(tool.execute(&args("true"), &cancel).await.output, "(no output)");
        let res = tool.execute(&args("   "), &cancel).await;
        assert!(!res.success);
        assert_eq!(res.output, "empty command");
    }

    #[tokio::test]
    async fn non_zero_exit_reports_code_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let res = ShellTool::new(dir.path())
            .execute(&args("echo out; echo err >&2; exit 3"), &CancellationToken::new())
            .await;
        assert!(!res.success);
        assert_eq!(res.output, "exit code: 3\nout\n\n[stderr]\nerr\n");
    }

    #[tokio::test]
    async fn timeout_is_distinguishable() {
        let dir = tempfile::tempdir().unwrap();
        let res = ShellTool::new(dir.path())
            .with_timeout(Duration::from_millis(200))
            .execute(&args("sleep 5"), &CancellationToken::new())
            .await;
        assert!(!res.success);
        assert!(res.output.starts_with("command timed out after"));
    }

    #[tokio::test]
    async fn cancellation_stops_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let res = ShellTool::new(dir.path()).execute(&args("sleep 5"), &cancel).await;
        assert!(!res.success);
        assert_eq!(res.output, "command cancelled");
    }

    #[tokio::test]
    async fn long_output_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let res = ShellTool::new(dir.path())
            .execute(&args("head -c 40000 /dev/zero | tr '\\0' 'a'"), &CancellationToken::new())
            .await;
        assert!(res.success);
        assert!(res.output.contains("... (output truncated) ..."));
        assert!(res.output.len() < 16_100);
    }

    #[tokio::test]
    async fn docker_failures_are_prefixed() {
        let cli = Arc::new(FakeDockerCli::with_state("running").exec_reply(1, "", "boom"));
        let docker = Arc::new(DockerExecutor::with_cli("/proj", &DockerConfig::default(), cli));
        let res = ShellTool::new("/proj")
            .with_docker(docker)
            .execute(&args("make"), &CancellationToken::new())
            .await;
        assert!(!res.success);
        assert_eq!(res.output, "[docker] exit code: 1\n[stderr]\nboom");
    }

    #[tokio::test]
    async fn docker_lifecycle_error_is_tool_failure() {
        let cli = Arc::new(FakeDockerCli::new().failing("create"));
        let docker = Arc::new(DockerExecutor::with_cli("/proj", &DockerConfig::default(), cli));
        let res = ShellTool::new("/proj")
            .with_docker(docker)
            .execute(&args("ls"), &CancellationToken::new())
            .await;
        assert!(!res.success);
        assert!(res.output.starts_with("[docker] container lifecycle failed"));
    }
}
