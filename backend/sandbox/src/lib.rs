//! `devclaw-sandbox` — safety policy and isolated execution for devclaw.
//!
//! - Shell command risk classification (block / approve / allow patterns)
//! - Path guard with symlink-aware deny list
//! - Policy engine gating every tool call
//! - Approval callbacks (terminal prompt or auto-deny)
//! - Persistent Docker container per project

pub mod analysis;
pub mod approval;
pub mod docker;
pub mod engine;
pub mod error;
pub mod fake;
pub mod fs_bridge;
pub mod path;
pub mod policy;

pub use analysis::{glob_like_to_regex, CommandRisk, ShellPolicy};
pub use approval::{approver_for, Approver, AutoDeny, TerminalApprover};
pub use docker::{
    container_name, docker_available, ContainerState, DockerCli, DockerExecutor, DockerOutput,
    ExecOutput, ProcessDockerCli, EXEC_TIMEOUT,
};
pub use engine::{CheckResult, Sandbox, Verdict, READ_ONLY_TOOLS};
pub use error::{DockerError, SandboxError};
pub use fake::FakeDockerCli;
pub use fs_bridge::{FsBridge, CONTAINER_WORKSPACE};
pub use path::{clean_path, expand_home, validate_path, PathPolicy, DEFAULT_PATH_DENY};
pub use policy::{Policy, SandboxMode};
