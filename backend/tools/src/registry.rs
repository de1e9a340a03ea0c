//! Name-keyed tool registry with container path translation and the
//! sandbox gate in front of every handler.

use crate::{
    DoneTool, GrepTool, InsertLineTool, ListDirTool, ReadFileTool, ReadSkillTool, SearchFilesTool,
    ShellTool, Skill, StrReplaceTool, WriteFileTool,
};
use devclaw_core::{CancellationToken, Tool, ToolArgs, ToolResult};
use devclaw_sandbox::{DockerExecutor, FsBridge, Sandbox};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Tools whose `path` argument is rewritten from the container view.
const PATH_TOOLS: &[&str] = &[
    "read_file",
    "write_file",
    "str_replace",
    "insert_line",
    "list_dir",
    "search_files",
    "grep",
];

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    sandbox: Option<Arc<Sandbox>>,
    bridge: Option<FsBridge>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every standard tool for `workdir`. Shell commands run in
    /// `docker` when given; `read_skill` is added when `skills` is non-empty.
    pub fn with_defaults(
        workdir: impl Into<PathBuf>,
        docker: Option<Arc<DockerExecutor>>,
        skills: Vec<Skill>,
    ) -> Self {
        let workdir = workdir.into();
        let mut reg = Self::new();
        reg.register(Arc::new(ReadFileTool::new(&workdir)));
        reg.register(Arc::new(WriteFileTool::new(&workdir)));
        reg.register(Arc::new(ListDirTool::new(&workdir)));
        reg.register(Arc::new(SearchFilesTool::new(&workdir)));
        reg.register(Arc::new(GrepTool::new(&workdir)));
        reg.register(Arc::new(StrReplaceTool::new(&workdir)));
        reg.register(Arc::new(InsertLineTool::new(&workdir)));
        reg.register(Arc::new(DoneTool));

        let shell = ShellTool::new(&workdir);
        match docker {
            Some(docker) => {
                reg.bridge = Some(FsBridge::for_workspace(&workdir));
                reg.register(Arc::new(shell.with_docker(docker)));
            }
            None => reg.register(Arc::new(shell)),
        }

        if !skills.is_empty() {
            reg.register(Arc::new(ReadSkillTool::new(skills)));
        }
        reg
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Gate every call through `sandbox`.
    pub fn set_sandbox(&mut self, sandbox: Arc<Sandbox>) {
        self.sandbox = Some(sandbox);
    }

    /// Rewrite container paths in path arguments using `bridge`.
    pub fn set_bridge(&mut self, bridge: FsBridge) {
        self.bridge = Some(bridge);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up, translate, gate, then run.
    #[instrument(skip(self, args, cancel))]
    pub async fn execute(&self, name: &str, args: &ToolArgs, cancel: &CancellationToken) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            return ToolResult::failure(format!("unknown command: {name}"));
        };

        let args = self.translate(name, args);

        if let Some(sandbox) = &self.sandbox {
            let check = sandbox.check_cancellable(name, &args, cancel).await;
            if !check.allow {
                let message = check.denial_message();
                warn!(tool = %name, reason = %message, "Tool call denied by sandbox");
                return ToolResult::failure(message);
            }
        }

        debug!(tool = %name, "Executing tool");
        tool.execute(&args, cancel).await
    }

    fn translate(&self, name: &str, args: &ToolArgs) -> ToolArgs {
        let mut args = args.clone();
        if let Some(bridge) = &self.bridge {
            if PATH_TOOLS.contains(&name) {
                if let Some(path) = args.get_mut("path") {
                    *path = bridge.translate_arg(path);
                }
            }
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use devclaw_sandbox::{Policy, SandboxMode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records the arguments it was called with.
    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        calls: AtomicUsize,
        last: Mutex<Option<ToolArgs>>,
    }

    #[async_trait]
    impl Tool for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self, args: &ToolArgs, _cancel: &CancellationToken) -> ToolResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(args.clone());
            ToolResult::success("ran")
        }
    }

    fn args(pairs: &[(&str, &str)]) -> ToolArgs {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn recorder(name: &'static str) -> Arc<Recorder> {
        Arc::new(Recorder {
            name,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn unknown_command() {
        let reg = ToolRegistry::new();
        let res = reg.execute("fly", &ToolArgs::new(), &CancellationToken::new()).await;
        assert_eq!(res, ToolResult::failure("unknown command: fly"));
    }

    #[tokio::test]
    async fn escape_denied_before_handler_runs() {
        let read = recorder("read_file");
        let mut reg = ToolRegistry::new();
        reg.register(read.clone());
        reg.set_sandbox(Arc::new(Sandbox::new(Policy::new("/proj", SandboxMode::Normal))));

        let res = reg
            .execute("read_file", &args(&[("path", "../../etc/passwd")]), &CancellationToken::new())
            .await;
        assert!(!res.success);
        assert!(res.output.contains("escapes"), "{}", res.output);
        assert_eq!(read.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unapproved_shell_returns_prompt_text() {
        let shell = recorder("shell");
        let mut reg = ToolRegistry::new();
        reg.register(shell.clone());
        reg.set_sandbox(Arc::new(Sandbox::new(Policy::new("/proj", SandboxMode::Normal))));

        let res = reg
            .execute("shell", &args(&[("command", "git push origin main")]), &CancellationToken::new())
            .await;
        assert!(!res.success);
        assert!(res.output.contains("operation requires user approval"));
        assert!(res.output.contains("Allow? [y/N]:"));
        assert_eq!(shell.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn container_paths_translated_before_check() {
        let read = recorder("read_file");
        let shell = recorder("shell");
        let mut reg = ToolRegistry::new();
        reg.register(read.clone());
        reg.register(shell.clone());
        reg.set_bridge(FsBridge::for_workspace("/proj"));
        reg.set_sandbox(Arc::new(Sandbox::new(Policy::new("/proj", SandboxMode::Normal))));
        let cancel = CancellationToken::new();

        let res = reg.execute("read_file", &args(&[("path", "/workspace/src/a.rs")]), &cancel).await;
        assert!(res.success, "{}", res.output);
        let seen = read.last.lock().unwrap().clone().unwrap();
        assert_eq!(seen["path"], "/proj/src/a.rs");

        reg.execute("read_file", &args(&[("path", "src/b.rs")]), &cancel).await;
        let seen = read.last.lock().unwrap().clone().unwrap();
        assert_eq!(seen["path"], "src/b.rs");

        // Shell command strings are never rewritten.
        reg.execute("shell", &args(&[("command", "cat /workspace/a")]), &cancel).await;
        let seen = shell.last.lock().unwrap().clone().unwrap();
        assert_eq!(seen["command"], "cat /workspace/a");
    }

    #[tokio::test]
    async fn approved_shell_reaches_handler() {
        let shell = recorder("shell");
        let mut reg = ToolRegistry::new();
        reg.register(shell.clone());
        let policy = Policy::new("/proj", SandboxMode::Normal).with_approver(Arc::new(|_: &str| true));
        reg.set_sandbox(Arc::new(Sandbox::new(policy)));

        let res = reg
            .execute("shell", &args(&[("command", "git push origin main")]), &CancellationToken::new())
            .await;
        assert!(res.success);
        assert_eq!(shell.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn defaults_register_read_skill_only_with_skills() {
        let reg = ToolRegistry::with_defaults("/proj", None, Vec::new());
        assert_eq!(
            reg.list(),
            vec![
                "done",
                "grep",
                "insert_line",
                "list_dir",
                "read_file",
                "search_files",
                "shell",
                "str_replace",
                "write_file"
            ]
        );
        assert!(reg.get("read_skill").is_none());
    }
}
