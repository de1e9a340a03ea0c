//! Sandbox policy engine: decides whether a tool call may run.

use crate::analysis::CommandRisk;
use crate::error::SandboxError;
use crate::path::validate_path;
use crate::policy::{Policy, SandboxMode};
use devclaw_core::{CancellationToken, ToolArgs};
use tracing::{debug, info, warn};

/// Tools whose `path` argument is checked by the path guard.
const PATH_TOOLS: &[&str] = &[
    "read_file",
    "write_file",
    "str_replace",
    "insert_line",
    "list_dir",
    "search_files",
    "grep",
];

/// Path tools where an empty path means the workdir.
const DEFAULT_DOT_TOOLS: &[&str] = &["list_dir", "search_files", "grep"];

/// Tools that never mutate anything.
pub const READ_ONLY_TOOLS: &[&str] = &["read_file", "list_dir", "search_files", "grep"];

/// Commands that are never gated once path-safe.
const UNGATED_TOOLS: &[&str] = &["done", "read_skill", "debug_code"];

const PROMPT_COMMAND_LIMIT: usize = 200;

/// Outcome of [`Sandbox::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub allow: bool,
    pub deny_reason: Option<SandboxError>,
    /// Prompt shown (or that would have been shown) to the user.
    pub approval_prompt: Option<String>,
}

impl CheckResult {
    fn allowed() -> Self {
        Self {
            allow: true,
            deny_reason: None,
            approval_prompt: None,
        }
    }

    fn denied(reason: SandboxError) -> Self {
        Self {
            allow: false,
            deny_reason: Some(reason),
            approval_prompt: None,
        }
    }

    fn unapproved(prompt: String) -> Self {
        Self {
            allow: false,
            deny_reason: Some(SandboxError::NeedsApproval),
            approval_prompt: Some(prompt),
        }
    }

    /// Text returned to the model on denial: the reason, then the prompt if any.
    pub fn denial_message(&self) -> String {
        let reason = self
            .deny_reason
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "blocked by sandbox policy".to_string());
        match &self.approval_prompt {
            Some(prompt) => format!("{reason}\n{}", prompt.trim_end()),
            None => reason,
        }
    }
}

/// Policy decision before any user interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(SandboxError),
    /// Needs the approver's consent; carries the prompt to show.
    Ask(String),
}

/// Evaluates tool calls against an immutable [`Policy`].
#[derive(Debug, Clone)]
pub struct Sandbox {
    policy: Policy,
}

impl Sandbox {
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Decide whether `tool` may run with `args`, asking the approver
    /// synchronously when needed.
    pub fn check(&self, tool: &str, args: &ToolArgs) -> CheckResult {
        match self.evaluate(tool, args) {
            Verdict::Allow => CheckResult::allowed(),
            Verdict::Deny(reason) => CheckResult::denied(reason),
            Verdict::Ask(prompt) => {
                let approved = self.policy.ask(&prompt);
                settle(prompt, approved)
            }
        }
    }

    /// Like [`Sandbox::check`], but the approver runs on its own thread and
    /// a cancelled token abandons the prompt as unapproved.
    pub async fn check_cancellable(
        &self,
        tool: &str,
        args: &ToolArgs,
        cancel: &CancellationToken,
    ) -> CheckResult {
        let prompt = match self.evaluate(tool, args) {
            Verdict::Allow => return CheckResult::allowed(),
            Verdict::Deny(reason) => return CheckResult::denied(reason),
            Verdict::Ask(prompt) => prompt,
        };
        let Some(approver) = self.policy.approver.clone() else {
            return settle(prompt, false);
        };

        let (tx, rx) = tokio::sync::oneshot::channel();
        let question = prompt.clone();
        let spawned = std::thread::Builder::new()
            .name("devclaw-approval".into())
            .spawn(move || {
                let _ = tx.send(approver.approve(&question));
            });
        if let Err(e) = spawned {
            warn!(error = %e, "Cannot start approval prompt; denying");
            return settle(prompt, false);
        }

        tokio::select! {
            answer = rx => settle(prompt, answer.unwrap_or(false)),
            _ = cancel.cancelled() => {
                warn!(tool = %tool, "Approval prompt abandoned by cancellation");
                CheckResult::unapproved(prompt)
            }
        }
    }

    /// Policy decision without consulting the approver.
    pub fn evaluate(&self, tool: &str, args: &ToolArgs) -> Verdict {
        let policy = &self.policy;

        if PATH_TOOLS.contains(&tool) {
            let mut path = args.get("path").map(String::as_str).unwrap_or("");
            if path.is_empty() && DEFAULT_DOT_TOOLS.contains(&tool) {
                path = ".";
            }
            if !path.is_empty() {
                if let Err(e) = validate_path(&policy.workdir, path, &policy.paths) {
                    warn!(tool = %tool, path = %path, reason = %e, "Path rejected by sandbox");
                    return Verdict::Deny(SandboxError::Blocked(e.to_string()));
                }
            }
        }

        if policy.mode == SandboxMode::Strict && READ_ONLY_TOOLS.contains(&tool) {
            return Verdict::Allow;
        }

        if tool == "shell" {
            return self.evaluate_shell(args.get("command").map(String::as_str).unwrap_or(""));
        }

        if policy.mode == SandboxMode::Strict
            && !READ_ONLY_TOOLS.contains(&tool)
            && !UNGATED_TOOLS.contains(&tool)
        {
            let path = args.get("path").map(String::as_str).unwrap_or("");
            let prompt = format!("⚠️  Agent wants to run: {tool} (path: {path})\n   Allow? [y/N]: ");
            return Verdict::Ask(prompt);
        }

        Verdict::Allow
    }

    fn evaluate_shell(&self, command: &str) -> Verdict {
        if command.trim().is_empty() {
            return Verdict::Deny(SandboxError::Blocked("empty command".into()));
        }

        let mode = self.policy.mode;
        let risk = self.policy.shell.evaluate(command);
        debug!(risk = %risk.label(), mode = %mode, "Shell command classified");

        let needs_approval = match risk {
            CommandRisk::Block => {
                warn!(command = %command, "Blocked dangerous shell command");
                return Verdict::Deny(SandboxError::Blocked("dangerous command".into()));
            }
            CommandRisk::High => mode != SandboxMode::Permissive,
            CommandRisk::Medium => mode == SandboxMode::Strict,
            CommandRisk::Low => false,
        };
        if !needs_approval {
            return Verdict::Allow;
        }

        let prompt = format!(
            "⚠️  Agent wants to execute: {}\n   Risk: {}\n   Allow? [y/N]: ",
            truncate_for_prompt(command, PROMPT_COMMAND_LIMIT),
            risk.label()
        );
        Verdict::Ask(prompt)
    }
}

fn settle(prompt: String, approved: bool) -> CheckResult {
    if approved {
        info!("Operation approved by user");
        CheckResult::allowed()
    } else {
        CheckResult::unapproved(prompt)
    }
}

fn truncate_for_prompt(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::Approver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn args(pairs: &[(&str, &str)]) -> ToolArgs {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn sandbox(mode: SandboxMode, answer: bool) -> Sandbox {
        Sandbox::new(
            Policy::new("/proj", mode).with_approver(Arc::new(move |_: &str| answer)),
        )
    }

    struct Counting(AtomicUsize);

    impl Approver for Counting {
        fn approve(&self, _prompt: &str) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[test]
    fn blocked_command_denied_in_every_mode() {
        for mode in [SandboxMode::Permissive, SandboxMode::Normal, SandboxMode::Strict] {
            let counter = Arc::new(Counting(AtomicUsize::new(0)));
            let sb = Sandbox::new(Policy::new("/proj", mode).with_approver(counter.clone()));
            let res = sb.check("shell", &args(&[("command", "rm -rf /")]));
            assert!(!res.allow, "{mode}");
            assert_eq!(
                res.deny_reason,
                Some(SandboxError::Blocked("dangerous command".into()))
            );
            assert_eq!(counter.0.load(Ordering::SeqCst), 0, "approver never consulted");
        }
    }

    #[test]
    fn high_risk_approved_in_normal_mode() {
        let res = sandbox(SandboxMode::Normal, true).check("shell", &args(&[("command", "rm -rf dist/")]));
        assert!(res.allow);
    }

    #[test]
    fn high_risk_refused_carries_prompt() {
        let res = sandbox(SandboxMode::Normal, false).check("shell", &args(&[("command", "git push origin main")]));
        assert!(!res.allow);
        assert_eq!(res.deny_reason, Some(SandboxError::NeedsApproval));
        let prompt = res.approval_prompt.as_deref().unwrap();
        assert!(prompt.contains("git push origin main"));
        assert!(prompt.contains("Risk: HIGH"));
        assert!(res.denial_message().starts_with("operation requires user approval\n"));
    }

    #[test]
    fn refused_result_clones_with_reason_and_prompt() {
        let res = sandbox(SandboxMode::Strict, false).check("write_file", &args(&[("path", "a.txt")]));
        let copy = res.clone();
        assert_eq!(copy, res);
        assert_eq!(copy.deny_reason, Some(SandboxError::NeedsApproval));
        assert_eq!(copy.denial_message(), res.denial_message());
    }

    #[test]
    fn high_risk_allowed_in_permissive_without_asking() {
        let res = sandbox(SandboxMode::Permissive, false).check("shell", &args(&[("command", "rm -rf dist/")]));
        assert!(res.allow);
    }

    #[test]
    fn empty_shell_command_denied() {
        let res = sandbox(SandboxMode::Permissive, true).check("shell", &args(&[("command", "  ")]));
        assert!(!res.allow);
        assert!(res.denial_message().contains("empty command"));
    }

    #[test]
    fn path_escape_denied_before_anything_else() {
        let res = sandbox(SandboxMode::Permissive, true)
            .check("read_file", &args(&[("path", "../../etc/passwd")]));
        assert!(!res.allow);
        let msg = res.denial_message();
        assert!(msg.starts_with("blocked by sandbox policy: "), "{msg}");
        assert!(msg.contains("escapes"), "{msg}");
    }

    #[test]
    fn strict_mode_gates_mutations_but_not_reads() {
        let sb = sandbox(SandboxMode::Strict, false);
        assert!(sb.check("read_file", &args(&[("path", "src/lib.rs")])).allow);
        assert!(sb.check("list_dir", &args(&[])).allow);
        assert!(sb.check("done", &args(&[("summary", "ok")])).allow);

        let res = sb.check("write_file", &args(&[("path", "a.txt"), ("content", "x")]));
        assert!(!res.allow);
        assert_eq!(
            res.approval_prompt.as_deref(),
            Some("⚠️  Agent wants to run: write_file (path: a.txt)\n   Allow? [y/N]: ")
        );

        assert!(sandbox(SandboxMode::Strict, true)
            .check("write_file", &args(&[("path", "a.txt")]))
            .allow);
    }

    #[test]
    fn normal_mode_allows_mutations_and_plain_shell() {
        let sb = sandbox(SandboxMode::Normal, false);
        assert!(sb.check("write_file", &args(&[("path", "a.txt")])).allow);
        assert!(sb.check("shell", &args(&[("command", "cargo test")])).allow);
    }

    /// Never answers until the sender side is dropped.
    struct Silent(std::sync::Mutex<std::sync::mpsc::Receiver<()>>);

    impl Approver for Silent {
        fn approve(&self, _prompt: &str) -> bool {
            if let Ok(rx) = self.0.lock() {
                let _ = rx.recv();
            }
            true
        }
    }

    #[test]
    fn evaluate_reports_pending_prompt_without_asking() {
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let sb = Sandbox::new(Policy::new("/proj", SandboxMode::Normal).with_approver(counter.clone()));
        match sb.evaluate("shell", &args(&[("command", "git push origin main")])) {
            Verdict::Ask(prompt) => assert!(prompt.contains("Risk: HIGH")),
            other => panic!("unexpected verdict {other:?}"),
        }
        assert_eq!(sb.evaluate("shell", &args(&[("command", "ls")])), Verdict::Allow);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellable_check_uses_approver_answer() {
        let cancel = CancellationToken::new();
        let cmd = args(&[("command", "rm -rf dist/")]);
        assert!(sandbox(SandboxMode::Normal, true).check_cancellable("shell", &cmd, &cancel).await.allow);
        let res = sandbox(SandboxMode::Normal, false).check_cancellable("shell", &cmd, &cancel).await;
        assert_eq!(res.deny_reason, Some(SandboxError::NeedsApproval));
        let res = Sandbox::new(Policy::new("/proj", SandboxMode::Normal))
            .check_cancellable("shell", &cmd, &cancel)
            .await;
        assert!(!res.allow);
    }

    #[tokio::test]
    async fn cancellation_abandons_pending_approval() {
        let (hold, rx) = std::sync::mpsc::channel::<()>();
        let sb = Sandbox::new(
            Policy::new("/proj", SandboxMode::Normal).with_approver(Arc::new(Silent(std::sync::Mutex::new(rx)))),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let res = sb
            .check_cancellable("shell", &args(&[("command", "git push origin main")]), &cancel)
            .await;
        assert!(!res.allow);
        assert_eq!(res.deny_reason, Some(SandboxError::NeedsApproval));
        assert!(res.approval_prompt.is_some());
        drop(hold);
    }

    #[test]
    fn long_commands_truncated_in_prompt() {
        let cmd = format!("rm -rf {}", "x".repeat(400));
        let res = sandbox(SandboxMode::Normal, false).check("shell", &args(&[("command", &cmd)]));
        let prompt = res.approval_prompt.unwrap();
        assert!(prompt.contains("..."));
        assert!(prompt.len() < 300);
    }
}
