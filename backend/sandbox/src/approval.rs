//! Approval callbacks injected into the policy.
//!
//! The policy engine never decides *how* to ask; it hands a prompt to an
//! [`Approver`] and acts on the boolean answer.

use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::warn;

/// Answers an approval prompt.
pub trait Approver: Send + Sync {
    fn approve(&self, prompt: &str) -> bool;
}

impl<F> Approver for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn approve(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Prints the prompt on stdout and reads a y/N answer from stdin.
pub struct TerminalApprover;

impl Approver for TerminalApprover {
    fn approve(&self, prompt: &str) -> bool {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        ask(prompt, &mut stdin.lock(), &mut stdout)
    }
}

/// Denies every request, logging what was refused. Used for one-shot runs.
pub struct AutoDeny;

impl Approver for AutoDeny {
    fn approve(&self, prompt: &str) -> bool {
        warn!(action = %prompt.trim(), "Approval required in non-interactive mode; denying");
        false
    }
}

/// Pick the approver for the run mode.
pub fn approver_for(interactive: bool) -> Arc<dyn Approver> {
    if interactive {
        Arc::new(TerminalApprover)
    } else {
        Arc::new(AutoDeny)
    }
}

fn ask<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> bool {
    if write!(output, "{prompt}").and_then(|_| output.flush()).is_err() {
        return false;
    }
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => false,
        Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
    }
}
