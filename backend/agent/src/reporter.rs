//! Progress hooks for an agent run.
//!
//! The loop narrates what it does through [`RunReporter`]; front-ends decide
//! how (or whether) to show it. Diagnostics go through `tracing` instead.

use devclaw_core::{Command, ToolResult, Usage};

pub trait RunReporter: Send + Sync {
    fn started(&self, _model: &str, _project: &str, _task: &str) {}
    fn step(&self, _step: usize, _max: usize) {}
    /// Streamed model text as it arrives.
    fn chunk(&self, _text: &str) {}
    fn reasoning(&self, _text: &str) {}
    /// A reply that carried no command.
    fn message(&self, _text: &str) {}
    fn parse_error(&self, _error: &str) {}
    fn command(&self, _command: &Command) {}
    fn result(&self, _command: &Command, _result: &ToolResult) {}
    fn retry(&self, _attempt: usize, _max: usize, _error: &str) {}
    fn completed(&self, _summary: &str) {}
    fn usage(&self, _usage: &Usage) {}
}

/// Reports nothing.
pub struct SilentReporter;

impl RunReporter for SilentReporter {}

/// `Token Usage: prompt=…, completion=…, total=…`
pub fn usage_line(usage: &Usage) -> String {
    format!(
        "Token Usage: prompt={}, completion={}, total={}",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
    )
}
