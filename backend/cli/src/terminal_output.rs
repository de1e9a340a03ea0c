//! Terminal output: ANSI formatting, notes, and the run reporter that narrates
//! agent progress on stdout.

use std::io::Write;

use devclaw_agent::{usage_line, RunReporter};
use devclaw_core::{Command, ToolResult, Usage};

// ---------------------------------------------------------------------------
// ANSI Color/Style helpers
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

fn paint(color: &str, text: &str) -> String {
    if supports_color() {
        format!("{color}{text}{RESET}")
    } else {
        text.to_string()
    }
}

// ---------------------------------------------------------------------------
// Formatted notes
// ---------------------------------------------------------------------------

/// Print a formatted WARNING note.
pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

/// Print a formatted ERROR note.
pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// Write chunks to a writer, flushing after each.
pub fn stream_write(writer: &mut impl Write, chunk: &str) -> std::io::Result<()> {
    writer.write_all(chunk.as_bytes())?;
    writer.flush()
}

/// Cut `s` to at most `max` bytes on a char boundary, marking the cut.
pub fn truncate_display(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

// ---------------------------------------------------------------------------
// Run reporter
// ---------------------------------------------------------------------------

/// Narrates a run on stdout. `verbose` adds streamed model text, reasoning,
/// command arguments and successful outputs.
pub struct TerminalReporter {
    verbose: bool,
}

impl TerminalReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

fn status_icon(success: bool) -> &'static str {
    if success {
        "✅"
    } else {
        "❌"
    }
}

impl RunReporter for TerminalReporter {
    fn started(&self, model: &str, project: &str, task: &str) {
        println!("\n🤖 DevClaw started (model: {model})");
        println!("📁 Project: {project}");
        println!("📋 Task: {task}\n");
    }

    fn step(&self, step: usize, max: usize) {
        println!(
            "{}",
            paint(CYAN, &format!("━━━ Step {step}/{max} ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"))
        );
    }

    fn chunk(&self, text: &str) {
        if self.verbose {
            let _ = stream_write(&mut std::io::stdout(), text);
        }
    }

    fn reasoning(&self, text: &str) {
        if self.verbose {
            println!("\n💭 Thinking: {}\n", truncate_display(text, 500));
        }
    }

    fn message(&self, text: &str) {
        println!("💬 {}\n", truncate_display(text, 1000));
    }

    fn parse_error(&self, error: &str) {
        println!("⚠️  Parse error: {error}");
    }

    fn command(&self, command: &Command) {
        println!("🔧 Command: {}", paint(BOLD, &command.name));
        if !command.reason.is_empty() {
            println!("   Reason: {}", command.reason);
        }
        if self.verbose {
            let mut keys: Vec<&String> = command.args.keys().collect();
            keys.sort();
            for key in keys {
                println!("   {key}: {}", truncate_display(command.arg(key), 200));
            }
        }
    }

    fn result(&self, _command: &Command, result: &ToolResult) {
        println!("   Status: {}", status_icon(result.success));
        if self.verbose || !result.success {
            println!("   Output: {}", paint(DIM, &truncate_display(&result.output, 500)));
        }
        println!();
    }

    fn retry(&self, attempt: usize, max: usize, error: &str) {
        println!("⚠️  LLM error (attempt {attempt}/{max}): {error}");
    }

    fn completed(&self, summary: &str) {
        println!("\n{}", paint(GREEN, "✅ Task completed!"));
        println!("   {summary}");
    }

    fn usage(&self, usage: &Usage) {
        println!("\n📊 {}", usage_line(usage));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_display("short", 10), "short");
        assert_eq!(truncate_display("ééé", 3), "é...");
    }

    #[test]
    fn stream_write_flushes_chunks() {
        let mut buf = Vec::new();
        stream_write(&mut buf, "Hel").unwrap();
        stream_write(&mut buf, "lo").unwrap();
        assert_eq!(buf, b"Hello");
    }
}
