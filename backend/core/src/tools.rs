use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Flat string-keyed argument bag as emitted by the model.
pub type ToolArgs = HashMap<String, String>;

/// Outcome of a single tool invocation.
///
/// A failed result never aborts the agent loop; it becomes the next observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Convert the model's string map into a typed per-tool argument struct.
///
/// Missing keys fall back to the struct's `#[serde(default)]` values.
pub fn parse_args<T: DeserializeOwned>(args: &ToolArgs) -> Result<T, String> {
    let value = serde_json::to_value(args).map_err(|e| format!("invalid arguments: {e}"))?;
    serde_json::from_value(value).map_err(|e| format!("invalid arguments: {e}"))
}

/// Byte ceiling for shell and container command output.
pub const SHELL_OUTPUT_LIMIT: usize = 16_000;

/// Separator placed between the kept head and tail of truncated output.
pub const TRUNCATION_MARKER: &str = "\n\n... (output truncated) ...\n\n";

/// Join stdout and stderr the way shell observations present them:
/// stdout first, then a `[stderr]` section when stderr is non-empty.
pub fn combine_output(stdout: &str, stderr: &str) -> String {
    let mut out = String::with_capacity(stdout.len() + stderr.len() + 10);
    out.push_str(stdout);
    if !stderr.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("[stderr]\n");
        out.push_str(stderr);
    }
    out
}

/// Keep the head and tail of `text` within `max_bytes`, joined by `marker`.
///
/// Split points are moved onto UTF-8 character boundaries.
pub fn truncate_middle(text: &str, max_bytes: usize, marker: &str) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let half = max_bytes / 2;
    let head_end = floor_char_boundary(text, half);
    let tail_start = ceil_char_boundary(text, text.len() - half);
    format!("{}{}{}", &text[..head_end], marker, &text[tail_start..])
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, mut index: usize) -> usize {
    while index < s.len() && !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct PathArgs {
        #[serde(default)]
        path: String,
    }

    #[test]
    fn parse_args_fills_defaults() {
        let args = ToolArgs::new();
        let parsed: PathArgs = parse_args(&args).unwrap();
        assert_eq!(parsed.path, "");
    }

    #[test]
    fn combine_output_sections() {
        assert_eq!(combine_output("out\n", ""), "out\n");
        assert_eq!(combine_output("", "err"), "[stderr]\nerr");
        assert_eq!(combine_output("out", "err"), "out\n[stderr]\nerr");
        assert_eq!(combine_output("", ""), "");
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_middle("abc", 10, "..."), "abc");
    }

    #[test]
    fn truncate_keeps_head_and_tail() {
        let text = format!("{}{}", "a".repeat(100), "b".repeat(100));
        let out = truncate_middle(&text, 20, "|cut|");
        assert!(out.starts_with("aaaaaaaaaa|cut|"));
        assert!(out.ends_with("bbbbbbbbbb"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "é".repeat(50);
        let out = truncate_middle(&text, 11, "~");
        assert!(out.contains('~'));
        assert!(out.chars().filter(|c| *c == 'é').count() > 0);
    }
}
