//! In-place edits: unique-substring replace and line-anchored insert.

use crate::file::resolve_path;
use async_trait::async_trait;
use devclaw_core::{parse_args, CancellationToken, Tool, ToolArgs, ToolResult};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;

const PREVIEW_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct ReplaceArgs {
    #[serde(default)]
    path: String,
    #[serde(default)]
    old_str: String,
    #[serde(default)]
    new_str: String,
}

#[derive(Debug, Deserialize)]
struct InsertArgs {
    #[serde(default)]
    path: String,
    #[serde(default)]
    after: String,
    #[serde(default)]
    content: String,
}

/// Replaces `old_str` with `new_str`; `old_str` must occur exactly once.
pub struct StrReplaceTool {
    workdir: PathBuf,
}

impl StrReplaceTool {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: workdir.into() }
    }
}

#[async_trait]
impl Tool for StrReplaceTool {
    fn name(&self) -> &str {
        "str_replace"
    }

    async fn execute(&self, args: &ToolArgs, _cancel: &CancellationToken) -> ToolResult {
        let args: ReplaceArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(e),
        };
        if args.old_str.is_empty() {
            return ToolResult::failure("old_str cannot be empty");
        }
        let path = resolve_path(&self.workdir, &args.path);

        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => return ToolResult::failure(format!("read error: {e}")),
        };

        match content.matches(args.old_str.as_str()).count() {
            0 => {
                return ToolResult::failure(format!(
                    "old_str not found in {}. Searched for:\n{}",
                    path.display(),
                    preview(&args.old_str)
                ))
            }
            1 => {}
            n => {
                return ToolResult::failure(format!(
                    "old_str found {n} times in {}. Provide a more unique string to match exactly once.",
                    path.display()
                ))
            }
        }

        let updated = content.replacen(args.old_str.as_str(), &args.new_str, 1);
        if let Err(e) = fs::write(&path, updated.as_bytes()).await {
            return ToolResult::failure(format!("write error: {e}"));
        }
        ToolResult::success(format!(
            "Replaced in {} ({} bytes -> {} bytes)",
            path.display(),
            content.len(),
            updated.len()
        ))
    }
}

/// Inserts `content` after the first line equal (trimmed) to `after`.
pub struct InsertLineTool {
    workdir: PathBuf,
}

impl InsertLineTool {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: workdir.into() }
    }
}

#[async_trait]
impl Tool for InsertLineTool {
    fn name(&self) -> &str {
        "insert_line"
    }

    async fn execute(&self, args: &ToolArgs, _cancel: &CancellationToken) -> ToolResult {
        let args: InsertArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(e),
        };
        if args.after.is_empty() {
            return ToolResult::failure("after (the line after which to insert) cannot be empty");
        }
        let path = resolve_path(&self.workdir, &args.path);

        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => return ToolResult::failure(format!("read error: {e}")),
        };

        let anchor = args.after.trim();
        let lines: Vec<&str> = content.split('\n').collect();
        let Some(pos) = lines.iter().position(|line| line.trim() == anchor) else {
            return ToolResult::failure(format!("line not found in {}: {}", path.display(), args.after));
        };

        let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 1);
        out.extend_from_slice(&lines[..=pos]);
        out.push(&args.content);
        out.extend_from_slice(&lines[pos + 1..]);

        if let Err(e) = fs::write(&path, out.join("\n")).await {
            return ToolResult::failure(format!("write error: {e}"));
        }
        ToolResult::success(format!("Inserted content after matching line in {}", path.display()))
    }
}

fn preview(s: &str) -> String {
    if s.len() <= PREVIEW_LIMIT {
        return s.to_string();
    }
    let mut end = PREVIEW_LIMIT;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> ToolArgs {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn replace_unique_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn a() {}\nfn b() {}\n").unwrap();
        let res = StrReplaceTool::new(dir.path())
            .execute(
                &args(&[("path", "a.rs"), ("old_str", "fn b()"), ("new_str", "fn c()")]),
                &CancellationToken::new(),
            )
            .await;
        assert!(res.success, "{}", res.output);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.rs")).unwrap(),
            "fn a() {}\nfn c() {}\n"
        );
    }

    #[tokio::test]
    async fn replace_rejects_empty_missing_and_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "x = 1\nx = 1\n").unwrap();
        let tool = StrReplaceTool::new(dir.path());
        let cancel = CancellationToken::new();

        let res = tool.execute(&args(&[("path", "a.rs"), ("old_str", "")]), &cancel).await;
        assert_eq!(res.output, "old_str cannot be empty");

        let res = tool.execute(&args(&[("path", "a.rs"), ("old_str", "y = 2")]), &cancel).await;
        assert!(!res.success);
        assert!(res.output.starts_with("old_str not found in"));
        assert!(res.output.contains("a.rs"));

        let res = tool.execute(&args(&[("path", "a.rs"), ("old_str", "x = 1")]), &cancel).await;
        assert!(!res.success);
        assert!(res.output.starts_with("old_str found 2 times"));
        // File untouched.
        assert_eq!(std::fs::read_to_string(dir.path().join("a.rs")).unwrap(), "x = 1\nx = 1\n");
    }

    #[tokio::test]
    async fn insert_after_first_trimmed_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m.py"), "import os\n  import sys\nimport sys\n").unwrap();
        let res = InsertLineTool::new(dir.path())
            .execute(
                &args(&[("path", "m.py"), ("after", "import sys"), ("content", "import re")]),
                &CancellationToken::new(),
            )
            .await;
        assert!(res.success, "{}", res.output);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("m.py")).unwrap(),
            "import os\n  import sys\nimport re\nimport sys\n"
        );
    }

    #[tokio::test]
    async fn insert_fails_without_anchor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m.py"), "a\nb\n").unwrap();
        let tool = InsertLineTool::new(dir.path());
        let cancel = CancellationToken::new();

        let res = tool.execute(&args(&[("path", "m.py"), ("after", "zzz")]), &cancel).await;
        assert!(!res.success);
        assert!(res.output.starts_with("line not found in"));

        let res = tool.execute(&args(&[("path", "m.py")]), &cancel).await;
        assert!(!res.success);
    }
}
