//! Regex content search over the project tree.

use crate::file::{is_skipped_dir, resolve_path};
use async_trait::async_trait;
use devclaw_core::{parse_args, CancellationToken, Tool, ToolArgs, ToolResult};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Maximum number of matching lines returned.
pub const MAX_GREP_MATCHES: usize = 100;

/// Files above this size are not searched.
const MAX_GREP_FILE_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Deserialize)]
struct GrepArgs {
    #[serde(default)]
    path: String,
    #[serde(default)]
    pattern: String,
}

/// `grep{path,pattern}`: `file:line:text` output, relative to the search root.
pub struct GrepTool {
    workdir: PathBuf,
}

impl GrepTool {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: workdir.into() }
    }
}

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    async fn execute(&self, args: &ToolArgs, cancel: &CancellationToken) -> ToolResult {
        let args: GrepArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(e),
        };
        if args.pattern.is_empty() {
            return ToolResult::failure("empty pattern");
        }
        let re = match Regex::new(&args.pattern) {
            Ok(re) => re,
            Err(e) => return ToolResult::failure(format!("invalid regex: {e}")),
        };
        let root = resolve_path(&self.workdir, &args.path);
        if !root.exists() {
            return ToolResult::failure(format!("cannot search {}: no such file or directory", root.display()));
        }

        let cancel = cancel.clone();
        let search = tokio::task::spawn_blocking(move || search_tree(&root, &re, &cancel));
        let lines = match search.await {
            Ok(lines) => lines,
            Err(e) => return ToolResult::failure(format!("search error: {e}")),
        };

        if lines.is_empty() {
            return ToolResult::success(format!("no matches found for pattern: {}", args.pattern));
        }
        ToolResult::success(lines.join("\n"))
    }
}

fn search_tree(root: &Path, re: &Regex, cancel: &CancellationToken) -> Vec<String> {
    let mut out = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.depth() > 0 && is_skipped_dir(e.file_name())))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file());

    for entry in walker {
        if cancel.is_cancelled() || out.len() >= MAX_GREP_MATCHES {
            break;
        }
        if entry.metadata().map(|m| m.len() > MAX_GREP_FILE_BYTES).unwrap_or(true) {
            continue;
        }
        let Ok(bytes) = std::fs::read(entry.path()) else {
            continue;
        };
        // Binary file.
        if bytes.contains(&0) {
            continue;
        }
        let text = String::from_utf8_lossy(&bytes);
        let display = if entry.depth() == 0 {
            entry.file_name().to_string_lossy().into_owned()
        } else {
            entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .into_owned()
        };
        for (i, line) in text.lines().enumerate() {
            if re.is_match(line) {
                out.push(format!("{display}:{}:{line}", i + 1));
                if out.len() >= MAX_GREP_MATCHES {
                    break;
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> ToolArgs {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn finds_matches_with_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "use std::io;\nfn main() {}\nfn helper() {}\n").unwrap();
        std::fs::write(dir.path().join(".git/config"), "fn main() {}\n").unwrap();

        let res = GrepTool::new(dir.path())
            .execute(&args(&[("pattern", r"fn \w+\(")]), &CancellationToken::new())
            .await;
        assert!(res.success);
        assert_eq!(res.output, "src/lib.rs:2:fn main() {}\nsrc/lib.rs:3:fn helper() {}");
    }

    #[tokio::test]
    async fn single_file_and_no_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha\nbeta\n").unwrap();
        let tool = GrepTool::new(dir.path());
        let cancel = CancellationToken::new();

        let res = tool.execute(&args(&[("path", "a.txt"), ("pattern", "beta")]), &cancel).await;
        assert_eq!(res.output, "a.txt:2:beta");

        let res = tool.execute(&args(&[("pattern", "gamma")]), &cancel).await;
        assert!(res.success);
        assert_eq!(res.output, "no matches found for pattern: gamma");
    }

    #[tokio::test]
    async fn rejects_empty_and_invalid_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let tool = GrepTool::new(dir.path());
        let cancel = CancellationToken::new();
        assert_eq!(tool.execute(&args(&[]), &cancel).await.output, "empty pattern");
        let res = tool.execute(&args(&[("pattern", "(unclosed")]), &cancel).await;
        assert!(!res.success);
        assert!(res.output.starts_with("invalid regex"));
    }

    #[tokio::test]
    async fn caps_matches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("many.txt"), "hit\n".repeat(500)).unwrap();
        let res = GrepTool::new(dir.path())
            .execute(&args(&[("pattern", "hit")]), &CancellationToken::new())
            .await;
        assert_eq!(res.output.lines().count(), MAX_GREP_MATCHES);
    }
}
