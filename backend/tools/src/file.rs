//! File tools: read, write, list and name search.

use async_trait::async_trait;
use devclaw_core::{parse_args, CancellationToken, Tool, ToolArgs, ToolResult};
use glob::Pattern;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Files larger than this are refused by `read_file`.
pub const MAX_READ_BYTES: u64 = 512 * 1024;

/// Result cap for `search_files`.
pub const MAX_SEARCH_RESULTS: usize = 200;

/// Directories skipped when walking a project.
pub(crate) const SKIP_DIRS: &[&str] = &[".git", "node_modules", "__pycache__", ".venv", "vendor"];

/// Resolve a tool path argument against the workdir. Empty and "." mean the workdir.
pub(crate) fn resolve_path(workdir: &Path, path: &str) -> PathBuf {
    let path = path.trim();
    if path.is_empty() || path == "." {
        return workdir.to_path_buf();
    }
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        workdir.join(p)
    }
}

#[derive(Debug, Deserialize)]
struct PathArgs {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    #[serde(default)]
    path: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    #[serde(default)]
    path: String,
    #[serde(default)]
    pattern: String,
}

// ---------------------------------------------------------------------------
// read_file
// ---------------------------------------------------------------------------

pub struct ReadFileTool {
    workdir: PathBuf,
}

impl ReadFileTool {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: workdir.into() }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    async fn execute(&self, args: &ToolArgs, _cancel: &CancellationToken) -> ToolResult {
        let args: PathArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(e),
        };
        let path = resolve_path(&self.workdir, &args.path);

        let meta = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) => return ToolResult::failure(format!("cannot access {}: {e}", path.display())),
        };
        if meta.is_dir() {
            return ToolResult::failure(format!("{} is a directory, use list_dir instead", path.display()));
        }
        if meta.len() > MAX_READ_BYTES {
            return ToolResult::failure(format!(
                "file too large ({} bytes), consider reading specific sections",
                meta.len()
            ));
        }

        let bytes = match fs::read(&path).await {
            Ok(b) => b,
            Err(e) => return ToolResult::failure(format!("read error: {e}")),
        };
        let text = String::from_utf8_lossy(&bytes);
        let mut out = String::with_capacity(text.len() + text.len() / 8);
        for (i, line) in text.lines().enumerate() {
            out.push_str(&format!("{:>4} | {line}\n", i + 1));
        }
        ToolResult::success(out)
    }
}

// ---------------------------------------------------------------------------
// write_file
// ---------------------------------------------------------------------------

pub struct WriteFileTool {
    workdir: PathBuf,
}

impl WriteFileTool {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: workdir.into() }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    async fn execute(&self, args: &ToolArgs, _cancel: &CancellationToken) -> ToolResult {
        let args: WriteArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(e),
        };
        if args.path.trim().is_empty() {
            return ToolResult::failure("write_file requires \"path\" argument");
        }
        let path = resolve_path(&self.workdir, &args.path);

        if let Some(dir) = path.parent() {
            if let Err(e) = fs::create_dir_all(dir).await {
                return ToolResult::failure(format!("cannot create directory {}: {e}", dir.display()));
            }
        }
        let existed = fs::try_exists(&path).await.unwrap_or(false);
        if let Err(e) = fs::write(&path, args.content.as_bytes()).await {
            return ToolResult::failure(format!("write error: {e}"));
        }

        let action = if existed { "Updated" } else { "Created" };
        ToolResult::success(format!(
            "{action} {} ({} bytes)",
            path.display(),
            args.content.len()
        ))
    }
}

// ---------------------------------------------------------------------------
// list_dir
// ---------------------------------------------------------------------------

pub struct ListDirTool {
    workdir: PathBuf,
}

impl ListDirTool {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: workdir.into() }
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    async fn execute(&self, args: &ToolArgs, _cancel: &CancellationToken) -> ToolResult {
        let args: PathArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(e),
        };
        let path = resolve_path(&self.workdir, &args.path);

        let mut reader = match fs::read_dir(&path).await {
            Ok(r) => r,
            Err(e) => return ToolResult::failure(format!("cannot list {}: {e}", path.display())),
        };

        let mut entries = Vec::new();
        while let Ok(Some(entry)) = reader.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            let line = match entry.metadata().await {
                Ok(meta) if meta.is_dir() => format!("{name}/"),
                Ok(meta) => format!("{name} ({} bytes)", meta.len()),
                Err(_) => name,
            };
            entries.push(line);
        }
        if entries.is_empty() {
            return ToolResult::success("(empty directory)");
        }
        entries.sort();
        ToolResult::success(entries.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// search_files
// ---------------------------------------------------------------------------

pub struct SearchFilesTool {
    workdir: PathBuf,
}

impl SearchFilesTool {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: workdir.into() }
    }
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    async fn execute(&self, args: &ToolArgs, _cancel: &CancellationToken) -> ToolResult {
        let args: SearchArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(e),
        };
        let root = resolve_path(&self.workdir, &args.path);
        let pattern = if args.pattern.trim().is_empty() {
            "*".to_string()
        } else {
            args.pattern.trim().to_string()
        };
        let matcher = match Pattern::new(&pattern) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(format!("invalid pattern {pattern}: {e}")),
        };

        let result = tokio::task::spawn_blocking(move || find_files(&root, &matcher)).await;
        let matches = match result {
            Ok(Ok(m)) => m,
            Ok(Err(e)) => return ToolResult::failure(format!("search error: {e}")),
            Err(e) => return ToolResult::failure(format!("search error: {e}")),
        };

        if matches.is_empty() {
            return ToolResult::success(format!("no files found matching pattern: {pattern}"));
        }
        ToolResult::success(matches.join("\n"))
    }
}

fn find_files(root: &Path, matcher: &Pattern) -> Result<Vec<String>, walkdir::Error> {
    let mut matches = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.depth() > 0 && is_skipped_dir(e.file_name())));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            // The root itself is unreadable.
            Err(e) if e.depth() == 0 => return Err(e),
            Err(_) => continue,
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if matcher.matches(&name) {
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            matches.push(rel.to_string_lossy().into_owned());
            if matches.len() >= MAX_SEARCH_RESULTS {
                debug!(limit = MAX_SEARCH_RESULTS, "search_files hit result cap");
                break;
            }
        }
    }
    Ok(matches)
}

pub(crate) fn is_skipped_dir(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| SKIP_DIRS.contains(&n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> ToolArgs {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn read_numbers_lines() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "first\nsecond\n").unwrap();
        let res = ReadFileTool::new(dir.path())
            .execute(&args(&[("path", "a.txt")]), &CancellationToken::new())
            .await;
        assert!(res.success);
        assert_eq!(res.output, "   1 | first\n   2 | second\n");
    }

    #[tokio::test]
    async fn read_rejects_directory_missing_and_large() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool::new(dir.path());
        let cancel = CancellationToken::new();

        let res = tool.execute(&args(&[("path", ".")]), &cancel).await;
        assert!(!res.success);
        assert!(res.output.contains("is a directory, use list_dir instead"));

        let res = tool.execute(&args(&[("path", "nope.txt")]), &cancel).await;
        assert!(!res.success);
        assert!(res.output.starts_with("cannot access"));

        std::fs::write(dir.path().join("big.bin"), vec![b'x'; 600 * 1024]).unwrap();
        let res = tool.execute(&args(&[("path", "big.bin")]), &cancel).await;
        assert!(!res.success);
        assert!(res.output.starts_with("file too large"));
    }

    #[tokio::test]
    async fn write_creates_parents_and_reports_action() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(dir.path());
        let cancel = CancellationToken::new();

        let res = tool
            .execute(&args(&[("path", "src/deep/mod.rs"), ("content", "hello")]), &cancel)
            .await;
        assert!(res.success, "{}", res.output);
        assert!(res.output.starts_with("Created "));
        assert!(res.output.ends_with("(5 bytes)"));

        let res = tool
            .execute(&args(&[("path", "src/deep/mod.rs"), ("content", "hi")]), &cancel)
            .await;
        assert!(res.output.starts_with("Updated "));
        assert_eq!(std::fs::read_to_string(dir.path().join("src/deep/mod.rs")).unwrap(), "hi");
    }

    #[tokio::test]
    async fn list_dir_marks_dirs_and_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ListDirTool::new(dir.path());
        let cancel = CancellationToken::new();

        let res = tool.execute(&args(&[]), &cancel).await;
        assert_eq!(res.output, "(empty directory)");

        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "abc").unwrap();
        let res = tool.execute(&args(&[("path", ".")]), &cancel).await;
        assert!(res.success);
        assert_eq!(res.output, "Cargo.toml (3 bytes)\nsrc/");
    }

    #[tokio::test]
    async fn search_matches_names_and_skips_vendor_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/nested/lib.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/notes.md"), "").unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.rs"), "").unwrap();

        let tool = SearchFilesTool::new(dir.path());
        let cancel = CancellationToken::new();
        let res = tool.execute(&args(&[("pattern", "*.rs")]), &cancel).await;
        assert!(res.success);
        assert_eq!(res.output, "src/main.rs\nsrc/nested/lib.rs");

        let res = tool.execute(&args(&[("pattern", "*.py")]), &cancel).await;
        assert_eq!(res.output, "no files found matching pattern: *.py");
    }

    #[tokio::test]
    async fn search_supports_classes_and_single_char_wildcards() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["test_a.c", "test_b.h", "test_ab.c", "a?b.txt", "axb.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let tool = SearchFilesTool::new(dir.path());
        let cancel = CancellationToken::new();

        let res = tool.execute(&args(&[("pattern", "test_?.[ch]")]), &cancel).await;
        assert_eq!(res.output, "test_a.c\ntest_b.h");

        let res = tool.execute(&args(&[("pattern", "a[?]b.txt")]), &cancel).await;
        assert_eq!(res.output, "a?b.txt");

        let res = tool.execute(&args(&[("pattern", "a?b.txt")]), &cancel).await;
        assert_eq!(res.output, "a?b.txt\naxb.txt");

        let res = tool.execute(&args(&[("pattern", "[!t]*.txt")]), &cancel).await;
        assert_eq!(res.output, "a?b.txt\naxb.txt");
    }

    #[tokio::test]
    async fn search_rejects_malformed_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let res = SearchFilesTool::new(dir.path())
            .execute(&args(&[("pattern", "src[")]), &CancellationToken::new())
            .await;
        assert!(!res.success);
        assert!(res.output.starts_with("invalid pattern src["), "{}", res.output);
    }
}
