//! Depth-limited project tree shown to the model in the first turn.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

pub const FILE_TREE_DEPTH: usize = 3;

const ELIDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "vendor",
    ".idea",
    ".vscode",
    "dist",
    "build",
    ".next",
    "target",
];

/// Render `root` as a `├──`/`└──` tree, `max_depth` levels deep.
///
/// Hidden entries and build/VCS directories are left out; unreadable
/// directories render as empty.
pub fn build_file_tree(root: &Path, max_depth: usize) -> String {
    let entries: Vec<(usize, String, bool)> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_elided(e))
        .filter_map(Result::ok)
        .map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            (e.depth(), name, e.file_type().is_dir())
        })
        .collect();

    // An entry is the last of its siblings when no later entry shares its
    // depth before the walk climbs back above it.
    let mut last = vec![false; entries.len()];
    let mut later_sibling = vec![false; max_depth + 1];
    for (i, (depth, _, _)) in entries.iter().enumerate().rev() {
        last[i] = !later_sibling[*depth];
        later_sibling[*depth] = true;
        for flag in later_sibling.iter_mut().skip(depth + 1) {
            *flag = false;
        }
    }

    let mut out = String::new();
    let mut open: Vec<bool> = Vec::new();
    for (i, (depth, name, is_dir)) in entries.iter().enumerate() {
        open.truncate(depth - 1);
        for parent_last in &open {
            out.push_str(if *parent_last { "    " } else { "│   " });
        }
        out.push_str(if last[i] { "└── " } else { "├── " });
        out.push_str(name);
        if *is_dir {
            out.push('/');
        }
        out.push('\n');
        open.push(last[i]);
    }
    out
}

fn is_elided(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && ELIDED_DIRS.iter().any(|d| name == *d))
}
