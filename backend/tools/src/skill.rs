//! Skills: `SKILL.md` files with YAML front-matter, loaded on demand.

use async_trait::async_trait;
use devclaw_core::{parse_args, CancellationToken, Tool, ToolArgs, ToolResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const SKILL_FILE_NAME: &str = "SKILL.md";

/// A discovered skill. The body is read lazily via [`Skill::load_body`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skill {
    pub name: String,
    pub description: String,
    /// Directory containing the `SKILL.md`.
    pub dir: PathBuf,
    path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

impl Skill {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Markdown after the front-matter, trimmed.
    pub async fn load_body(&self) -> anyhow::Result<String> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let (_, body) = split_front_matter(&raw);
        Ok(body.trim().to_string())
    }
}

/// Walk `dirs` in order for `SKILL.md` files. Missing directories are
/// skipped; the first skill seen with a given name wins.
pub fn discover_skills(dirs: &[PathBuf]) -> Vec<Skill> {
    let mut seen = HashSet::new();
    let mut skills = Vec::new();

    for root in dirs {
        if !root.is_dir() {
            debug!(dir = %root.display(), "Skills directory not present");
            continue;
        }
        let files = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && e.file_name() == SKILL_FILE_NAME);

        for entry in files {
            let path = entry.path();
            let raw = match std::fs::read_to_string(path) {
                Ok(r) => r,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot read skill file");
                    continue;
                }
            };
            let front = match parse_front_matter(&raw) {
                Ok(Some(f)) => f,
                Ok(None) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid skill front-matter");
                    continue;
                }
            };
            let name = front.name.trim().to_string();
            if name.is_empty() || !seen.insert(name.clone()) {
                continue;
            }
            skills.push(Skill {
                name,
                description: front.description.trim().to_string(),
                dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
                path: path.to_path_buf(),
            });
        }
    }

    debug!(count = skills.len(), "Discovered skills");
    skills
}

fn parse_front_matter(raw: &str) -> Result<Option<FrontMatter>, serde_yaml::Error> {
    let (front, _) = split_front_matter(raw);
    match front {
        Some(yaml) if !yaml.trim().is_empty() => serde_yaml::from_str(yaml).map(Some),
        _ => Ok(None),
    }
}

/// Split on the first two `---` markers: (front-matter, body).
fn split_front_matter(raw: &str) -> (Option<&str>, &str) {
    const SEP: &str = "---";
    let Some(first) = raw.find(SEP) else {
        return (None, raw);
    };
    let after_first = first + SEP.len();
    let Some(second) = raw[after_first..].find(SEP).map(|i| i + after_first) else {
        return (None, raw);
    };
    (Some(&raw[after_first..second]), &raw[second + SEP.len()..])
}

#[derive(Debug, Deserialize)]
struct ReadSkillArgs {
    #[serde(default)]
    name: String,
}

/// `read_skill{name}`: returns the skill body.
pub struct ReadSkillTool {
    skills: Vec<Skill>,
}

impl ReadSkillTool {
    pub fn new(skills: Vec<Skill>) -> Self {
        Self { skills }
    }
}

#[async_trait]
impl Tool for ReadSkillTool {
    fn name(&self) -> &str {
        "read_skill"
    }

    async fn execute(&self, args: &ToolArgs, _cancel: &CancellationToken) -> ToolResult {
        let args: ReadSkillArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return ToolResult::failure(e),
        };
        if args.name.is_empty() {
            return ToolResult::failure("read_skill requires \"name\" argument");
        }
        let Some(skill) = self.skills.iter().find(|s| s.name == args.name) else {
            return ToolResult::failure(format!(
                "skill not found: {:?}. Use the available skills list from the context.",
                args.name
            ));
        };
        match skill.load_body().await {
            Ok(body) => ToolResult::success(body),
            Err(e) => ToolResult::failure(format!("load skill: {e}")),
        }
    }
}
