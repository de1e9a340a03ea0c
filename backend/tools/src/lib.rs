//! `devclaw-tools` — the command surface the model can call.

pub mod done;
pub mod edit;
pub mod file;
pub mod grep;
pub mod registry;
pub mod shell;
pub mod skill;

pub use done::DoneTool;
pub use edit::{InsertLineTool, StrReplaceTool};
pub use file::{ListDirTool, ReadFileTool, SearchFilesTool, WriteFileTool};
pub use grep::GrepTool;
pub use registry::ToolRegistry;
pub use shell::{ShellTool, SHELL_TIMEOUT};
pub use skill::{discover_skills, ReadSkillTool, Skill};
