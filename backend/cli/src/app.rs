//! Wiring: config, policy, container backend, tools, skills and the chat
//! client, shared by every task of a process.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use devclaw_agent::{AgentRunner, RunReporter};
use devclaw_config::{load_and_prepare, resolve_prompt_file, DockerConfig, CONFIG_DIR_NAME};
use devclaw_core::ChatClient;
use devclaw_llm::{LlmConfig, OpenAiClient};
use devclaw_sandbox::{
    approver_for, docker_available, DockerExecutor, Policy, Sandbox, CONTAINER_WORKSPACE,
};
use devclaw_tools::{discover_skills, Skill, ToolRegistry};
use tracing::{info, warn};

use crate::terminal_output::note_warn;

const SYSTEM_PROMPT_FILE: &str = "system_prompt.md";
const SKILLS_DIR_NAME: &str = "skills";

/// Startup options, already merged from flags.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub project: PathBuf,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub sandbox_mode: Option<String>,
    pub no_docker: bool,
    pub skills_dirs: Vec<PathBuf>,
    pub system_prompt: Option<PathBuf>,
    pub interactive: bool,
}

pub struct App {
    pub project_dir: PathBuf,
    client: Arc<dyn ChatClient>,
    registry: Arc<ToolRegistry>,
    docker: Option<Arc<DockerExecutor>>,
    skills: Vec<Skill>,
    system_prompt: Option<String>,
    reporter: Arc<dyn RunReporter>,
}

impl App {
    pub async fn build(options: AppOptions, reporter: Arc<dyn RunReporter>) -> Result<Self> {
        let client = OpenAiClient::new(LlmConfig {
            api_key: options.api_key.clone(),
            base_url: options.base_url.clone(),
            model: options.model.clone(),
            timeout: None,
        })?;
        Self::build_with_client(options, Arc::new(client), reporter).await
    }

    pub async fn build_with_client(
        options: AppOptions,
        client: Arc<dyn ChatClient>,
        reporter: Arc<dyn RunReporter>,
    ) -> Result<Self> {
        let project_dir = resolve_project(&options.project)?;
        let config = load_and_prepare(&project_dir).await?;

        let policy = Policy::from_config(
            &project_dir,
            config.as_ref(),
            options.sandbox_mode.as_deref(),
            Some(approver_for(options.interactive)),
        );

        let docker_config = config.map(|c| c.docker).unwrap_or_default();
        let docker = if options.no_docker || !docker_config.docker_enabled() {
            info!("Isolated execution disabled");
            None
        } else {
            start_backend(&project_dir, &docker_config).await
        };

        let skill_dirs = if options.skills_dirs.is_empty() {
            default_skill_dirs(&project_dir)
        } else {
            options.skills_dirs.clone()
        };
        let skills = discover_skills(&skill_dirs);

        let mut registry = ToolRegistry::with_defaults(&project_dir, docker.clone(), skills.clone());
        registry.set_sandbox(Arc::new(Sandbox::new(policy)));

        let system_prompt = resolve_prompt_file(
            options.system_prompt.as_deref(),
            Some(&project_dir),
            SYSTEM_PROMPT_FILE,
        );

        info!(
            project = %project_dir.display(),
            docker = docker.is_some(),
            skills = skills.len(),
            tools = registry.list().len(),
            "devclaw ready"
        );

        Ok(Self {
            project_dir,
            client,
            registry: Arc::new(registry),
            docker,
            skills,
            system_prompt,
            reporter,
        })
    }

    /// A fresh runner for one task.
    pub fn runner(&self) -> AgentRunner {
        let mut runner = AgentRunner::new(self.client.clone(), self.registry.clone(), &self.project_dir)
            .with_reporter(self.reporter.clone())
            .with_skills(self.skills.clone())
            .with_display_path(self.display_path());
        if let Some(prompt) = &self.system_prompt {
            runner = runner.with_system_prompt(prompt.clone());
        }
        runner
    }

    /// Project path as the model sees it.
    pub fn display_path(&self) -> String {
        match self.docker {
            Some(_) => CONTAINER_WORKSPACE.to_string(),
            None => self.project_dir.display().to_string(),
        }
    }

    /// Stop (not remove) the container so the next run resumes it.
    pub async fn shutdown(&self) {
        if let Some(docker) = &self.docker {
            docker.stop().await;
        }
    }
}

fn resolve_project(project: &Path) -> Result<PathBuf> {
    if !project.is_dir() {
        bail!("project directory does not exist: {}", project.display());
    }
    project
        .canonicalize()
        .with_context(|| format!("invalid project path: {}", project.display()))
}

async fn start_backend(project_dir: &Path, config: &DockerConfig) -> Option<Arc<DockerExecutor>> {
    if !docker_available().await {
        warn!("Docker unavailable, falling back to host execution");
        note_warn("Docker is not available; shell commands run directly on the host.");
        return None;
    }
    let executor = DockerExecutor::new(project_dir, config);
    info!(container = %executor.container_name(), image = %executor.image(), "Isolated execution enabled");
    Some(Arc::new(executor))
}

/// `<project>/.devclaw/skills`, then `~/.devclaw/skills`.
pub fn default_skill_dirs(project_dir: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![project_dir.join(CONFIG_DIR_NAME).join(SKILLS_DIR_NAME)];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(CONFIG_DIR_NAME).join(SKILLS_DIR_NAME));
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use devclaw_agent::SilentReporter;
    use devclaw_core::CancellationToken;
    use devclaw_llm::ScriptedClient;

    fn options(project: &Path) -> AppOptions {
        AppOptions {
            project: project.to_path_buf(),
            no_docker: true,
            ..Default::default()
        }
    }

    #[test]
    fn skill_dirs_start_with_project() {
        let dirs = default_skill_dirs(Path::new("/proj"));
        assert_eq!(dirs[0], PathBuf::from("/proj/.devclaw/skills"));
    }

    #[tokio::test]
    async fn missing_project_is_error() {
        let client = Arc::new(ScriptedClient::new());
        let err = App::build_with_client(options(Path::new("/definitely/not/here")), client, Arc::new(SilentReporter))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("project directory does not exist"));
    }

    #[tokio::test]
    async fn wires_project_skills_and_prompt_override() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".devclaw");
        std::fs::create_dir_all(cfg_dir.join("skills/lint")).unwrap();
        std::fs::write(
            cfg_dir.join("skills/lint/SKILL.md"),
            "---\nname: lint\ndescription: Run the linters\n---\ncargo clippy\n",
        )
        .unwrap();
        std::fs::write(cfg_dir.join("system_prompt.md"), "  Custom instructions.  \n").unwrap();
        std::fs::write(cfg_dir.join("sandbox.yaml"), "mode: strict\n").unwrap();

        let client = Arc::new(
            ScriptedClient::new().with_reply("```json\n{\"command\":\"done\",\"args\":{\"summary\":\"ok\"}}\n```"),
        );
        let app = App::build_with_client(options(dir.path()), client.clone(), Arc::new(SilentReporter))
            .await
            .unwrap();
        assert_eq!(app.display_path(), app.project_dir.display().to_string());

        let outcome = app.runner().run("lint it", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.summary, "ok");

        let calls = client.calls();
        let messages = &calls[0].1;
        assert_eq!(messages[0].content, "Custom instructions.");
        assert!(messages[1].content.contains("- **lint**: Run the linters"));
        app.shutdown().await;
    }
}
