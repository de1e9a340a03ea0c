mod app;
mod interactive;
mod signals;
mod terminal_output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use devclaw_core::CancellationToken;
use tracing::error;

use app::{App, AppOptions};
use terminal_output::{note_error, TerminalReporter};

#[derive(Parser, Debug)]
#[command(name = "devclaw")]
#[command(about = "DevClaw — autonomous coding agent with a sandboxed tool belt")]
#[command(version)]
#[command(after_help = r#"Environment Variables (can be set in .env file):
  OPENAI_API_KEY    OpenAI API key (required)
  OPENAI_BASE_URL   API base URL (optional)
  OPENAI_MODEL      Model name (optional, default: gpt-4o)

.env file lookup order (existing env vars are never overwritten):
  1. File given by --env
  2. .env in the current working directory
  3. ~/.devclaw.env

Examples:
  devclaw --project ./myapp --task "add error handling to all API endpoints"
  devclaw --project ./myapp                       # interactive mode
  devclaw --project ./myapp --sandbox-mode strict # approve every change"#)]
struct Cli {
    /// Path to a .env file
    #[arg(long)]
    env: Option<PathBuf>,

    /// Path to the project directory
    #[arg(long, default_value = ".")]
    project: PathBuf,

    /// Model name (default: gpt-4o, or OPENAI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// API base URL (default: https://api.openai.com/v1, or OPENAI_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// API key (default: OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Task to execute; enters interactive mode when absent
    #[arg(long)]
    task: Option<String>,

    /// Show streamed model output and tool details
    #[arg(long)]
    verbose: bool,

    /// Sandbox mode: permissive, normal or strict (overrides the config file)
    #[arg(long)]
    sandbox_mode: Option<String>,

    /// Run shell commands on the host even when Docker is configured
    #[arg(long)]
    no_docker: bool,

    /// Skill directory (repeatable)
    #[arg(long = "skills-dir")]
    skills_dirs: Vec<PathBuf>,

    /// System prompt override file
    #[arg(long)]
    system_prompt: Option<PathBuf>,

    /// Directory for daily JSON log files
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn options(&self) -> AppOptions {
        AppOptions {
            project: self.project.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            sandbox_mode: self.sandbox_mode.clone(),
            no_docker: self.no_docker,
            skills_dirs: self.skills_dirs.clone(),
            system_prompt: self.system_prompt.clone(),
            interactive: self.task.is_none(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "devclaw failed");
            note_error(&format!("Error: {e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    devclaw_config::load_env(cli.env.as_deref())?;
    devclaw_logging::init_logger(cli.log_dir.as_deref(), devclaw_logging::default_level(cli.verbose))?;

    let reporter = Arc::new(TerminalReporter::new(cli.verbose));
    let app = App::build(cli.options(), reporter).await?;

    let cancel = CancellationToken::new();
    signals::spawn_signal_listener(cancel.clone());

    let code = match &cli.task {
        Some(task) => match app.runner().run(task, &cancel).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                note_error(&format!("agent error: {e}"));
                ExitCode::FAILURE
            }
        },
        None => {
            interactive::run_interactive(&app, &cancel).await?;
            ExitCode::SUCCESS
        }
    };

    app.shutdown().await;
    Ok(code)
}
