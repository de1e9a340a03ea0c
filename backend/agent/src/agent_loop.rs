//! The ReAct loop: call the model, parse its commands, run them, feed the
//! results back, until `done`, the iteration budget, or a fatal error.

use std::path::PathBuf;
use std::sync::Arc;

use devclaw_core::{
    CancellationToken, ChatClient, ChatMessage, ChatReply, Command, DevClawError, ToolResult,
    Usage,
};
use devclaw_logging::{AgentEvent, EventLogger};
use devclaw_tools::{Skill, ToolRegistry};
use tracing::{debug, info, instrument, warn};

use crate::command_parser::{extract_code_block, parse_commands};
use crate::context_window::ContextWindow;
use crate::file_tree::{build_file_tree, FILE_TREE_DEPTH};
use crate::reporter::{usage_line, RunReporter, SilentReporter};
use crate::session_state::SessionState;
use crate::system_prompt::{
    build_debug_prompt, build_initial_turn, build_observation, DEBUG_SYSTEM_PROMPT, SYSTEM_PROMPT,
};

pub const MAX_ITERATIONS: usize = 30;
pub const MAX_RETRIES: usize = 3;

pub const NO_COMMAND_MESSAGE: &str = "You did not output a command. Please output a JSON command block to take action, or use the 'done' command if the task is complete.";

const DEFAULT_SUMMARY: &str = "Task completed.";

/// Successful end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub summary: String,
    pub iterations: usize,
    pub usage: Usage,
}

/// Drives one task at a time against a chat backend and a tool registry.
pub struct AgentRunner {
    client: Arc<dyn ChatClient>,
    registry: Arc<ToolRegistry>,
    reporter: Arc<dyn RunReporter>,
    skills: Vec<Skill>,
    project_dir: PathBuf,
    display_path: String,
    system_prompt: String,
    max_iterations: usize,
    max_retries: usize,
    window: ContextWindow,
}

impl AgentRunner {
    pub fn new(
        client: Arc<dyn ChatClient>,
        registry: Arc<ToolRegistry>,
        project_dir: impl Into<PathBuf>,
    ) -> Self {
        let project_dir = project_dir.into();
        Self {
            client,
            registry,
            reporter: Arc::new(SilentReporter),
            skills: Vec::new(),
            display_path: project_dir.display().to_string(),
            project_dir,
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_iterations: MAX_ITERATIONS,
            max_retries: MAX_RETRIES,
            window: ContextWindow::default(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn RunReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Skills listed to the model in the first turn.
    pub fn with_skills(mut self, skills: Vec<Skill>) -> Self {
        self.skills = skills;
        self
    }

    /// Project path shown to the model (the container mount root under docker).
    pub fn with_display_path(mut self, path: impl Into<String>) -> Self {
        self.display_path = path.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_context_window(mut self, window: ContextWindow) -> Self {
        self.window = window;
        self
    }

    /// Run `task` to completion.
    ///
    /// Token usage is reported on every exit path before the result is
    /// returned.
    #[instrument(skip_all, fields(model = %self.client.model()))]
    pub async fn run(
        &self,
        task: &str,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, DevClawError> {
        let file_tree = build_file_tree(&self.project_dir, FILE_TREE_DEPTH);
        let initial = build_initial_turn(&self.display_path, &file_tree, task, &self.skills);
        let mut session = SessionState::new(self.system_prompt.clone(), initial);

        info!(session_id = %session.session_id, skills = self.skills.len(), "Agent run started");
        self.reporter
            .started(self.client.model(), &self.display_path, task);

        let result = self.drive(&mut session, cancel).await;

        self.reporter.usage(&session.usage);
        info!(
            session_id = %session.session_id,
            iterations = session.iteration,
            "{}",
            usage_line(&session.usage)
        );

        match result {
            Ok(summary) => {
                self.reporter.completed(&summary);
                Ok(RunOutcome {
                    summary,
                    iterations: session.iteration,
                    usage: session.usage,
                })
            }
            Err(e) => {
                EventLogger::log_event(
                    &session.session_id,
                    AgentEvent::Error {
                        error_msg: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    /// Loop body; returns the `done` summary.
    async fn drive(
        &self,
        session: &mut SessionState,
        cancel: &CancellationToken,
    ) -> Result<String, DevClawError> {
        for step in 1..=self.max_iterations {
            if cancel.is_cancelled() {
                return Err(DevClawError::Cancelled);
            }
            session.iteration = step;
            self.reporter.step(step, self.max_iterations);

            let reply = self.call_model(&session.history, step, cancel).await?;
            session.record_usage(&reply.usage);
            session.push_assistant(reply.text.clone());
            EventLogger::log_event(
                &session.session_id,
                AgentEvent::Message {
                    role: "assistant".into(),
                    content: reply.text.clone(),
                },
            );

            match parse_commands(&reply.text) {
                Err(e) => {
                    debug!(error = %e, "Model output did not parse");
                    self.reporter.parse_error(&e.to_string());
                    session.push_user(build_observation(
                        "parse_error",
                        false,
                        &format!(
                            "Failed to parse your command: {e}\nPlease output a valid JSON command block."
                        ),
                    ));
                }
                Ok(parsed) => {
                    if !parsed.reasoning.is_empty() {
                        self.reporter.reasoning(&parsed.reasoning);
                    }
                    let commands: Vec<Command> = parsed
                        .commands
                        .into_iter()
                        .filter(|c| !c.name.trim().is_empty())
                        .collect();

                    if commands.is_empty() {
                        self.reporter.message(&reply.text);
                        session.push_user(NO_COMMAND_MESSAGE);
                    } else if let Some(summary) =
                        self.dispatch_all(commands, session, cancel).await?
                    {
                        return Ok(summary);
                    }
                }
            }

            if self.window.trim(&mut session.history) {
                debug!(turns = session.history.len(), "Trimmed conversation history");
            }
        }

        warn!(max = self.max_iterations, "Iteration budget exhausted");
        Err(DevClawError::IterationLimit(self.max_iterations))
    }

    /// Run commands in order. `Some(summary)` once a `done` is reached.
    async fn dispatch_all(
        &self,
        commands: Vec<Command>,
        session: &mut SessionState,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, DevClawError> {
        for cmd in commands {
            if cancel.is_cancelled() {
                return Err(DevClawError::Cancelled);
            }
            self.reporter.command(&cmd);

            if cmd.name == "done" {
                let summary = cmd.arg("summary").trim();
                let summary = if summary.is_empty() {
                    DEFAULT_SUMMARY
                } else {
                    summary
                };
                return Ok(Some(summary.to_string()));
            }

            EventLogger::log_event(
                &session.session_id,
                AgentEvent::ToolCall {
                    tool_name: cmd.name.clone(),
                    arguments_json: serde_json::to_string(&cmd.args).unwrap_or_default(),
                },
            );

            let result = if cmd.name == "debug_code" {
                self.debug_code(&cmd, session, cancel).await
            } else {
                self.registry.execute(&cmd.name, &cmd.args, cancel).await
            };

            self.reporter.result(&cmd, &result);
            EventLogger::log_event(
                &session.session_id,
                AgentEvent::Observation {
                    tool_name: cmd.name.clone(),
                    success: result.success,
                    output: result.output.clone(),
                },
            );
            session.push_user(build_observation(&cmd.name, result.success, &result.output));
        }
        Ok(None)
    }

    /// Streamed model call with bounded retries.
    async fn call_model(
        &self,
        history: &[ChatMessage],
        step: usize,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, DevClawError> {
        let reporter = &self.reporter;
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            if cancel.is_cancelled() {
                return Err(DevClawError::Cancelled);
            }
            let mut on_chunk = |text: &str| reporter.chunk(text);
            match self
                .client
                .send_streaming(history, &mut on_chunk, cancel)
                .await
            {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    if cancel.is_cancelled() {
                        return Err(DevClawError::Cancelled);
                    }
                    warn!(step, attempt, error = %e, "Model call failed");
                    last_error = format!("{e:#}");
                    self.reporter.retry(attempt, self.max_retries, &last_error);
                }
            }
        }

        Err(DevClawError::Transport {
            step,
            attempts: self.max_retries,
            message: last_error,
        })
    }

    /// One-shot repair call; its usage counts toward the run total.
    async fn debug_code(
        &self,
        cmd: &Command,
        session: &mut SessionState,
        cancel: &CancellationToken,
    ) -> ToolResult {
        let messages = [
            ChatMessage::system(DEBUG_SYSTEM_PROMPT),
            ChatMessage::user(build_debug_prompt(
                cmd.arg("code"),
                cmd.arg("error"),
                cmd.arg("test_code"),
            )),
        ];

        match self.client.send_once(&messages, cancel).await {
            Ok(reply) => {
                session.record_usage(&reply.usage);
                let fixed = extract_code_block(&reply.text, "").unwrap_or(reply.text);
                ToolResult::success(format!("## Suggested Fix\n\n```\n{fixed}\n```"))
            }
            Err(e) => ToolResult::failure(format!("LLM debug call failed: {e:#}")),
        }
    }
}
