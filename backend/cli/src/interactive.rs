//! Line-oriented interactive mode: one fresh agent run per entered task.

use std::io::Write;
use std::sync::mpsc as std_mpsc;

use anyhow::{anyhow, Result};
use devclaw_core::{CancellationToken, DevClawError};
use tokio::sync::mpsc;
use tracing::debug;

use crate::app::App;
use crate::terminal_output::note_error;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP: &str = r#"
Available commands:
  help, h        Show this help
  quit, exit, q  Exit the program

Task examples:
  "Analyze the project structure and explain the architecture"
  "Fix the bug in src/main.rs where the error handling is missing"
  "Add unit tests for the utils module"
  "Refactor the database layer to use connection pooling"
  "Install cargo-audit and run it on this project"
"#;

/// What a line of input asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Empty,
    Quit,
    Help,
    Task(String),
}

pub fn classify(line: &str) -> Input {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => Input::Empty,
        "quit" | "exit" | "q" => Input::Quit,
        "help" | "h" => Input::Help,
        _ => Input::Task(line.to_string()),
    }
}

pub async fn run_interactive(app: &App, cancel: &CancellationToken) -> Result<()> {
    print_banner(&app.project_dir.display().to_string());
    let mut input = LineReader::stdin();

    loop {
        print!("\n🤖 > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = input.next_line() => line?,
        };
        let Some(line) = line else {
            // EOF
            break;
        };

        match classify(&line) {
            Input::Empty => continue,
            Input::Quit => {
                println!("Goodbye!");
                break;
            }
            Input::Help => print!("{HELP}"),
            Input::Task(task) => match app.runner().run(&task, cancel).await {
                Ok(_) => {}
                Err(DevClawError::Cancelled) => break,
                Err(e) => note_error(&format!("Error: {e}")),
            },
        }
    }
    Ok(())
}

type ReadFn = Box<dyn FnMut(&mut String) -> std::io::Result<usize> + Send>;

/// Reads lines on a dedicated OS thread, one line per request.
///
/// The thread only reads when asked, so approval prompts can read the same
/// stdin between tasks. It is detached: a read still pending at shutdown
/// never holds up runtime teardown.
pub struct LineReader {
    requests: std_mpsc::Sender<()>,
    lines: mpsc::UnboundedReceiver<std::io::Result<Option<String>>>,
    pending: bool,
}

impl LineReader {
    pub fn stdin() -> Self {
        Self::spawn(Box::new(|buf: &mut String| std::io::stdin().read_line(buf)))
    }

    fn spawn(mut read: ReadFn) -> Self {
        let (request_tx, request_rx) = std_mpsc::channel::<()>();
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            while request_rx.recv().is_ok() {
                let mut line = String::new();
                let result = read(&mut line).map(|n| (n > 0).then_some(line));
                let done = !matches!(result, Ok(Some(_)));
                if line_tx.send(result).is_err() || done {
                    break;
                }
            }
        });
        Self {
            requests: request_tx,
            lines: line_rx,
            pending: false,
        }
    }

    /// Next line, `None` on EOF. Cancel-safe: an abandoned wait is picked up
    /// by the following call.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        if !self.pending {
            if self.requests.send(()).is_err() {
                return Ok(None);
            }
            self.pending = true;
        }
        let line = self.lines.recv().await;
        self.pending = false;
        match line {
            Some(Ok(line)) => {
                debug!(bytes = line.as_ref().map_or(0, String::len), "Read interactive input");
                Ok(line)
            }
            Some(Err(e)) => Err(anyhow!("read stdin: {e}")),
            None => Ok(None),
        }
    }
}

fn print_banner(project: &str) {
    let title = format!("DevClaw v{VERSION} - Interactive Mode");
    println!(
        r#"
╔══════════════════════════════════════════════════╗
║  {title:<48}║
╠══════════════════════════════════════════════════╣
║  Project: {project:<38} ║
║                                                  ║
║  Type your task and press Enter.                 ║
║  Type 'quit' or 'exit' to quit.                  ║
║  Type 'help' for available commands.             ║
╚══════════════════════════════════════════════════╝"#,
        project = shorten_path(project, 38)
    );
}

/// Keep the tail of long paths, prefixed with `...`.
fn shorten_path(path: &str, max: usize) -> String {
    if path.chars().count() <= max {
        return path.to_string();
    }
    let tail: String = path
        .chars()
        .rev()
        .take(max - 3)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{tail}")
}
