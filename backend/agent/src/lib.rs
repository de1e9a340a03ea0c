//! devclaw agent runner.
//!
//! The ReAct execution loop with its command parser, prompt assembly,
//! history trimming and session state.

pub mod agent_loop;
pub mod command_parser;
pub mod context_window;
pub mod file_tree;
pub mod reporter;
pub mod session_state;
pub mod system_prompt;

pub use agent_loop::{AgentRunner, RunOutcome, MAX_ITERATIONS, MAX_RETRIES, NO_COMMAND_MESSAGE};
pub use command_parser::{extract_code_block, parse_commands, repair_json, ParseError, ParsedOutput};
pub use context_window::{ContextWindow, MAX_HISTORY_MESSAGES, MIN_HISTORY_MESSAGES};
pub use file_tree::build_file_tree;
pub use reporter::{usage_line, RunReporter, SilentReporter};
pub use session_state::SessionState;
pub use system_prompt::SYSTEM_PROMPT;
