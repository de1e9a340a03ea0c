pub mod error;
pub mod message;
pub mod tools;
pub mod traits;

pub use error::DevClawError;
pub use message::{ChatMessage, ChatReply, Command, Role, Usage};
pub use tools::{
    combine_output, parse_args, truncate_middle, ToolArgs, ToolResult, SHELL_OUTPUT_LIMIT,
    TRUNCATION_MARKER,
};
pub use traits::{ChatClient, Tool};

/// Cancellation token threaded through every blocking call of a run.
pub use tokio_util::sync::CancellationToken;
