//! State of a single agent run.

use devclaw_core::{ChatMessage, Usage};
use uuid::Uuid;

/// Conversation, iteration counter and token totals for one task.
///
/// Owned by exactly one [`crate::AgentRunner::run`] call.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub history: Vec<ChatMessage>,
    pub iteration: usize,
    pub usage: Usage,
}

impl SessionState {
    /// Start a session with the system instructions and the first user turn.
    pub fn new(system_prompt: impl Into<String>, initial_turn: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            history: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(initial_turn),
            ],
            iteration: 0,
            usage: Usage::default(),
        }
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.history.push(ChatMessage::assistant(content));
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.history.push(ChatMessage::user(content));
    }

    pub fn record_usage(&mut self, usage: &Usage) {
        self.usage.accumulate(usage);
    }
}
