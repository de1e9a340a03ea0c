//! History trimming for long runs.

use devclaw_core::ChatMessage;

/// Maximum number of turns sent to the model.
pub const MAX_HISTORY_MESSAGES: usize = 40;

/// Smallest usable budget: head (2) + marker (1) + one recent turn.
pub const MIN_HISTORY_MESSAGES: usize = 4;

pub const TRIM_MARKER: &str =
    "[Earlier conversation history was trimmed to save context. Continue from where you left off.]";

/// Keeps the conversation within a fixed turn budget.
///
/// The first two turns (system instructions and the task) always survive;
/// a marker turn stands in for the dropped middle.
#[derive(Debug, Clone, Copy)]
pub struct ContextWindow {
    max_messages: usize,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self {
            max_messages: MAX_HISTORY_MESSAGES,
        }
    }
}

impl ContextWindow {
    /// Budgets below [`MIN_HISTORY_MESSAGES`] are raised to it.
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages: max_messages.max(MIN_HISTORY_MESSAGES),
        }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Trim `history` in place. Returns true when anything was dropped.
    pub fn trim(&self, history: &mut Vec<ChatMessage>) -> bool {
        if history.len() <= self.max_messages {
            return false;
        }
        let keep_tail = self.max_messages - 3;
        let tail_start = history.len() - keep_tail;
        let tail = history.split_off(tail_start);
        history.truncate(2);
        history.push(ChatMessage::user(TRIM_MARKER));
        history.extend(tail);
        true
    }
}
