//! Agent event logger.
//!
//! Structured run events (tool calls, model messages, observations, errors)
//! emitted through `tracing` under the `agent_events` target, secrets redacted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

/// Events longer than this are cut before logging.
const MAX_EVENT_TEXT: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    ToolCall {
        tool_name: String,
        arguments_json: String,
    },
    Message {
        role: String,
        content: String,
    },
    Observation {
        tool_name: String,
        success: bool,
        output: String,
    },
    Error {
        error_msg: String,
    },
}

impl AgentEvent {
    /// Redact and shorten every free-text field.
    fn scrubbed(mut self) -> Self {
        let scrub = |s: &mut String| *s = clip(&redact_sensitive_data(s));
        match &mut self {
            AgentEvent::ToolCall { arguments_json, .. } => scrub(arguments_json),
            AgentEvent::Message { content, .. } => scrub(content),
            AgentEvent::Observation { output, .. } => scrub(output),
            AgentEvent::Error { error_msg } => scrub(error_msg),
        }
        self
    }
}

fn clip(s: &str) -> String {
    if s.len() <= MAX_EVENT_TEXT {
        return s.to_string();
    }
    let mut end = MAX_EVENT_TEXT;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: AgentEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Build the redacted log entry for `event`.
    pub fn entry(session_id: &str, event: AgentEvent) -> EventLogEntry {
        EventLogEntry {
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            event: event.scrubbed(),
        }
    }

    pub fn log_event(session_id: &str, event: AgentEvent) {
        let entry = Self::entry(session_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "agent_events", session_id = %entry.session_id, event = %json, "Agent event");
    }
}
