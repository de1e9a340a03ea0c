//! Structured logging for devclaw.
//!
//! Console and rolling JSON file output, secret redaction, and agent event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{AgentEvent, EventLogEntry, EventLogger};
pub use logger::{default_level, init_logger};
pub use redact::redact_sensitive_data;
