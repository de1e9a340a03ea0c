//! `devclaw-llm` — chat backends implementing [`devclaw_core::ChatClient`].

pub mod openai;
pub mod scripted;
pub mod sse;

pub use openai::{LlmConfig, OpenAiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use scripted::{CallKind, ScriptedClient};
