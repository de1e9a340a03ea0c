use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::message::{ChatMessage, ChatReply};
use crate::tools::{ToolArgs, ToolResult};

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Command name exposed to the model (e.g., "read_file").
    fn name(&self) -> &str;

    /// Execute the tool. Failures are reported through `ToolResult`, never `Err`.
    async fn execute(&self, args: &ToolArgs, cancel: &CancellationToken) -> ToolResult;
}

/// The language-model chat backend.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Model identifier used for requests.
    fn model(&self) -> &str;

    /// Send the conversation and wait for the complete reply.
    async fn send_once(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<ChatReply>;

    /// Send the conversation and receive the reply incrementally.
    ///
    /// `on_chunk` sees every text delta as it arrives; the returned reply holds
    /// the assembled text.
    async fn send_streaming(
        &self,
        messages: &[ChatMessage],
        on_chunk: &mut (dyn for<'s> FnMut(&'s str) + Send),
        cancel: &CancellationToken,
    ) -> Result<ChatReply>;
}
