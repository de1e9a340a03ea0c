use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use devclaw_core::{CancellationToken, ChatClient, ChatMessage, ChatReply, Usage};

/// How a recorded call was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Once,
    Streaming,
}

/// A chat client that replays canned replies in order.
///
/// Each call pops the next scripted entry; running past the end of the
/// script is an error. Every conversation it receives is recorded.
#[derive(Default)]
pub struct ScriptedClient {
    model: String,
    script: Mutex<VecDeque<Result<ChatReply, String>>>,
    calls: Mutex<Vec<(CallKind, Vec<ChatMessage>)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            model: "scripted".to_string(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queue a reply with no usage.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.with_reply_usage(text, Usage::default())
    }

    pub fn with_reply_usage(self, text: impl Into<String>, usage: Usage) -> Self {
        lock(&self.script).push_back(Ok(ChatReply {
            text: text.into(),
            usage,
        }));
        self
    }

    /// Queue a transport failure.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        lock(&self.script).push_back(Err(message.into()));
        self
    }

    /// Conversations received so far, oldest first.
    pub fn calls(&self) -> Vec<(CallKind, Vec<ChatMessage>)> {
        lock(&self.calls).clone()
    }

    /// Scripted entries not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }

    fn next(&self, kind: CallKind, messages: &[ChatMessage]) -> Result<ChatReply> {
        lock(&self.calls).push((kind, messages.to_vec()));
        match lock(&self.script).pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow!(message)),
            None => bail!("scripted client has no more replies"),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ChatClient for ScriptedClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<ChatReply> {
        if cancel.is_cancelled() {
            bail!("chat request cancelled");
        }
        self.next(CallKind::Once, messages)
    }

    async fn send_streaming(
        &self,
        messages: &[ChatMessage],
        on_chunk: &mut (dyn for<'s> FnMut(&'s str) + Send),
        cancel: &CancellationToken,
    ) -> Result<ChatReply> {
        if cancel.is_cancelled() {
            bail!("chat stream cancelled");
        }
        let reply = self.next(CallKind::Streaming, messages)?;
        for piece in reply.text.split_inclusive('\n') {
            on_chunk(piece);
        }
        Ok(reply)
    }
}
