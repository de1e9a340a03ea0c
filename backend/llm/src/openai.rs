use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use devclaw_core::{CancellationToken, ChatClient, ChatMessage, ChatReply, Usage};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sse::{SseEvent, SseLineBuffer};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 16384;

/// Connection settings. Empty fields fall back to `OPENAI_API_KEY`,
/// `OPENAI_BASE_URL` and `OPENAI_MODEL`, then to the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout: Option<Duration>,
}

impl LlmConfig {
    fn resolve(self, env: impl Fn(&str) -> Option<String>) -> ResolvedConfig {
        let pick = |value: Option<String>, var: &str| {
            value
                .filter(|v| !v.is_empty())
                .or_else(|| env(var).filter(|v| !v.is_empty()))
        };
        ResolvedConfig {
            api_key: pick(self.api_key, "OPENAI_API_KEY").unwrap_or_default(),
            base_url: pick(self.base_url, "OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: pick(self.model, "OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

struct ResolvedConfig {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

/// Chat client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let resolved = config.resolve(|var| std::env::var(var).ok());
        if resolved.api_key.is_empty() {
            bail!("OpenAI API key is required. Set OPENAI_API_KEY or use --api-key.");
        }
        let client = Client::builder()
            .timeout(resolved.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key: resolved.api_key,
            base_url: resolved.base_url,
            model: resolved.model,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .context("Chat HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            bail!("API error (status {}): {}", status.as_u16(), error_body);
        }
        Ok(response)
    }

    fn request<'a>(&'a self, messages: &'a [ChatMessage], stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream,
            stream_options: stream.then_some(StreamOptions { include_usage: true }),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<ChatReply> {
        debug!(model = %self.model, messages = messages.len(), "Sending chat request");
        let body = self.request(messages, false);

        let call = async {
            let response = self.post(&body).await?;
            response
                .json::<ChatResponse>()
                .await
                .context("Failed to parse chat response")
        };
        let parsed = tokio::select! {
            _ = cancel.cancelled() => bail!("chat request cancelled"),
            parsed = call => parsed?,
        };

        let Some(choice) = parsed.choices.into_iter().next() else {
            bail!("no choices in response");
        };
        Ok(ChatReply {
            text: choice.message.content,
            usage: parsed.usage.unwrap_or_default(),
        })
    }

    async fn send_streaming(
        &self,
        messages: &[ChatMessage],
        on_chunk: &mut (dyn for<'s> FnMut(&'s str) + Send),
        cancel: &CancellationToken,
    ) -> Result<ChatReply> {
        debug!(model = %self.model, messages = messages.len(), "Sending streaming chat request");
        let body = self.request(messages, true);

        let response = tokio::select! {
            _ = cancel.cancelled() => bail!("chat request cancelled"),
            response = self.post(&body) => response?,
        };

        let mut stream = Box::pin(response.bytes_stream());
        let mut lines = SseLineBuffer::new();
        let mut reply = ChatReply::default();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => bail!("chat stream cancelled"),
                next = stream.next() => next,
            };
            let Some(chunk) = next else {
                if let Some(SseEvent::Data(data)) = lines.finish() {
                    apply_chunk(&data, &mut reply, on_chunk);
                }
                break;
            };
            for event in lines.push(&chunk.context("Failed to read chat stream")?) {
                match event {
                    SseEvent::Done => return Ok(reply),
                    SseEvent::Data(data) => apply_chunk(&data, &mut reply, on_chunk),
                }
            }
        }

        Ok(reply)
    }
}

fn apply_chunk(data: &str, reply: &mut ChatReply, on_chunk: &mut (dyn for<'s> FnMut(&'s str) + Send)) {
    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Skipping undecodable stream chunk");
            return;
        }
    };
    if let Some(content) = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty())
    {
        on_chunk(&content);
        reply.text.push_str(&content);
    }
    if let Some(usage) = chunk.usage {
        reply.usage = usage;
    }
}
