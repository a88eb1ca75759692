#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ChatMessage;
use crate::AssistantError;
use crate::config::ProviderConfig;
use crate::embeddings::OpenAiClient;

/// Produces the next assistant message for a conversation
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: Vec<ChatMessage>) -> crate::Result<String>;
}

/// Chat completions against an OpenAI-compatible `chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: OpenAiClient,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl CompletionClient {
    #[inline]
    pub fn new(provider: &ProviderConfig, api_key: &str) -> Result<Self> {
        let client = OpenAiClient::new(provider, api_key)
            .context("Failed to initialize completion client")?;

        Ok(Self {
            client,
            model: provider.chat_model.clone(),
            temperature: provider.temperature,
        })
    }

    /// Blocking completion call
    #[inline]
    pub fn complete_blocking(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        debug!(
            "Requesting completion from {} with {} messages",
            self.model,
            messages.len()
        );

        let response_text = self
            .client
            .post_json("chat/completions", &request)
            .context("Chat completion request failed")?;

        let response: CompletionResponse = serde_json::from_str(&response_text)
            .context("Failed to parse chat completion response")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("Chat completion response contained no message"))
    }
}

#[async_trait]
impl ChatModel for CompletionClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> crate::Result<String> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.complete_blocking(&messages))
            .await
            .map_err(|e| AssistantError::Completion(format!("Completion task failed: {e}")))?
            .map_err(|e| AssistantError::Completion(format!("{e:#}")))
    }
}
