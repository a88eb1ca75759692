
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::Embedder;
use super::tokens::estimate_token_count;
use crate::AssistantError;
use crate::config::ProviderConfig;

const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Blocking client for an OpenAI-compatible API.
///
/// Embeddings are served from here directly; chat completions reuse the same
/// transport through [`OpenAiClient::post_json`].
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: Url,
    authorization: String,
    model: String,
    batch_size: u32,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    pub text: String,
    pub embedding: Vec<f32>,
    pub token_count: usize,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("batch_size", &self.batch_size)
            .field("retry_attempts", &self.retry_attempts)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    #[inline]
    pub fn new(provider: &ProviderConfig, api_key: &str) -> Result<Self> {
        let base_url = provider
            .api_url()
            .context("Failed to build provider URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(provider.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            authorization: format!("Bearer {api_key}"),
            model: provider.embedding_model.clone(),
            batch_size: provider.batch_size.max(1),
            agent,
            retry_attempts: provider.retry_attempts.max(1),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Check that the provider is reachable and accepts the API key
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self.endpoint("models")?;
        debug!("Pinging provider at {}", url);

        self.make_request_with_retry(|| {
            self.agent
                .get(url.as_str())
                .header("Authorization", &self.authorization)
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to reach the model provider")?;

        info!("Provider at {} is reachable", self.base_url);
        Ok(())
    }

    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<EmbeddingResult> {
        let mut results = self.generate_embeddings_single_batch(&[text.to_string()])?;
        results
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Provider returned no embedding"))
    }

    /// Embed texts in `batch_size` chunks, preserving input order
    #[inline]
    pub fn generate_embeddings_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size as usize) {
            let batch_results = self
                .generate_embeddings_single_batch(chunk)
                .with_context(|| format!("Failed to process batch of {} texts", chunk.len()))?;
            results.extend(batch_results);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }

    fn generate_embeddings_single_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response_text = self
            .post_json("embeddings", &request)
            .context("Failed to generate embeddings")?;

        let mut response: EmbeddingResponse = serde_json::from_str(&response_text)
            .context("Failed to parse embedding response")?;

        if response.data.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            ));
        }

        response.data.sort_by_key(|item| item.index);

        let results = texts
            .iter()
            .zip(response.data)
            .map(|(text, item)| EmbeddingResult {
                text: text.clone(),
                embedding: item.embedding,
                token_count: estimate_token_count(text),
            })
            .collect();

        Ok(results)
    }

    /// POST a JSON body to an endpoint relative to the base URL and return the response text
    pub(crate) fn post_json<T: Serialize>(&self, endpoint: &str, body: &T) -> Result<String> {
        let url = self.endpoint(endpoint)?;
        let request_json =
            serde_json::to_string(body).context("Failed to serialize provider request")?;

        debug!("POST {} ({} bytes)", url, request_json.len());

        self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Authorization", &self.authorization)
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    fn endpoint(&self, endpoint: &str) -> Result<Url> {
        self.base_url
            .join(endpoint)
            .with_context(|| format!("Failed to build URL for endpoint '{endpoint}'"))
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(401 | 403) => {
                            warn!("Provider rejected the API key");
                            return Err(anyhow::anyhow!(
                                "Unauthorized: the provider rejected the API key"
                            ));
                        }
                        ureq::Error::StatusCode(status) if *status >= 500 || *status == 429 => {
                            warn!(
                                "Server error (status {}), attempt {}/{}",
                                status, attempt, self.retry_attempts
                            );
                            true
                        }
                        ureq::Error::StatusCode(status) => {
                            warn!("Client error (status {}), not retrying", status);
                            return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => false,
                    };

                    if !should_retry {
                        return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                    }

                    last_error = Some(anyhow::anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed_documents(&self, texts: Vec<String>) -> crate::Result<Vec<Vec<f32>>> {
        let client = self.clone();
        let results = tokio::task::spawn_blocking(move || client.generate_embeddings_batch(&texts))
            .await
            .map_err(|e| AssistantError::Embedding(format!("Embedding task failed: {e}")))?
            .map_err(|e| AssistantError::Embedding(format!("{e:#}")))?;

        Ok(results.into_iter().map(|r| r.embedding).collect())
    }

    async fn embed_query(&self, text: &str) -> crate::Result<Vec<f32>> {
        let client = self.clone();
        let text = text.to_string();
        let result = tokio::task::spawn_blocking(move || client.generate_embedding(&text))
            .await
            .map_err(|e| AssistantError::Embedding(format!("Embedding task failed: {e}")))?
            .map_err(|e| AssistantError::Embedding(format!("{e:#}")))?;

        Ok(result.embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
