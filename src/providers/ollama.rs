//! Ollama client for local embeddings and generation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// HTTP client for a local Ollama endpoint.
///
/// All requests carry the configured timeout and are retried a bounded number
/// of times; connectivity failures surface as `Error::LlmUnavailable` so
/// callers can tell "endpoint down" apart from "generation failed".
pub struct OllamaClient {
    client: Client,
    config: LlmConfig,
}

impl OllamaClient {
    /// Create a new client from config
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Generate an embedding for a text
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let request = EmbedRequest { model, prompt: text };

        let mut last_err = Error::LlmUnavailable("no attempt made".into());
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                tracing::debug!("retrying embedding request (attempt {})", attempt + 1);
            }
            match self.client.post(&url).json(&request).send().await {
                Ok(response) if response.status().is_success() => {
                    let parsed: EmbedResponse = response
                        .json()
                        .await
                        .map_err(|e| Error::Generation(format!("invalid embedding response: {}", e)))?;
                    return Ok(parsed.embedding);
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    last_err = Error::Generation(format!("embedding request failed: {} - {}", status, body));
                }
                Err(e) => last_err = classify_transport_error(&e),
            }
        }
        Err(last_err)
    }

    /// Generate a completion for a prompt
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.config.base_url);
        let request = GenerateRequest {
            model: &self.config.generate_model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.num_predict,
            },
        };

        let mut last_err = Error::LlmUnavailable("no attempt made".into());
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                tracing::debug!("retrying generation request (attempt {})", attempt + 1);
            }
            match self.client.post(&url).json(&request).send().await {
                Ok(response) if response.status().is_success() => {
                    let parsed: GenerateResponse = response
                        .json()
                        .await
                        .map_err(|e| Error::Generation(format!("invalid generation response: {}", e)))?;
                    return Ok(parsed.response);
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    last_err = Error::Generation(format!("generation request failed: {} - {}", status, body));
                }
                Err(e) => last_err = classify_transport_error(&e),
            }
        }
        Err(last_err)
    }

    /// Check that the Ollama endpoint is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

fn classify_transport_error(e: &reqwest::Error) -> Error {
    if e.is_connect() {
        Error::LlmUnavailable(format!("cannot reach Ollama: {}", e))
    } else if e.is_timeout() {
        Error::Generation(format!("request timed out: {}", e))
    } else {
        Error::Generation(format!("request failed: {}", e))
    }
}

/// Embedding provider backed by Ollama
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(client: Arc<OllamaClient>, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            dimensions: config.dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.client.embed(&self.model, text).await?;
        if embedding.len() != self.dimensions {
            return Err(Error::Generation(format!(
                "embedding model {} returned {} dimensions, expected {}",
                self.model,
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }
}

/// LLM provider backed by Ollama
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider
    pub fn new(client: Arc<OllamaClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.generate_model.clone(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client.generate(prompt).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn model(&self) -> &str {
        &self.model
    }
}
