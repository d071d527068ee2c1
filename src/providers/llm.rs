//! LLM provider trait for answer generation

use async_trait::async_trait;

use crate::error::Result;

/// Trait for generative model calls
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a fully constructed prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Model being used, for logging
    fn model(&self) -> &str;
}
