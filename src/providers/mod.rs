//! Provider abstractions for embeddings and answer generation
//!
//! Trait seams let tests inject deterministic implementations in place of the
//! local Ollama endpoint.

pub mod embedding;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
