//! Shared fixtures: deterministic mock providers and sample documents

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use policy_rag::error::{Error, Result};
use policy_rag::providers::{EmbeddingProvider, LlmProvider};
use policy_rag::types::{Chunk, ChunkSource, FileType};

/// Deterministic bag-of-words embedder. Texts sharing words get similar
/// vectors, which is enough for retrieval to behave sensibly in tests.
pub struct MockEmbedder {
    model: String,
    dims: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::with_model("mock-embedder")
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            dims: 16,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dims];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[fnv1a(word) as usize % self.dims] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in s.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// LLM double that replays scripted responses, then a fixed fallback
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    fallback: String,
    failing: bool,
}

impl ScriptedLlm {
    pub fn with_fallback(fallback: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: fallback.to_string(),
            failing: false,
        }
    }

    pub fn with_responses(responses: Vec<&str>, fallback: &str) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            fallback: fallback.to_string(),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: String::new(),
            failing: true,
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        if self.failing {
            return Err(Error::Generation("scripted failure".into()));
        }
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.failing)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Build a chunk the way the chunker would, for direct index tests
pub fn make_chunk(policy_name: &str, index: u32, content: &str) -> Chunk {
    Chunk {
        id: Chunk::derive_id(policy_name, index),
        policy_name: policy_name.to_string(),
        chunk_index: index,
        content: content.to_string(),
        source: ChunkSource {
            filename: format!("{}.pdf", policy_name.to_lowercase().replace(' ', "-")),
            file_type: FileType::Pdf,
            page_number: Some(index + 1),
            page_end: None,
            page_count: None,
            section_title: None,
        },
        char_start: 0,
        char_end: content.len(),
    }
}

/// Author a small single-page PDF with real embedded text
#[allow(dead_code)]
pub fn write_sample_pdf(path: &Path, lines: &[&str]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![50.into(), 750.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("Td", vec![0.into(), (-16).into()]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}
