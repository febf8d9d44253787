//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Kind of retrievable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Faq,
    DocumentChunk,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Faq => "faq",
            Self::DocumentChunk => "document_chunk",
        }
    }
}

/// A unit of retrievable content: an FAQ entry or a document chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// Unique item identifier
    pub id: String,

    /// FAQ or document chunk
    pub source_type: SourceType,

    /// Display title: the FAQ question or the parent document title
    pub title: String,

    /// Text handed to the generator as context
    pub text: String,

    /// Category label (e.g., "fees", "hostel")
    pub category: String,

    /// Language code of the content
    pub language: String,

    /// Explicit keywords (FAQs only)
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Canonical question (FAQs only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    /// Canonical answer (FAQs only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    /// Parent document (chunks only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,

    /// Position within the parent document (chunks only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,

    /// When the content was last written to the store
    pub indexed_at: DateTime<Utc>,
}

impl KnowledgeItem {
    /// Text the embedding is computed from.
    ///
    /// FAQs are embedded by their canonical question so that paraphrases of
    /// the question land close to it; chunks are embedded by their text.
    pub fn embedding_text(&self) -> &str {
        match (self.source_type, &self.question) {
            (SourceType::Faq, Some(question)) => question,
            _ => &self.text,
        }
    }

    pub fn is_faq(&self) -> bool {
        self.source_type == SourceType::Faq
    }
}

/// FAQ entry as written by the knowledge-base administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    /// Identifier; derived from the question when left empty
    #[serde(default)]
    pub id: String,

    pub question: String,

    pub answer: String,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub keywords: Vec<String>,

    /// Higher priority entries are listed first by admin tooling
    #[serde(default)]
    pub priority: i32,

    /// Inactive entries are kept but never indexed
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_active() -> bool {
    true
}

/// Metadata for an ingested document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_language")]
    pub language: String,
}

/// A chunk of document text ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Deterministic identifier derived from document id and position
    pub id: String,
    pub document_id: String,
    pub position: u32,
    pub text: String,
}

/// How a retrieval candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Vector,
    Keyword,
}

/// A ranked retrieval hit.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// Shared reference into the published index
    pub item: Arc<KnowledgeItem>,

    /// Normalized relevance in [0, 1]
    pub score: f32,

    pub match_source: MatchSource,
}

/// Counts reported by a knowledge store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeStats {
    pub faqs: usize,
    pub active_faqs: usize,
    pub documents: usize,
    pub chunks: usize,
    pub cached_embeddings: usize,
}
