//! Knowledge store contract and implementations.
//!
//! The store is the system of record for FAQs and document chunks, plus a
//! cache of computed embeddings keyed by item, model and content hash.
//! Store failures are reported as `AppError::KnowledgeStoreUnavailable`.

mod memory;
mod sqlite;

pub use memory::MemoryKnowledgeStore;
pub use sqlite::SqliteKnowledgeStore;

use crate::types::{
    DocumentChunk, DocumentRecord, FaqEntry, KnowledgeItem, KnowledgeStats, SourceType,
};
use campus_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Persistent storage for retrievable content.
pub trait KnowledgeStore: Send + Sync {
    /// Insert or replace an FAQ entry. The id must be set.
    fn upsert_faq(&self, faq: &FaqEntry) -> AppResult<()>;

    /// Activate or deactivate an FAQ. Returns false if the id is unknown.
    fn set_faq_active(&self, id: &str, active: bool) -> AppResult<bool>;

    /// All FAQ entries, highest priority first.
    fn list_faqs(&self) -> AppResult<Vec<FaqEntry>>;

    /// Replace a document and all of its chunks.
    fn replace_document(&self, document: &DocumentRecord, chunks: &[DocumentChunk])
        -> AppResult<()>;

    /// Remove a document and its chunks. Returns false if the id is unknown.
    fn remove_document(&self, document_id: &str) -> AppResult<bool>;

    /// Every item eligible for indexing: active FAQs and all document chunks.
    fn active_items(&self) -> AppResult<Vec<KnowledgeItem>>;

    /// Previously computed embedding for this item content, if any.
    fn cached_embedding(
        &self,
        item_id: &str,
        model: &str,
        content_hash: &str,
    ) -> AppResult<Option<Vec<f32>>>;

    /// Remember an embedding for this item content.
    fn store_embedding(
        &self,
        item_id: &str,
        model: &str,
        content_hash: &str,
        embedding: &[f32],
    ) -> AppResult<()>;

    fn stats(&self) -> AppResult<KnowledgeStats>;
}

/// Hash of the text an embedding was computed from.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Project an FAQ entry onto a retrievable item.
pub(crate) fn faq_to_item(faq: &FaqEntry, updated_at: DateTime<Utc>) -> KnowledgeItem {
    KnowledgeItem {
        id: faq.id.clone(),
        source_type: SourceType::Faq,
        title: faq.question.clone(),
        text: format!("Q: {}\nA: {}", faq.question, faq.answer),
        category: faq.category.clone(),
        language: faq.language.clone(),
        keywords: faq.keywords.clone(),
        question: Some(faq.question.clone()),
        answer: Some(faq.answer.clone()),
        document_id: None,
        position: None,
        indexed_at: updated_at,
    }
}

/// Project a document chunk onto a retrievable item.
pub(crate) fn chunk_to_item(
    document: &DocumentRecord,
    chunk: &DocumentChunk,
    updated_at: DateTime<Utc>,
) -> KnowledgeItem {
    KnowledgeItem {
        id: chunk.id.clone(),
        source_type: SourceType::DocumentChunk,
        title: document.title.clone(),
        text: chunk.text.clone(),
        category: document.category.clone(),
        language: document.language.clone(),
        keywords: Vec::new(),
        question: None,
        answer: None,
        document_id: Some(document.id.clone()),
        position: Some(chunk.position),
        indexed_at: updated_at,
    }
}

pub(crate) fn require_faq_id(faq: &FaqEntry) -> AppResult<()> {
    if faq.id.trim().is_empty() {
        return Err(AppError::Knowledge(format!(
            "FAQ '{}' has no id",
            faq.question
        )));
    }
    if faq.question.trim().is_empty() || faq.answer.trim().is_empty() {
        return Err(AppError::Knowledge(format!(
            "FAQ {} needs both a question and an answer",
            faq.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        let hash = content_hash("What is the fee structure?");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash("What is the fee structure?"));
        assert_ne!(hash, content_hash("What is the hostel fee?"));
    }
}
