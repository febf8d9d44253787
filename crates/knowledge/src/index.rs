//! Published, read-mostly knowledge index.
//!
//! A [`KnowledgeIndex`] is a process-wide handle holding the currently
//! published [`IndexSnapshot`]. Reindexing builds a complete snapshot off to
//! the side and swaps it in with a single pointer replacement, so readers see
//! either the old or the new snapshot and never a partial one.

use crate::text::normalize;
use crate::types::{KnowledgeItem, SourceType};
use campus_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

/// An item together with its embedding and normalized keyword phrases.
#[derive(Debug, Clone)]
pub struct IndexedItem {
    pub item: Arc<KnowledgeItem>,
    pub embedding: Vec<f32>,
    /// Normalized keyword phrases: explicit keywords plus the canonical question
    pub keywords: Vec<String>,
}

impl IndexedItem {
    pub fn new(item: KnowledgeItem, embedding: Vec<f32>) -> Self {
        let mut keywords: Vec<String> = item
            .keywords
            .iter()
            .map(|k| normalize(k))
            .filter(|k| !k.is_empty())
            .collect();
        if let Some(question) = &item.question {
            let question = normalize(question);
            if !question.is_empty() {
                keywords.push(question);
            }
        }
        keywords.sort();
        keywords.dedup();

        Self {
            item: Arc::new(item),
            embedding,
            keywords,
        }
    }
}

/// An immutable, fully built index.
#[derive(Debug)]
pub struct IndexSnapshot {
    faqs: Vec<IndexedItem>,
    chunks: Vec<IndexedItem>,
    model: String,
    built_at: DateTime<Utc>,
}

impl IndexSnapshot {
    /// Partition items into the FAQ and document-chunk indexes.
    pub fn build(items: Vec<IndexedItem>, model: impl Into<String>) -> Self {
        let (faqs, chunks): (Vec<_>, Vec<_>) = items
            .into_iter()
            .partition(|entry| entry.item.source_type == SourceType::Faq);
        Self {
            faqs,
            chunks,
            model: model.into(),
            built_at: Utc::now(),
        }
    }

    pub fn faqs(&self) -> &[IndexedItem] {
        &self.faqs
    }

    pub fn chunks(&self) -> &[IndexedItem] {
        &self.chunks
    }

    /// Embedding model the snapshot was built with.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.faqs.len() + self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to the currently published snapshot.
#[derive(Debug, Default)]
pub struct KnowledgeIndex {
    current: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl KnowledgeIndex {
    /// Create an unpublished index. Reads fail until the first publish.
    pub fn new() -> Self {
        Self::default()
    }

    /// The published snapshot.
    ///
    /// Returns `KnowledgeStoreUnavailable` before the first publish or after
    /// teardown.
    pub fn current(&self) -> AppResult<Arc<IndexSnapshot>> {
        let guard = self.current.read().map_err(|_| {
            AppError::KnowledgeStoreUnavailable("Knowledge index lock poisoned".to_string())
        })?;
        guard.clone().ok_or_else(|| {
            AppError::KnowledgeStoreUnavailable("Knowledge index has not been built".to_string())
        })
    }

    /// Atomically replace the published snapshot.
    pub fn publish(&self, snapshot: IndexSnapshot) -> AppResult<()> {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.current.write().map_err(|_| {
            AppError::KnowledgeStoreUnavailable("Knowledge index lock poisoned".to_string())
        })?;
        *guard = Some(snapshot);
        Ok(())
    }

    /// Withdraw the published snapshot. In-flight readers keep theirs.
    pub fn teardown(&self) -> AppResult<()> {
        let mut guard = self.current.write().map_err(|_| {
            AppError::KnowledgeStoreUnavailable("Knowledge index lock poisoned".to_string())
        })?;
        *guard = None;
        tracing::info!("Knowledge index torn down");
        Ok(())
    }

    pub fn is_published(&self) -> bool {
        self.current.read().map(|g| g.is_some()).unwrap_or(false)
    }
}
