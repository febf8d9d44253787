//! In-process knowledge store for tests and `:memory:` deployments.

use super::{chunk_to_item, faq_to_item, require_faq_id, KnowledgeStore};
use crate::types::{DocumentChunk, DocumentRecord, FaqEntry, KnowledgeItem, KnowledgeStats};
use campus_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    faqs: BTreeMap<String, (FaqEntry, DateTime<Utc>)>,
    documents: BTreeMap<String, (DocumentRecord, DateTime<Utc>, Vec<DocumentChunk>)>,
    embeddings: HashMap<(String, String), (String, Vec<f32>)>,
}

/// Knowledge store held entirely in memory.
#[derive(Default)]
pub struct MemoryKnowledgeStore {
    state: Mutex<MemoryState>,
}

impl MemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| {
            AppError::KnowledgeStoreUnavailable("Knowledge store lock poisoned".to_string())
        })
    }
}

impl KnowledgeStore for MemoryKnowledgeStore {
    fn upsert_faq(&self, faq: &FaqEntry) -> AppResult<()> {
        require_faq_id(faq)?;
        let mut state = self.state()?;
        if let Some((current, _)) = state.faqs.get(&faq.id) {
            if current == faq {
                return Ok(());
            }
        }
        state.faqs.insert(faq.id.clone(), (faq.clone(), Utc::now()));
        Ok(())
    }

    fn set_faq_active(&self, id: &str, active: bool) -> AppResult<bool> {
        let mut state = self.state()?;
        match state.faqs.get_mut(id) {
            Some((faq, updated_at)) => {
                if faq.active != active {
                    faq.active = active;
                    *updated_at = Utc::now();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list_faqs(&self) -> AppResult<Vec<FaqEntry>> {
        let state = self.state()?;
        let mut faqs: Vec<FaqEntry> = state.faqs.values().map(|(faq, _)| faq.clone()).collect();
        faqs.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        Ok(faqs)
    }

    fn replace_document(
        &self,
        document: &DocumentRecord,
        chunks: &[DocumentChunk],
    ) -> AppResult<()> {
        let mut state = self.state()?;
        state.documents.insert(
            document.id.clone(),
            (document.clone(), Utc::now(), chunks.to_vec()),
        );
        Ok(())
    }

    fn remove_document(&self, document_id: &str) -> AppResult<bool> {
        let mut state = self.state()?;
        Ok(state.documents.remove(document_id).is_some())
    }

    fn active_items(&self) -> AppResult<Vec<KnowledgeItem>> {
        let state = self.state()?;
        let mut items: Vec<KnowledgeItem> = state
            .faqs
            .values()
            .filter(|(faq, _)| faq.active)
            .map(|(faq, updated_at)| faq_to_item(faq, *updated_at))
            .collect();

        let mut chunk_items: Vec<KnowledgeItem> = state
            .documents
            .values()
            .flat_map(|(document, updated_at, chunks)| {
                chunks
                    .iter()
                    .map(move |chunk| chunk_to_item(document, chunk, *updated_at))
            })
            .collect();
        chunk_items.sort_by(|a, b| a.id.cmp(&b.id));
        items.extend(chunk_items);

        Ok(items)
    }

    fn cached_embedding(
        &self,
        item_id: &str,
        model: &str,
        content_hash: &str,
    ) -> AppResult<Option<Vec<f32>>> {
        let state = self.state()?;
        Ok(state
            .embeddings
            .get(&(item_id.to_string(), model.to_string()))
            .filter(|(hash, _)| hash == content_hash)
            .map(|(_, vector)| vector.clone()))
    }

    fn store_embedding(
        &self,
        item_id: &str,
        model: &str,
        content_hash: &str,
        embedding: &[f32],
    ) -> AppResult<()> {
        let mut state = self.state()?;
        state.embeddings.insert(
            (item_id.to_string(), model.to_string()),
            (content_hash.to_string(), embedding.to_vec()),
        );
        Ok(())
    }

    fn stats(&self) -> AppResult<KnowledgeStats> {
        let state = self.state()?;
        Ok(KnowledgeStats {
            faqs: state.faqs.len(),
            active_faqs: state.faqs.values().filter(|(faq, _)| faq.active).count(),
            documents: state.documents.len(),
            chunks: state.documents.values().map(|(_, _, c)| c.len()).sum(),
            cached_embeddings: state.embeddings.len(),
        })
    }
}
