//! Hybrid vector + keyword retrieval over the published knowledge index.

use crate::embeddings::{relevance, EmbeddingProvider};
use crate::index::{IndexSnapshot, IndexedItem, KnowledgeIndex};
use crate::store::{content_hash, KnowledgeStore};
use crate::text::{contains_phrase, content_words, normalize, tokens};
use crate::types::{MatchSource, RetrievalResult};
use campus_core::config::RetrievalConfig;
use campus_core::{AppError, AppResult};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

/// Ranks FAQ entries and document chunks for a query.
///
/// Ranking:
/// 1. The `top_k` nearest FAQs and the `top_k` nearest chunks by cosine
///    similarity (clamped to [0, 1]).
/// 2. FAQs whose keyword phrases occur in the query, scored as their vector
///    similarity plus `keyword_bonus`, capped at 1.0.
/// 3. Candidates merged by item id keeping the best score, filtered by
///    `min_relevance`, then ordered by score, FAQ before chunk, hinted
///    category, newest first and finally item id.
pub struct Retriever {
    store: Arc<dyn KnowledgeStore>,
    index: Arc<KnowledgeIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
    reindex_lock: tokio::sync::Mutex<()>,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        index: Arc<KnowledgeIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            config,
            reindex_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KnowledgeStore> {
        &self.store
    }

    pub fn index(&self) -> &Arc<KnowledgeIndex> {
        &self.index
    }

    /// Retrieve up to `top_k` results for `query`.
    ///
    /// Returns an empty list, not an error, when nothing clears the relevance
    /// floor. Fails only when no index is published. If the query cannot be
    /// embedded, retrieval continues on keyword matches alone.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        category_hint: Option<&str>,
    ) -> AppResult<Vec<RetrievalResult>> {
        let snapshot = self.index.current()?;
        let normalized_query = normalize(query);
        if normalized_query.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let query_embedding = match self.embedder.embed(query).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                tracing::warn!(error = %e, "Query embedding failed, using keyword matches only");
                None
            }
        };

        let mut candidates: HashMap<String, RetrievalResult> = HashMap::new();

        if let Some(embedding) = &query_embedding {
            for pool in [snapshot.faqs(), snapshot.chunks()] {
                for (entry, score) in nearest(pool, embedding, top_k) {
                    merge_candidate(&mut candidates, entry, score, MatchSource::Vector);
                }
            }
        }

        for entry in snapshot.faqs() {
            let matched = entry
                .keywords
                .iter()
                .any(|keyword| contains_phrase(&normalized_query, keyword));
            if !matched {
                continue;
            }

            let base = match &query_embedding {
                Some(embedding) => relevance(embedding, &entry.embedding),
                None => lexical_overlap(&normalized_query, entry),
            };
            let score = (base + self.config.keyword_bonus).min(1.0);
            merge_candidate(&mut candidates, entry, score, MatchSource::Keyword);
        }

        let floor = self.config.min_relevance;
        let mut results: Vec<RetrievalResult> = candidates
            .into_values()
            .filter(|result| result.score >= floor)
            .collect();
        results.sort_by(|a, b| compare_results(a, b, category_hint));
        results.truncate(top_k);

        tracing::debug!(
            results = results.len(),
            top_score = results.first().map(|r| r.score).unwrap_or(0.0),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Retrieval finished"
        );

        Ok(results)
    }

    /// Rebuild the index from the store and publish it atomically.
    ///
    /// Embeddings are reused from the store cache when the item content and
    /// model are unchanged. On failure the previously published snapshot
    /// stays in place. Returns the number of indexed items.
    pub async fn reindex_all(&self) -> AppResult<usize> {
        let _guard = self.reindex_lock.lock().await;
        let start = Instant::now();

        let items = self.store.active_items()?;
        let model = self.embedder.model_name().to_string();
        let dimensions = self.embedder.dimensions();

        let mut indexed = Vec::with_capacity(items.len());
        let mut pending = Vec::new();
        for item in items {
            let hash = content_hash(item.embedding_text());
            match self.store.cached_embedding(&item.id, &model, &hash)? {
                Some(vector) if vector.len() == dimensions => {
                    indexed.push(IndexedItem::new(item, vector));
                }
                _ => pending.push((item, hash)),
            }
        }

        let reused = indexed.len();
        if !pending.is_empty() {
            let texts: Vec<String> = pending
                .iter()
                .map(|(item, _)| item.embedding_text().to_string())
                .collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != pending.len() {
                return Err(AppError::Knowledge(format!(
                    "Embedding provider returned {} vectors for {} texts",
                    vectors.len(),
                    pending.len()
                )));
            }

            for ((item, hash), vector) in pending.into_iter().zip(vectors) {
                self.store
                    .store_embedding(&item.id, &model, &hash, &vector)?;
                indexed.push(IndexedItem::new(item, vector));
            }
        }

        let snapshot = IndexSnapshot::build(indexed, model);
        let count = snapshot.len();
        self.index.publish(snapshot)?;

        tracing::info!(
            indexed = count,
            reused_embeddings = reused,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Knowledge index published"
        );

        Ok(count)
    }
}

/// The `top_k` entries of `pool` closest to `query`, best first.
fn nearest<'a>(pool: &'a [IndexedItem], query: &[f32], top_k: usize) -> Vec<(&'a IndexedItem, f32)> {
    let mut scored: Vec<(&IndexedItem, f32)> = pool
        .iter()
        .map(|entry| (entry, relevance(query, &entry.embedding)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.item.id.cmp(&b.0.item.id)));
    scored.truncate(top_k);
    scored
}

fn merge_candidate(
    candidates: &mut HashMap<String, RetrievalResult>,
    entry: &IndexedItem,
    score: f32,
    match_source: MatchSource,
) {
    let score = score.clamp(0.0, 1.0);
    match candidates.get_mut(&entry.item.id) {
        Some(existing) if existing.score >= score => {}
        Some(existing) => {
            existing.score = score;
            existing.match_source = match_source;
        }
        None => {
            candidates.insert(
                entry.item.id.clone(),
                RetrievalResult {
                    item: Arc::clone(&entry.item),
                    score,
                    match_source,
                },
            );
        }
    }
}

/// Share of the query's content words found in the entry's question,
/// keywords or title. Used when the query has no embedding.
fn lexical_overlap(normalized_query: &str, entry: &IndexedItem) -> f32 {
    let query_words = content_words(normalized_query, 3);
    if query_words.is_empty() {
        return 0.0;
    }

    let mut vocabulary: HashSet<String> = tokens(&entry.item.title).into_iter().collect();
    for keyword in &entry.keywords {
        vocabulary.extend(tokens(keyword));
    }

    let hits = query_words
        .iter()
        .filter(|word| vocabulary.contains(word.as_str()))
        .count();
    hits as f32 / query_words.len() as f32
}

fn compare_results(a: &RetrievalResult, b: &RetrievalResult, hint: Option<&str>) -> Ordering {
    let hinted = |r: &RetrievalResult| {
        hint.map(|h| r.item.category.eq_ignore_ascii_case(h))
            .unwrap_or(false)
    };

    b.score
        .total_cmp(&a.score)
        .then_with(|| b.item.is_faq().cmp(&a.item.is_faq()))
        .then_with(|| hinted(b).cmp(&hinted(a)))
        .then_with(|| b.item.indexed_at.cmp(&a.item.indexed_at))
        .then_with(|| a.item.id.cmp(&b.item.id))
}
