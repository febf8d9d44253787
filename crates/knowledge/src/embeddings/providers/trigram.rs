//! Trigram embedding provider using character trigram-based content-aware embeddings.

use crate::embeddings::provider::EmbeddingProvider;
use crate::text::{is_stop_word, tokens};
use campus_core::AppResult;
use std::collections::BTreeMap;

/// Trigram-based embedding provider for local, offline operation.
///
/// Generates deterministic embeddings from Unicode word segmentation,
/// character trigrams and word frequencies. It works for any script, so
/// Devanagari or Gurmukhi content is embedded as readily as English. Identical
/// texts always produce identical vectors.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, text: &str, seed: u64) -> usize {
        let hash = text
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(seed).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }

    /// Generate a trigram-based embedding for text.
    fn generate_trigram_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];

        let mut word_freq: BTreeMap<String, u32> = BTreeMap::new();
        for word in tokens(text) {
            if word.chars().count() > 2 && !is_stop_word(&word) {
                *word_freq.entry(word).or_insert(0) += 1;
            }
        }

        for (word, freq) in &word_freq {
            // Padded so short words still yield trigrams at their edges
            let chars: Vec<char> = format!(" {} ", word).chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let dim_idx = self.bucket(&trigram, 37);
                embedding[dim_idx] += (*freq as f32).sqrt();
            }

            // Also encode whole word
            let base_dim = self.bucket(word, 31);
            embedding[base_dim] += *freq as f32;
        }

        // Normalize to unit vector
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| self.generate_trigram_embedding(text))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_trigram_provider_embed_single() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("hostel facilities").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_trigram_provider_deterministic() {
        let provider = TrigramProvider::new(384);
        let text = "What is the fee structure?";

        let embedding1 = provider.embed(text).await.unwrap();
        let embedding2 = provider.embed(text).await.unwrap();

        assert_eq!(embedding1, embedding2);
        assert!(cosine_similarity(&embedding1, &embedding2) > 0.999);
    }

    #[tokio::test]
    async fn test_punctuation_and_case_ignored() {
        let provider = TrigramProvider::new(384);
        let a = provider.embed("What is the FEE structure?").await.unwrap();
        let b = provider.embed("what is the fee structure").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_related_texts_closer_than_unrelated() {
        let provider = TrigramProvider::new(384);
        let query = provider.embed("hostel fee structure").await.unwrap();
        let related = provider.embed("What is the hostel fee?").await.unwrap();
        let unrelated = provider.embed("library opening hours").await.unwrap();

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_trigram_provider_empty_text() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_trigram_provider_non_latin_script() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("छात्रावास शुल्क कितना है").await.unwrap();
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }
}
