//! Document chunking with configurable size and overlap.

use crate::types::DocumentChunk;
use campus_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use text_splitter::{ChunkConfig, TextSplitter};

/// Deterministic chunk id: SHA-256 over the document id and position.
pub fn chunk_id(document_id: &str, position: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(b":");
    hasher.update(position.to_le_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("chunk-{}", &digest[..24])
}

/// Split document text into overlapping chunks of at most `chunk_size`
/// characters, preferring paragraph and sentence boundaries.
pub fn chunk_document(
    document_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> AppResult<Vec<DocumentChunk>> {
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|e| AppError::Config(format!("Invalid chunk settings: {}", e)))?
        .with_trim(true);
    let splitter = TextSplitter::new(config);

    let chunks: Vec<DocumentChunk> = splitter
        .chunks(text)
        .filter(|chunk| !chunk.trim().is_empty())
        .enumerate()
        .map(|(position, chunk)| {
            let position = position as u32;
            DocumentChunk {
                id: chunk_id(document_id, position),
                document_id: document_id.to_string(),
                position,
                text: chunk.to_string(),
            }
        })
        .collect();

    tracing::debug!(
        "Chunked document {} into {} chunks (size: {}, overlap: {})",
        document_id,
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}
