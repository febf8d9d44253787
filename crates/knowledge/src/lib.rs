//! Campus knowledge base.
//!
//! FAQ entries and chunked documents live in a [`KnowledgeStore`]. A
//! [`Retriever`] embeds them into a [`KnowledgeIndex`] snapshot and answers
//! hybrid vector + keyword queries against it.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod retriever;
pub mod store;
pub mod text;
pub mod types;


pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::{IndexSnapshot, KnowledgeIndex};
pub use ingest::{import_faqs, ingest_document, ingest_paths, IngestOptions, IngestStats};
pub use retriever::Retriever;
pub use store::{KnowledgeStore, MemoryKnowledgeStore, SqliteKnowledgeStore};
pub use types::{
    DocumentRecord, FaqEntry, KnowledgeItem, KnowledgeStats, MatchSource, RetrievalResult,
    SourceType,
};
