//! Loading FAQs and documents into a knowledge store.
//!
//! Ingestion only writes to the store. Call [`crate::Retriever::reindex_all`]
//! afterwards to make the new content retrievable.

use crate::chunker::chunk_document;
use crate::store::KnowledgeStore;
use crate::text::normalize;
use crate::types::{DocumentRecord, FaqEntry};
use campus_core::config::RetrievalConfig;
use campus_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// File extensions accepted as plain-text documents.
const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Stable FAQ id derived from the normalized question.
pub fn faq_id(question: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(question).as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("faq-{}", &digest[..16])
}

/// Parse an FAQ file (YAML or JSON list of entries).
pub fn parse_faqs(path: &Path) -> AppResult<Vec<FaqEntry>> {
    let raw = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let mut entries: Vec<FaqEntry> = if is_json {
        serde_json::from_str(&raw)?
    } else {
        serde_yaml::from_str(&raw)
            .map_err(|e| AppError::Knowledge(format!("Invalid FAQ file {:?}: {}", path, e)))?
    };

    for entry in &mut entries {
        if entry.id.trim().is_empty() {
            entry.id = faq_id(&entry.question);
        }
        entry.keywords = entry
            .keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
    }

    Ok(entries)
}

/// Import every FAQ in `path` into `store`. Returns the number imported.
pub fn import_faqs(store: &dyn KnowledgeStore, path: &Path) -> AppResult<usize> {
    let entries = parse_faqs(path)?;
    for entry in &entries {
        store.upsert_faq(entry)?;
    }

    tracing::info!(path = ?path, faqs = entries.len(), "Imported FAQs");
    Ok(entries.len())
}

/// Chunk `text` and store it as the full content of `document`.
///
/// Re-ingesting a document replaces all of its previous chunks.
pub fn ingest_document(
    store: &dyn KnowledgeStore,
    document: &DocumentRecord,
    text: &str,
    config: &RetrievalConfig,
) -> AppResult<usize> {
    let chunks = chunk_document(&document.id, text, config.chunk_size, config.chunk_overlap)?;
    store.replace_document(document, &chunks)?;

    tracing::debug!(document = %document.id, chunks = chunks.len(), "Stored document");
    Ok(chunks.len())
}

/// Options for [`ingest_paths`].
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub category: String,
    pub language: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            category: "general".to_string(),
            language: "en".to_string(),
        }
    }
}

/// Totals reported by [`ingest_paths`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub documents: usize,
    pub chunks: usize,
    pub bytes: u64,
    pub skipped: usize,
}

/// Ingest text documents from files and directories.
///
/// Directories are walked recursively. Each file becomes one document whose
/// id is its path relative to the walk root. Unreadable files are skipped
/// and counted.
pub fn ingest_paths(
    store: &dyn KnowledgeStore,
    paths: &[PathBuf],
    options: &IngestOptions,
    config: &RetrievalConfig,
) -> AppResult<IngestStats> {
    let start = Instant::now();
    let mut stats = IngestStats::default();

    for path in paths {
        if path.is_file() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string());
            ingest_file(store, path, &name, options, config, &mut stats);
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if !entry_path.is_file() || !is_document(entry_path) {
                    continue;
                }
                let relative = entry_path
                    .strip_prefix(path)
                    .unwrap_or(entry_path)
                    .to_string_lossy()
                    .replace('\\', "/");
                ingest_file(store, entry_path, &relative, options, config, &mut stats);
            }
        } else {
            return Err(AppError::Knowledge(format!("Path not found: {:?}", path)));
        }
    }

    tracing::info!(
        "Ingested {} documents, {} chunks, {} bytes in {:.2}s",
        stats.documents,
        stats.chunks,
        stats.bytes,
        start.elapsed().as_secs_f64()
    );

    Ok(stats)
}

fn ingest_file(
    store: &dyn KnowledgeStore,
    path: &Path,
    document_id: &str,
    options: &IngestOptions,
    config: &RetrievalConfig,
    stats: &mut IngestStats,
) {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "Skipping unreadable document");
            stats.skipped += 1;
            return;
        }
    };

    let document = DocumentRecord {
        id: document_id.to_string(),
        title: document_title(path),
        category: options.category.clone(),
        language: options.language.clone(),
    };

    match ingest_document(store, &document, &text, config) {
        Ok(chunks) => {
            stats.documents += 1;
            stats.chunks += chunks;
            stats.bytes += text.len() as u64;
        }
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "Skipping document");
            stats.skipped += 1;
        }
    }
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DOCUMENT_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

fn document_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().replace(['_', '-'], " "))
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKnowledgeStore;
    use tempfile::TempDir;

    #[test]
    fn test_faq_id_ignores_case_and_punctuation() {
        assert_eq!(
            faq_id("What is the fee structure?"),
            faq_id("what is the FEE structure")
        );
        assert!(faq_id("Where is the library?").starts_with("faq-"));
    }

    #[test]
    fn test_import_yaml_faqs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("faqs.yaml");
        std::fs::write(
            &path,
            r#"
- question: What is the fee structure?
  answer: The annual tuition fee is ₹50,000.
  category: fees
  keywords: [fee, " tuition ", ""]
- id: faq-hostel
  question: Is there a hostel?
  answer: Yes, for boys and girls.
  category: hostel
"#,
        )
        .unwrap();

        let store = MemoryKnowledgeStore::new();
        assert_eq!(import_faqs(&store, &path).unwrap(), 2);

        let faqs = store.list_faqs().unwrap();
        let fee = faqs.iter().find(|f| f.category == "fees").unwrap();
        assert_eq!(fee.id, faq_id("What is the fee structure?"));
        assert_eq!(fee.keywords, vec!["fee", "tuition"]);
        assert!(faqs.iter().any(|f| f.id == "faq-hostel"));
    }

    #[test]
    fn test_import_json_faqs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("faqs.json");
        std::fs::write(
            &path,
            r#"[{"question": "When is the library open?", "answer": "9am to 8pm."}]"#,
        )
        .unwrap();

        let entries = parse_faqs(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, "general");
    }

    #[test]
    fn test_ingest_directory() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        std::fs::create_dir_all(docs.join("hostel")).unwrap();
        std::fs::write(docs.join("fee_policy.md"), "Fees are due by 31 July.").unwrap();
        std::fs::write(docs.join("hostel/rules.txt"), "Gates close at 10pm.").unwrap();
        std::fs::write(docs.join("logo.png"), [0u8, 1, 2]).unwrap();

        let store = MemoryKnowledgeStore::new();
        let stats = ingest_paths(
            &store,
            &[docs],
            &IngestOptions::default(),
            &RetrievalConfig::default(),
        )
        .unwrap();

        assert_eq!(stats.documents, 2);
        assert_eq!(stats.chunks, 2);

        let items = store.active_items().unwrap();
        assert!(items
            .iter()
            .any(|i| i.document_id.as_deref() == Some("hostel/rules.txt")));
        assert!(items.iter().any(|i| i.title == "fee policy"));
    }

    #[test]
    fn test_reingest_replaces_chunks() {
        let store = MemoryKnowledgeStore::new();
        let config = RetrievalConfig {
            chunk_size: 40,
            chunk_overlap: 0,
            ..RetrievalConfig::default()
        };
        let document = DocumentRecord {
            id: "handbook".to_string(),
            title: "Handbook".to_string(),
            category: "general".to_string(),
            language: "en".to_string(),
        };

        let long = "The library opens at nine. ".repeat(10);
        let first = ingest_document(&store, &document, &long, &config).unwrap();
        assert!(first > 1);

        ingest_document(&store, &document, "Short now.", &config).unwrap();
        assert_eq!(store.stats().unwrap().chunks, 1);
    }

    #[test]
    fn test_missing_path_is_error() {
        let store = MemoryKnowledgeStore::new();
        let result = ingest_paths(
            &store,
            &[PathBuf::from("/nonexistent/campus-docs")],
            &IngestOptions::default(),
            &RetrievalConfig::default(),
        );
        assert!(result.is_err());
    }
}
