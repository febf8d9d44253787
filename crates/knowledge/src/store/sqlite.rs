//! SQLite-backed knowledge store.

use super::{chunk_to_item, faq_to_item, require_faq_id, KnowledgeStore};
use crate::types::{DocumentChunk, DocumentRecord, FaqEntry, KnowledgeItem, KnowledgeStats};
use campus_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS faqs (
    id TEXT PRIMARY KEY,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    category TEXT NOT NULL,
    language TEXT NOT NULL,
    keywords TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    category TEXT NOT NULL,
    language TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    FOREIGN KEY (document_id) REFERENCES documents(id)
);

CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id);

CREATE TABLE IF NOT EXISTS embeddings (
    item_id TEXT NOT NULL,
    model TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    vector BLOB NOT NULL,
    PRIMARY KEY (item_id, model)
);
"#;

/// Knowledge store persisted in a SQLite database.
pub struct SqliteKnowledgeStore {
    conn: Mutex<Connection>,
}

fn unavailable(context: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::KnowledgeStoreUnavailable(format!("{}: {}", context, e))
}

impl SqliteKnowledgeStore {
    /// Open (or create) the store at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::KnowledgeStoreUnavailable(format!(
                    "Failed to create store directory: {}",
                    e
                ))
            })?;
        }

        let conn = Connection::open(db_path).map_err(unavailable("Failed to open SQLite store"))?;
        let store = Self::from_connection(conn)?;
        tracing::debug!("Opened knowledge store at {:?}", db_path);
        Ok(store)
    }

    /// In-process SQLite database, mainly for tests.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(unavailable("Failed to open SQLite store"))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(unavailable("Failed to create tables"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            AppError::KnowledgeStoreUnavailable("Knowledge store lock poisoned".to_string())
        })
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn row_to_faq(row: &rusqlite::Row<'_>) -> rusqlite::Result<(FaqEntry, String)> {
    let keywords_json: String = row.get(5)?;
    let keywords: Vec<String> = serde_json::from_str(&keywords_json).unwrap_or_default();
    Ok((
        FaqEntry {
            id: row.get(0)?,
            question: row.get(1)?,
            answer: row.get(2)?,
            category: row.get(3)?,
            language: row.get(4)?,
            keywords,
            priority: row.get(6)?,
            active: row.get::<_, i64>(7)? != 0,
        },
        row.get(8)?,
    ))
}

const FAQ_COLUMNS: &str =
    "id, question, answer, category, language, keywords, priority, active, updated_at";

impl KnowledgeStore for SqliteKnowledgeStore {
    fn upsert_faq(&self, faq: &FaqEntry) -> AppResult<()> {
        require_faq_id(faq)?;
        let keywords = serde_json::to_string(&faq.keywords)?;
        let conn = self.conn()?;

        // Keep the timestamp when nothing changed so reindexing stays stable
        let existing: Option<(FaqEntry, String)> = conn
            .query_row(
                &format!("SELECT {} FROM faqs WHERE id = ?1", FAQ_COLUMNS),
                params![faq.id],
                row_to_faq,
            )
            .optional()
            .map_err(unavailable("Failed to read FAQ"))?;
        if let Some((current, _)) = existing {
            if &current == faq {
                return Ok(());
            }
        }

        conn.execute(
            "INSERT OR REPLACE INTO faqs (id, question, answer, category, language, keywords, priority, active, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                faq.id,
                faq.question,
                faq.answer,
                faq.category,
                faq.language,
                keywords,
                faq.priority,
                faq.active as i64,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(unavailable("Failed to upsert FAQ"))?;

        Ok(())
    }

    fn set_faq_active(&self, id: &str, active: bool) -> AppResult<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE faqs SET active = ?2, updated_at = ?3 WHERE id = ?1 AND active != ?2",
                params![id, active as i64, Utc::now().to_rfc3339()],
            )
            .map_err(unavailable("Failed to update FAQ"))?;
        if changed > 0 {
            return Ok(true);
        }

        let exists: bool = conn
            .query_row("SELECT COUNT(*) FROM faqs WHERE id = ?1", params![id], |row| {
                row.get::<_, i64>(0).map(|n| n > 0)
            })
            .map_err(unavailable("Failed to read FAQ"))?;
        Ok(exists)
    }

    fn list_faqs(&self) -> AppResult<Vec<FaqEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM faqs ORDER BY priority DESC, id ASC",
                FAQ_COLUMNS
            ))
            .map_err(unavailable("Failed to prepare query"))?;
        let faqs = stmt
            .query_map([], row_to_faq)
            .map_err(unavailable("Failed to query FAQs"))?
            .map(|r| r.map(|(faq, _)| faq))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(unavailable("Failed to read FAQ row"))?;
        Ok(faqs)
    }

    fn replace_document(
        &self,
        document: &DocumentRecord,
        chunks: &[DocumentChunk],
    ) -> AppResult<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(unavailable("Failed to begin transaction"))?;

        tx.execute(
            "DELETE FROM chunks WHERE document_id = ?1",
            params![document.id],
        )
        .map_err(unavailable("Failed to delete chunks"))?;

        tx.execute(
            "INSERT OR REPLACE INTO documents (id, title, category, language, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                document.id,
                document.title,
                document.category,
                document.language,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(unavailable("Failed to insert document"))?;

        for chunk in chunks {
            tx.execute(
                "INSERT OR REPLACE INTO chunks (id, document_id, position, text)
                 VALUES (?1, ?2, ?3, ?4)",
                params![chunk.id, document.id, chunk.position as i64, chunk.text],
            )
            .map_err(unavailable("Failed to insert chunk"))?;
        }

        tx.commit()
            .map_err(unavailable("Failed to commit document"))?;

        tracing::debug!(
            "Stored document {} with {} chunks",
            document.id,
            chunks.len()
        );
        Ok(())
    }

    fn remove_document(&self, document_id: &str) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(unavailable("Failed to begin transaction"))?;
        tx.execute(
            "DELETE FROM chunks WHERE document_id = ?1",
            params![document_id],
        )
        .map_err(unavailable("Failed to delete chunks"))?;
        let removed = tx
            .execute("DELETE FROM documents WHERE id = ?1", params![document_id])
            .map_err(unavailable("Failed to delete document"))?;
        tx.commit()
            .map_err(unavailable("Failed to commit removal"))?;
        Ok(removed > 0)
    }

    fn active_items(&self) -> AppResult<Vec<KnowledgeItem>> {
        let conn = self.conn()?;
        let mut items = Vec::new();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM faqs WHERE active = 1 ORDER BY id",
                FAQ_COLUMNS
            ))
            .map_err(unavailable("Failed to prepare query"))?;
        let faqs = stmt
            .query_map([], row_to_faq)
            .map_err(unavailable("Failed to query FAQs"))?;
        for row in faqs {
            let (faq, updated_at) = row.map_err(unavailable("Failed to read FAQ row"))?;
            items.push(faq_to_item(&faq, parse_timestamp(&updated_at)));
        }

        let mut stmt = conn
            .prepare(
                "SELECT d.id, d.title, d.category, d.language, d.updated_at, c.id, c.position, c.text
                 FROM chunks c JOIN documents d ON c.document_id = d.id
                 ORDER BY c.id",
            )
            .map_err(unavailable("Failed to prepare query"))?;
        let chunks = stmt
            .query_map([], |row| {
                let document = DocumentRecord {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    category: row.get(2)?,
                    language: row.get(3)?,
                };
                let updated_at: String = row.get(4)?;
                let chunk = DocumentChunk {
                    id: row.get(5)?,
                    document_id: document.id.clone(),
                    position: row.get::<_, i64>(6)? as u32,
                    text: row.get(7)?,
                };
                Ok((document, chunk, updated_at))
            })
            .map_err(unavailable("Failed to query chunks"))?;
        for row in chunks {
            let (document, chunk, updated_at) =
                row.map_err(unavailable("Failed to read chunk row"))?;
            items.push(chunk_to_item(&document, &chunk, parse_timestamp(&updated_at)));
        }

        Ok(items)
    }

    fn cached_embedding(
        &self,
        item_id: &str,
        model: &str,
        content_hash: &str,
    ) -> AppResult<Option<Vec<f32>>> {
        let conn = self.conn()?;
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                "SELECT vector FROM embeddings WHERE item_id = ?1 AND model = ?2 AND content_hash = ?3",
                params![item_id, model, content_hash],
                |row| row.get(0),
            )
            .optional()
            .map_err(unavailable("Failed to read embedding"))?;

        bytes.map(|b| bytes_to_embedding(&b)).transpose()
    }

    fn store_embedding(
        &self,
        item_id: &str,
        model: &str,
        content_hash: &str,
        embedding: &[f32],
    ) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO embeddings (item_id, model, content_hash, vector)
             VALUES (?1, ?2, ?3, ?4)",
            params![item_id, model, content_hash, embedding_to_bytes(embedding)],
        )
        .map_err(unavailable("Failed to store embedding"))?;
        Ok(())
    }

    fn stats(&self) -> AppResult<KnowledgeStats> {
        let conn = self.conn()?;
        let count = |sql: &str| -> AppResult<usize> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0).map(|v| v as usize))
                .map_err(unavailable("Failed to count rows"))
        };

        Ok(KnowledgeStats {
            faqs: count("SELECT COUNT(*) FROM faqs")?,
            active_faqs: count("SELECT COUNT(*) FROM faqs WHERE active = 1")?,
            documents: count("SELECT COUNT(*) FROM documents")?,
            chunks: count("SELECT COUNT(*) FROM chunks")?,
            cached_embeddings: count("SELECT COUNT(*) FROM embeddings")?,
        })
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::chunk_document;
    use crate::types::SourceType;
    use tempfile::TempDir;

    fn fee_faq() -> FaqEntry {
        FaqEntry {
            id: "faq-fees".to_string(),
            question: "What is the fee structure?".to_string(),
            answer: "The annual fee is ₹50,000.".to_string(),
            category: "fees".to_string(),
            language: "en".to_string(),
            keywords: vec!["fee".to_string(), "tuition".to_string()],
            priority: 5,
            active: true,
        }
    }

    #[test]
    fn test_faq_roundtrip_and_items() {
        let temp = TempDir::new().unwrap();
        let store = SqliteKnowledgeStore::open(&temp.path().join("kb.db")).unwrap();
        store.upsert_faq(&fee_faq()).unwrap();

        let faqs = store.list_faqs().unwrap();
        assert_eq!(faqs, vec![fee_faq()]);

        let items = store.active_items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_type, SourceType::Faq);
        assert_eq!(items[0].keywords, vec!["fee", "tuition"]);
        assert!(items[0].text.contains("₹50,000"));
    }

    #[test]
    fn test_unchanged_upsert_keeps_timestamp() {
        let store = SqliteKnowledgeStore::open_in_memory().unwrap();
        store.upsert_faq(&fee_faq()).unwrap();
        let first = store.active_items().unwrap()[0].indexed_at;
        store.upsert_faq(&fee_faq()).unwrap();
        let second = store.active_items().unwrap()[0].indexed_at;
        assert_eq!(first, second);
    }

    #[test]
    fn test_inactive_faq_not_indexed() {
        let store = SqliteKnowledgeStore::open_in_memory().unwrap();
        store.upsert_faq(&fee_faq()).unwrap();
        assert!(store.set_faq_active("faq-fees", false).unwrap());
        assert!(store.active_items().unwrap().is_empty());
        assert!(!store.set_faq_active("missing", false).unwrap());

        let stats = store.stats().unwrap();
        assert_eq!(stats.faqs, 1);
        assert_eq!(stats.active_faqs, 0);
    }

    #[test]
    fn test_faq_without_id_rejected() {
        let store = SqliteKnowledgeStore::open_in_memory().unwrap();
        let mut faq = fee_faq();
        faq.id.clear();
        assert!(matches!(store.upsert_faq(&faq), Err(AppError::Knowledge(_))));
    }

    #[test]
    fn test_replace_document_swaps_chunks() {
        let store = SqliteKnowledgeStore::open_in_memory().unwrap();
        let doc = DocumentRecord {
            id: "prospectus".to_string(),
            title: "Prospectus 2024".to_string(),
            category: "admission".to_string(),
            language: "en".to_string(),
        };

        let long = "Admission requires the class 12 marksheet. ".repeat(60);
        let chunks = chunk_document(&doc.id, &long, 300, 50).unwrap();
        store.replace_document(&doc, &chunks).unwrap();
        assert_eq!(store.stats().unwrap().chunks, chunks.len());

        let short = chunk_document(&doc.id, "Admission opens in June.", 300, 50).unwrap();
        store.replace_document(&doc, &short).unwrap();
        let items = store.active_items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Prospectus 2024");
        assert_eq!(items[0].document_id.as_deref(), Some("prospectus"));

        assert!(store.remove_document("prospectus").unwrap());
        assert!(store.active_items().unwrap().is_empty());
    }

    #[test]
    fn test_embedding_cache_keyed_by_hash() {
        let store = SqliteKnowledgeStore::open_in_memory().unwrap();
        store
            .store_embedding("faq-fees", "trigram-v1", "h1", &[0.5, -0.25])
            .unwrap();

        assert_eq!(
            store.cached_embedding("faq-fees", "trigram-v1", "h1").unwrap(),
            Some(vec![0.5, -0.25])
        );
        assert_eq!(
            store.cached_embedding("faq-fees", "trigram-v1", "h2").unwrap(),
            None
        );
    }
}
