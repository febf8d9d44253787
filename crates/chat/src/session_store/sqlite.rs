//! SQLite-backed session store.

use super::SessionStore;
use crate::types::{
    Citation, EscalationReason, EscalationRecord, EscalationStatus, Session, Turn, TurnRole,
};
use campus_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    created_at INTEGER NOT NULL,
    last_active INTEGER NOT NULL,
    language TEXT NOT NULL,
    last_intent TEXT,
    expired INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_sessions_last_active ON sessions(last_active);

CREATE TABLE IF NOT EXISTS turns (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    session_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    pivot_text TEXT,
    timestamp INTEGER NOT NULL,
    detected_language TEXT,
    response_language TEXT,
    intent TEXT,
    confidence INTEGER,
    sources TEXT NOT NULL,
    escalated INTEGER NOT NULL DEFAULT 0,
    translation_degraded INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (session_id) REFERENCES sessions(id)
);

CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id, seq);

CREATE TABLE IF NOT EXISTS escalations (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    turn_id TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    status TEXT NOT NULL,
    assignee TEXT,
    reasons TEXT NOT NULL,
    UNIQUE (session_id, turn_id)
);
"#;

/// Session store persisted in a SQLite database.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

fn db_error(context: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::Session(format!("{}: {}", context, e))
}

impl SqliteSessionStore {
    /// Open (or create) the store at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path).map_err(db_error("Failed to open session store"))?;
        let store = Self::from_connection(conn)?;
        tracing::debug!("Opened session store at {:?}", db_path);
        Ok(store)
    }

    /// In-process SQLite database, mainly for tests.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(db_error("Failed to open session store"))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(db_error("Failed to configure session store"))?;
        conn.execute_batch(SCHEMA)
            .map_err(db_error("Failed to create tables"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Session("Session store lock poisoned".to_string()))
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        created_at: from_millis(row.get(1)?),
        last_active: from_millis(row.get(2)?),
        language: row.get(3)?,
        last_intent: row.get(4)?,
        expired: row.get::<_, i64>(5)? != 0,
        turns: Vec::new(),
    })
}

fn row_to_turn(row: &rusqlite::Row<'_>) -> rusqlite::Result<Turn> {
    let role: String = row.get(1)?;
    let sources_json: String = row.get(10)?;
    Ok(Turn {
        id: row.get(0)?,
        role: TurnRole::parse(&role).unwrap_or(TurnRole::User),
        content: row.get(2)?,
        pivot_text: row.get(3)?,
        timestamp: from_millis(row.get(4)?),
        detected_language: row.get(5)?,
        response_language: row.get(6)?,
        intent: row.get(7)?,
        confidence: row.get::<_, Option<i64>>(8)?.map(|c| c.clamp(0, 100) as u8),
        sources: serde_json::from_str::<Vec<Citation>>(&sources_json).unwrap_or_default(),
        escalated: row.get::<_, i64>(11)? != 0,
        translation_degraded: row.get::<_, i64>(9)? != 0,
    })
}

fn row_to_escalation(row: &rusqlite::Row<'_>) -> rusqlite::Result<EscalationRecord> {
    let status: String = row.get(4)?;
    let reasons_json: String = row.get(6)?;
    let reasons: Vec<String> = serde_json::from_str(&reasons_json).unwrap_or_default();
    Ok(EscalationRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        turn_id: row.get(2)?,
        created_at: from_millis(row.get(3)?),
        status: EscalationStatus::parse(&status).unwrap_or(EscalationStatus::Pending),
        assignee: row.get(5)?,
        reasons: reasons
            .iter()
            .filter_map(|r| EscalationReason::parse(r))
            .collect(),
    })
}

/// Advance `last_active`, failing if the session does not exist.
fn touch_session(conn: &Connection, session_id: &str, at: DateTime<Utc>) -> AppResult<()> {
    let updated = conn
        .execute(
            "UPDATE sessions SET last_active = MAX(last_active, ?2) WHERE id = ?1",
            params![session_id, at.timestamp_millis()],
        )
        .map_err(db_error("Failed to touch session"))?;
    if updated == 0 {
        return Err(AppError::Session(format!("Unknown session {}", session_id)));
    }
    Ok(())
}

fn insert_turn(conn: &Connection, session_id: &str, turn: &Turn) -> AppResult<()> {
    let sources = serde_json::to_string(&turn.sources)?;
    conn.execute(
        "INSERT INTO turns (id, session_id, role, content, pivot_text, timestamp,
                            detected_language, response_language, intent, confidence,
                            sources, escalated, translation_degraded)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            turn.id,
            session_id,
            turn.role.as_str(),
            turn.content,
            turn.pivot_text,
            turn.timestamp.timestamp_millis(),
            turn.detected_language,
            turn.response_language,
            turn.intent,
            turn.confidence.map(i64::from),
            sources,
            turn.escalated as i64,
            turn.translation_degraded as i64,
        ],
    )
    .map_err(db_error("Failed to append turn"))?;
    Ok(())
}

/// Returns `false` when the turn already has a record.
fn insert_escalation(conn: &Connection, record: &EscalationRecord) -> AppResult<bool> {
    let reasons: Vec<&str> = record.reasons.iter().map(|r| r.as_str()).collect();
    let reasons = serde_json::to_string(&reasons)?;
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO escalations
                (id, session_id, turn_id, created_at, status, assignee, reasons)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.session_id,
                record.turn_id,
                record.created_at.timestamp_millis(),
                record.status.as_str(),
                record.assignee,
                reasons,
            ],
        )
        .map_err(db_error("Failed to record escalation"))?;
    Ok(inserted > 0)
}

impl SessionStore for SqliteSessionStore {
    fn create_session(&self, session: &Session) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (id, created_at, last_active, language, last_intent, expired)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.id,
                session.created_at.timestamp_millis(),
                session.last_active.timestamp_millis(),
                session.language,
                session.last_intent,
                session.expired as i64,
            ],
        )
        .map_err(db_error("Failed to create session"))?;
        Ok(())
    }

    fn load_session(&self, id: &str) -> AppResult<Option<Session>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                "SELECT id, created_at, last_active, language, last_intent, expired
                 FROM sessions WHERE id = ?1",
                params![id],
                row_to_session,
            )
            .optional()
            .map_err(db_error("Failed to load session"))?;

        let Some(mut session) = session else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare(
                "SELECT id, role, content, pivot_text, timestamp, detected_language,
                        response_language, intent, confidence, translation_degraded,
                        sources, escalated
                 FROM turns WHERE session_id = ?1 ORDER BY seq",
            )
            .map_err(db_error("Failed to load turns"))?;
        session.turns = stmt
            .query_map(params![id], row_to_turn)
            .map_err(db_error("Failed to load turns"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error("Failed to load turns"))?;

        Ok(Some(session))
    }

    fn append_turn(&self, session_id: &str, turn: &Turn) -> AppResult<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(db_error("Failed to start transaction"))?;
        touch_session(&tx, session_id, turn.timestamp)?;
        insert_turn(&tx, session_id, turn)?;
        tx.commit().map_err(db_error("Failed to commit turn"))?;
        Ok(())
    }

    fn append_exchange(
        &self,
        session_id: &str,
        user: &Turn,
        assistant: &Turn,
        escalation: Option<&EscalationRecord>,
    ) -> AppResult<bool> {
        let mut conn = self.conn()?;
        // Dropping the transaction on any early return rolls it back
        let tx = conn
            .transaction()
            .map_err(db_error("Failed to start transaction"))?;
        touch_session(&tx, session_id, assistant.timestamp.max(user.timestamp))?;
        insert_turn(&tx, session_id, user)?;
        insert_turn(&tx, session_id, assistant)?;
        let recorded = match escalation {
            Some(record) => insert_escalation(&tx, record)?,
            None => false,
        };
        tx.commit().map_err(db_error("Failed to commit exchange"))?;
        Ok(recorded)
    }

    fn update_session(&self, session: &Session) -> AppResult<()> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE sessions SET language = ?2, last_intent = ?3, expired = ?4 WHERE id = ?1",
                params![
                    session.id,
                    session.language,
                    session.last_intent,
                    session.expired as i64
                ],
            )
            .map_err(db_error("Failed to update session"))?;
        if updated == 0 {
            return Err(AppError::Session(format!("Unknown session {}", session.id)));
        }
        Ok(())
    }

    fn inactive_sessions(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id FROM sessions WHERE expired = 0 AND last_active < ?1 ORDER BY id")
            .map_err(db_error("Failed to list sessions"))?;
        let ids = stmt
            .query_map(params![cutoff.timestamp_millis()], |row| row.get(0))
            .map_err(db_error("Failed to list sessions"))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(db_error("Failed to list sessions"))?;
        Ok(ids)
    }

    fn expire_if_inactive(&self, session_id: &str, cutoff: DateTime<Utc>) -> AppResult<bool> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE sessions SET expired = 1
                 WHERE id = ?1 AND expired = 0 AND last_active < ?2",
                params![session_id, cutoff.timestamp_millis()],
            )
            .map_err(db_error("Failed to expire session"))?;
        Ok(updated > 0)
    }

    fn record_escalation(&self, record: &EscalationRecord) -> AppResult<bool> {
        let conn = self.conn()?;
        insert_escalation(&conn, record)
    }

    fn list_escalations(
        &self,
        status: Option<EscalationStatus>,
    ) -> AppResult<Vec<EscalationRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, session_id, turn_id, created_at, status, assignee, reasons
                 FROM escalations
                 WHERE ?1 IS NULL OR status = ?1
                 ORDER BY created_at DESC, id",
            )
            .map_err(db_error("Failed to list escalations"))?;
        let records = stmt
            .query_map(params![status.map(|s| s.as_str())], row_to_escalation)
            .map_err(db_error("Failed to list escalations"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error("Failed to list escalations"))?;
        Ok(records)
    }

    fn resolve_escalation(&self, id: &str, assignee: &str) -> AppResult<bool> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE escalations SET status = 'resolved', assignee = ?2
                 WHERE id = ?1 AND status = 'pending'",
                params![id, assignee],
            )
            .map_err(db_error("Failed to resolve escalation"))?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::contract;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_turns_keep_order() {
        contract::turns_keep_order(&SqliteSessionStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_metadata_updates() {
        contract::metadata_updates(&SqliteSessionStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_expiry_is_conditional() {
        contract::expiry_is_conditional(&SqliteSessionStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_escalations_once_per_turn() {
        contract::escalations_once_per_turn(&SqliteSessionStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_exchange_is_atomic() {
        contract::exchange_is_atomic(&SqliteSessionStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_failed_exchange_writes_nothing() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let session = Session::new("en");
        store.create_session(&session).unwrap();

        let earlier = Turn::assistant("earlier answer", "en");
        store.append_turn(&session.id, &earlier).unwrap();

        // The assistant turn reuses an existing id, so its insert fails
        let user = Turn::user("new question", "en");
        let assistant = Turn {
            id: earlier.id.clone(),
            escalated: true,
            ..Turn::assistant("new answer", "en")
        };
        let record = EscalationRecord::pending(
            &session.id,
            &assistant.id,
            vec![EscalationReason::LowConfidence],
        );
        assert!(store
            .append_exchange(&session.id, &user, &assistant, Some(&record))
            .is_err());

        let loaded = store.load_session(&session.id).unwrap().unwrap();
        assert_eq!(loaded.turns.len(), 1);
        assert_eq!(loaded.turns[0].content, "earlier answer");
        assert!(store.list_escalations(None).unwrap().is_empty());
    }

    #[test]
    fn test_sessions_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("campus.db");

        let session = Session::new("ta");
        {
            let store = SqliteSessionStore::open(&path).unwrap();
            store.create_session(&session).unwrap();
            let turn = Turn {
                confidence: Some(72),
                sources: vec![Citation {
                    item_id: "faq-1".to_string(),
                    title: "Hostel".to_string(),
                    score: 0.8,
                }],
                translation_degraded: true,
                ..Turn::assistant("விடுதி உள்ளது", "ta")
            };
            store.append_turn(&session.id, &turn).unwrap();
        }

        let store = SqliteSessionStore::open(&path).unwrap();
        let loaded = store.load_session(&session.id).unwrap().unwrap();
        assert_eq!(loaded.turns.len(), 1);
        let turn = &loaded.turns[0];
        assert_eq!(turn.role, TurnRole::Assistant);
        assert_eq!(turn.confidence, Some(72));
        assert_eq!(turn.sources[0].item_id, "faq-1");
        assert!(turn.translation_degraded);
        assert!(!turn.escalated);
    }
}
