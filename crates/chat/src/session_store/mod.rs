//! Persistent storage for sessions, turns and escalation records.
//!
//! Stores are synchronous and internally locked; the [`crate::ContextManager`]
//! serializes writes per session on top of them.

mod memory;
mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

use crate::types::{EscalationRecord, EscalationStatus, Session, Turn};
use campus_core::AppResult;
use chrono::{DateTime, Utc};

/// Storage for conversation state that survives process restarts.
pub trait SessionStore: Send + Sync {
    /// Persist a new session (without turns).
    fn create_session(&self, session: &Session) -> AppResult<()>;

    /// Load a session with its full turn history, oldest first.
    fn load_session(&self, id: &str) -> AppResult<Option<Session>>;

    /// Append a turn and advance the session's last-active time to the
    /// turn's timestamp.
    fn append_turn(&self, session_id: &str, turn: &Turn) -> AppResult<()>;

    /// Append a user turn and its reply, plus the reply's escalation record
    /// if any, as one all-or-nothing write.
    ///
    /// Returns whether a new escalation record was stored.
    fn append_exchange(
        &self,
        session_id: &str,
        user: &Turn,
        assistant: &Turn,
        escalation: Option<&EscalationRecord>,
    ) -> AppResult<bool>;

    /// Update session metadata: language, last intent and expiry flag.
    fn update_session(&self, session: &Session) -> AppResult<()>;

    /// Ids of unexpired sessions last active before `cutoff`.
    fn inactive_sessions(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<String>>;

    /// Mark the session expired if it is still inactive since `cutoff`.
    ///
    /// The check and the write are atomic, so a session touched after the
    /// sweep listed it is left alone. Returns whether it was expired.
    fn expire_if_inactive(&self, session_id: &str, cutoff: DateTime<Utc>) -> AppResult<bool>;

    /// Store an escalation record. Returns `false` if the turn already has
    /// one, in which case nothing is written.
    fn record_escalation(&self, record: &EscalationRecord) -> AppResult<bool>;

    /// Escalation records, newest first, optionally filtered by status.
    fn list_escalations(&self, status: Option<EscalationStatus>)
        -> AppResult<Vec<EscalationRecord>>;

    /// Resolve a pending record. Returns `false` if no pending record has
    /// this id.
    fn resolve_escalation(&self, id: &str, assignee: &str) -> AppResult<bool>;
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every store must share.

    use super::*;
    use crate::types::{EscalationReason, Turn};
    use chrono::Duration;

    pub fn turns_keep_order(store: &dyn SessionStore) {
        let session = Session::new("hi");
        store.create_session(&session).unwrap();

        for i in 0..4 {
            store
                .append_turn(&session.id, &Turn::user(format!("q{}", i), "hi"))
                .unwrap();
            store
                .append_turn(&session.id, &Turn::assistant(format!("a{}", i), "hi"))
                .unwrap();
        }

        let loaded = store.load_session(&session.id).unwrap().unwrap();
        let contents: Vec<&str> = loaded.turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["q0", "a0", "q1", "a1", "q2", "a2", "q3", "a3"]
        );
        assert_eq!(loaded.language, "hi");
        assert!(store.load_session("missing").unwrap().is_none());
    }

    pub fn metadata_updates(store: &dyn SessionStore) {
        let mut session = Session::new("en");
        store.create_session(&session).unwrap();

        session.language = "gu".to_string();
        session.last_intent = Some("hostel".to_string());
        store.update_session(&session).unwrap();

        let loaded = store.load_session(&session.id).unwrap().unwrap();
        assert_eq!(loaded.language, "gu");
        assert_eq!(loaded.last_intent.as_deref(), Some("hostel"));
        assert!(!loaded.expired);
    }

    pub fn expiry_is_conditional(store: &dyn SessionStore) {
        let mut stale = Session::new("en");
        stale.last_active = Utc::now() - Duration::hours(30);
        store.create_session(&stale).unwrap();

        let fresh = Session::new("en");
        store.create_session(&fresh).unwrap();

        let cutoff = Utc::now() - Duration::hours(24);
        assert_eq!(store.inactive_sessions(cutoff).unwrap(), vec![stale.id.clone()]);

        // A message arriving before eviction keeps the session alive
        store
            .append_turn(&stale.id, &Turn::user("still here", "en"))
            .unwrap();
        assert!(!store.expire_if_inactive(&stale.id, cutoff).unwrap());

        let later = Utc::now() + Duration::seconds(1);
        assert!(store.expire_if_inactive(&fresh.id, later).unwrap());
        assert!(store.load_session(&fresh.id).unwrap().unwrap().expired);
        assert!(!store.expire_if_inactive(&fresh.id, later).unwrap());
    }

    pub fn escalations_once_per_turn(store: &dyn SessionStore) {
        let record = EscalationRecord::pending("s1", "t1", vec![EscalationReason::LowConfidence]);
        assert!(store.record_escalation(&record).unwrap());

        let duplicate =
            EscalationRecord::pending("s1", "t1", vec![EscalationReason::TriggerKeyword]);
        assert!(!store.record_escalation(&duplicate).unwrap());

        let other = EscalationRecord::pending("s1", "t2", vec![EscalationReason::RateLimited]);
        assert!(store.record_escalation(&other).unwrap());

        let pending = store
            .list_escalations(Some(EscalationStatus::Pending))
            .unwrap();
        assert_eq!(pending.len(), 2);

        assert!(store.resolve_escalation(&record.id, "registrar").unwrap());
        assert!(!store.resolve_escalation(&record.id, "registrar").unwrap());
        assert!(!store.resolve_escalation("missing", "registrar").unwrap());

        let resolved = store
            .list_escalations(Some(EscalationStatus::Resolved))
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].assignee.as_deref(), Some("registrar"));
        assert_eq!(resolved[0].reasons, vec![EscalationReason::LowConfidence]);
        assert_eq!(store.list_escalations(None).unwrap().len(), 2);
    }

    pub fn exchange_is_atomic(store: &dyn SessionStore) {
        let session = Session::new("en");
        store.create_session(&session).unwrap();

        let user = Turn::user("I want to file a complaint", "en");
        let assistant = Turn {
            escalated: true,
            ..Turn::assistant("A staff member will follow up.", "en")
        };
        let record = EscalationRecord::pending(
            &session.id,
            &assistant.id,
            vec![EscalationReason::TriggerKeyword],
        );
        assert!(store
            .append_exchange(&session.id, &user, &assistant, Some(&record))
            .unwrap());

        let loaded = store.load_session(&session.id).unwrap().unwrap();
        let ids: Vec<&str> = loaded.turns.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![user.id.as_str(), assistant.id.as_str()]);
        assert!(loaded.last_active >= assistant.timestamp - Duration::milliseconds(1));

        let records = store.list_escalations(None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].turn_id, assistant.id);

        // A second exchange without escalation leaves the records alone
        let follow_up = Turn::user("thanks", "en");
        let reply = Turn::assistant("You're welcome.", "en");
        assert!(!store
            .append_exchange(&session.id, &follow_up, &reply, None)
            .unwrap());
        assert_eq!(store.load_session(&session.id).unwrap().unwrap().turns.len(), 4);
        assert_eq!(store.list_escalations(None).unwrap().len(), 1);
    }
}
