//! In-process session store for tests and `:memory:` deployments.

use super::SessionStore;
use crate::types::{EscalationRecord, EscalationStatus, Session, Turn};
use campus_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    sessions: HashMap<String, Session>,
    escalations: Vec<EscalationRecord>,
}

/// Session store held entirely in memory.
#[derive(Default)]
pub struct MemorySessionStore {
    state: Mutex<MemoryState>,
}

impl MemoryState {
    /// Returns `false` when the turn already has a record.
    fn insert_escalation(&mut self, record: &EscalationRecord) -> bool {
        let exists = self
            .escalations
            .iter()
            .any(|r| r.session_id == record.session_id && r.turn_id == record.turn_id);
        if !exists {
            self.escalations.push(record.clone());
        }
        !exists
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Session("Session store lock poisoned".to_string()))
    }
}

fn missing(session_id: &str) -> AppError {
    AppError::Session(format!("Unknown session {}", session_id))
}

impl SessionStore for MemorySessionStore {
    fn create_session(&self, session: &Session) -> AppResult<()> {
        let mut state = self.state()?;
        let stored = Session {
            turns: Vec::new(),
            ..session.clone()
        };
        state.sessions.insert(session.id.clone(), stored);
        Ok(())
    }

    fn load_session(&self, id: &str) -> AppResult<Option<Session>> {
        Ok(self.state()?.sessions.get(id).cloned())
    }

    fn append_turn(&self, session_id: &str, turn: &Turn) -> AppResult<()> {
        let mut state = self.state()?;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| missing(session_id))?;
        session.turns.push(turn.clone());
        session.last_active = turn.timestamp;
        Ok(())
    }

    fn append_exchange(
        &self,
        session_id: &str,
        user: &Turn,
        assistant: &Turn,
        escalation: Option<&EscalationRecord>,
    ) -> AppResult<bool> {
        let mut state = self.state()?;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| missing(session_id))?;
        session.turns.push(user.clone());
        session.turns.push(assistant.clone());
        session.last_active = session.last_active.max(assistant.timestamp);
        Ok(escalation.is_some_and(|record| state.insert_escalation(record)))
    }

    fn update_session(&self, session: &Session) -> AppResult<()> {
        let mut state = self.state()?;
        let stored = state
            .sessions
            .get_mut(&session.id)
            .ok_or_else(|| missing(&session.id))?;
        stored.language = session.language.clone();
        stored.last_intent = session.last_intent.clone();
        stored.expired = session.expired;
        Ok(())
    }

    fn inactive_sessions(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<String>> {
        let state = self.state()?;
        let mut ids: Vec<String> = state
            .sessions
            .values()
            .filter(|s| !s.expired && s.last_active < cutoff)
            .map(|s| s.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn expire_if_inactive(&self, session_id: &str, cutoff: DateTime<Utc>) -> AppResult<bool> {
        let mut state = self.state()?;
        match state.sessions.get_mut(session_id) {
            Some(session) if !session.expired && session.last_active < cutoff => {
                session.expired = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn record_escalation(&self, record: &EscalationRecord) -> AppResult<bool> {
        Ok(self.state()?.insert_escalation(record))
    }

    fn list_escalations(
        &self,
        status: Option<EscalationStatus>,
    ) -> AppResult<Vec<EscalationRecord>> {
        let state = self.state()?;
        let mut records: Vec<EscalationRecord> = state
            .escalations
            .iter()
            .filter(|r| status.map(|s| r.status == s).unwrap_or(true))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    fn resolve_escalation(&self, id: &str, assignee: &str) -> AppResult<bool> {
        let mut state = self.state()?;
        match state
            .escalations
            .iter_mut()
            .find(|r| r.id == id && r.status == EscalationStatus::Pending)
        {
            Some(record) => {
                record.status = EscalationStatus::Resolved;
                record.assignee = Some(assignee.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
