//! Session lifecycle and per-session serialization.
//!
//! Every request for a session runs while holding that session's lock, so
//! turns are appended strictly one exchange at a time. The expiry sweep only
//! evicts sessions whose lock it can take without waiting, and the store
//! re-checks inactivity atomically before marking a session expired.

use crate::session_store::SessionStore;
use crate::types::{EscalationRecord, Session, SessionPhase, Turn};
use campus_core::config::SessionConfig;
use campus_core::{AppError, AppResult};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

/// Exclusive access to one session for the duration of a request.
pub struct SessionGuard {
    session: Session,
    _lock: OwnedMutexGuard<()>,
}

impl SessionGuard {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn id(&self) -> &str {
        &self.session.id
    }
}

/// Owns conversation state; the only way to read or change a session.
pub struct ContextManager {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ContextManager {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn idle_after(&self) -> Duration {
        Duration::seconds(self.config.idle_after_secs as i64)
    }

    fn expire_after(&self) -> Duration {
        Duration::seconds(self.config.expire_after_secs as i64)
    }

    fn lock_for(&self, session_id: &str) -> AppResult<Arc<AsyncMutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| AppError::Session("Session lock table poisoned".to_string()))?;
        Ok(Arc::clone(
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        ))
    }

    /// Open a session for a request, waiting for any in-flight request on
    /// the same session to finish.
    ///
    /// An unknown, missing or expired id yields a fresh session in
    /// `language`.
    pub async fn begin(&self, session_id: Option<&str>, language: &str) -> AppResult<SessionGuard> {
        if let Some(id) = session_id.filter(|id| !id.trim().is_empty()) {
            let lock = self.lock_for(id)?.lock_owned().await;
            match self.store.load_session(id)? {
                Some(mut session) => {
                    let phase = session.phase(Utc::now(), self.idle_after(), self.expire_after());
                    if phase != SessionPhase::Expired {
                        tracing::debug!(session = %id, ?phase, "Resuming session");
                        return Ok(SessionGuard {
                            session,
                            _lock: lock,
                        });
                    }

                    if !session.expired {
                        session.expired = true;
                        self.store.update_session(&session)?;
                    }
                    tracing::info!(session = %id, "Session expired, starting a new one");
                }
                None => tracing::debug!(session = %id, "Unknown session, starting a new one"),
            }
        }

        let session = Session::new(language);
        let lock = self.lock_for(&session.id)?.lock_owned().await;
        self.store.create_session(&session)?;
        tracing::info!(session = %session.id, language, "Created session");

        Ok(SessionGuard {
            session,
            _lock: lock,
        })
    }

    /// Persist a user turn, its reply and the reply's escalation record in
    /// one store write, then mirror the turns into the guarded session.
    ///
    /// On error neither the store nor the guard changes. Returns whether a
    /// new escalation record was stored.
    pub fn append_exchange(
        &self,
        guard: &mut SessionGuard,
        user: Turn,
        assistant: Turn,
        escalation: Option<&EscalationRecord>,
    ) -> AppResult<bool> {
        let recorded =
            self.store
                .append_exchange(&guard.session.id, &user, &assistant, escalation)?;
        let latest = user.timestamp.max(assistant.timestamp);
        if latest > guard.session.last_active {
            guard.session.last_active = latest;
        }
        guard.session.turns.push(user);
        guard.session.turns.push(assistant);
        Ok(recorded)
    }

    /// Record the language the student is now writing in.
    pub fn set_language(&self, guard: &mut SessionGuard, language: &str) -> AppResult<()> {
        if guard.session.language == language {
            return Ok(());
        }
        tracing::debug!(
            session = %guard.session.id,
            from = %guard.session.language,
            to = language,
            "Session language changed"
        );
        guard.session.language = language.to_string();
        self.store.update_session(&guard.session)
    }

    pub fn set_last_intent(&self, guard: &mut SessionGuard, intent: &str) -> AppResult<()> {
        if guard.session.last_intent.as_deref() == Some(intent) {
            return Ok(());
        }
        guard.session.last_intent = Some(intent.to_string());
        self.store.update_session(&guard.session)
    }

    /// Turns used as generation history.
    pub fn active_window<'a>(&self, guard: &'a SessionGuard) -> &'a [Turn] {
        guard.session.active_window(self.config.active_window_exchanges)
    }

    /// Expire sessions inactive for longer than the expiry timeout.
    ///
    /// Sessions with a request in flight are skipped and picked up by a
    /// later sweep. Returns the number of sessions expired.
    pub fn sweep_expired(&self) -> AppResult<usize> {
        let cutoff = Utc::now() - self.expire_after();
        let candidates = self.store.inactive_sessions(cutoff)?;
        let mut expired = 0;

        for id in candidates {
            let lock = self.lock_for(&id)?;
            let Ok(_guard) = lock.try_lock() else {
                tracing::debug!(session = %id, "Session busy, skipping expiry");
                continue;
            };

            if self.store.expire_if_inactive(&id, cutoff)? {
                expired += 1;
            }
        }

        self.prune_locks()?;

        if expired > 0 {
            tracing::info!(expired, "Expired inactive sessions");
        }
        Ok(expired)
    }

    /// Drop lock entries nobody else holds.
    fn prune_locks(&self) -> AppResult<()> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| AppError::Session("Session lock table poisoned".to_string()))?;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(())
    }

    /// Run [`Self::sweep_expired`] every `sweep_interval_secs` until the
    /// returned task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>) -> JoinHandle<()> {
        let period = std::time::Duration::from_secs(self.config.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = self.sweep_expired() {
                    tracing::error!(error = %e, "Session sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_store::MemorySessionStore;
    use crate::tests::harness::FlakySessionStore;
    use crate::types::{EscalationReason, TurnRole};
    use std::sync::atomic::Ordering;

    fn manager() -> ContextManager {
        ContextManager::new(Arc::new(MemorySessionStore::new()), SessionConfig::default())
    }

    #[tokio::test]
    async fn test_begin_creates_and_resumes() {
        let manager = manager();

        let id = {
            let mut guard = manager.begin(None, "hi").await.unwrap();
            assert_eq!(guard.session().language, "hi");
            manager
                .append_exchange(
                    &mut guard,
                    Turn::user("namaste", "hi"),
                    Turn::assistant("namaste!", "hi"),
                    None,
                )
                .unwrap();
            guard.id().to_string()
        };

        let guard = manager.begin(Some(&id), "en").await.unwrap();
        assert_eq!(guard.id(), id);
        assert_eq!(guard.session().turns.len(), 2);
        assert_eq!(guard.session().language, "hi");
    }

    #[tokio::test]
    async fn test_unknown_id_creates_new_session() {
        let manager = manager();
        let guard = manager.begin(Some("does-not-exist"), "en").await.unwrap();
        assert_ne!(guard.id(), "does-not-exist");
        assert!(guard.session().turns.is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_is_replaced() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = ContextManager::new(store.clone(), SessionConfig::default());

        let mut old = Session::new("en");
        old.last_active = Utc::now() - Duration::hours(25);
        store.create_session(&old).unwrap();

        let guard = manager.begin(Some(&old.id), "en").await.unwrap();
        assert_ne!(guard.id(), old.id);
        assert!(store.load_session(&old.id).unwrap().unwrap().expired);
    }

    #[tokio::test]
    async fn test_same_session_requests_are_serialized() {
        let manager = Arc::new(manager());
        let id = manager.begin(None, "en").await.unwrap().id().to_string();

        let mut tasks = Vec::new();
        for i in 0..8 {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                let mut guard = manager.begin(Some(&id), "en").await.unwrap();
                let history = guard.session().turns.len();
                tokio::task::yield_now().await;
                // Nobody else appended while the guard was held
                assert_eq!(guard.session().turns.len(), history);
                manager
                    .append_exchange(
                        &mut guard,
                        Turn::user(format!("q{}", i), "en"),
                        Turn::assistant(format!("a{}", i), "en"),
                        None,
                    )
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let guard = manager.begin(Some(&id), "en").await.unwrap();
        let turns = &guard.session().turns;
        assert_eq!(turns.len(), 16);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, TurnRole::User);
            assert_eq!(pair[1].role, TurnRole::Assistant);
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }

    #[tokio::test]
    async fn test_sweep_skips_busy_sessions() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = ContextManager::new(store.clone(), SessionConfig::default());

        let mut idle = Session::new("en");
        idle.last_active = Utc::now() - Duration::hours(30);
        store.create_session(&idle).unwrap();

        let mut busy = Session::new("en");
        busy.last_active = Utc::now() - Duration::hours(30);
        store.create_session(&busy).unwrap();

        let held = manager.lock_for(&busy.id).unwrap();
        let _in_flight = held.lock().await;

        assert_eq!(manager.sweep_expired().unwrap(), 1);
        assert!(store.load_session(&idle.id).unwrap().unwrap().expired);
        assert!(!store.load_session(&busy.id).unwrap().unwrap().expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_expires_sessions_periodically() {
        let store = Arc::new(MemorySessionStore::new());
        let config = SessionConfig {
            sweep_interval_secs: 60,
            ..SessionConfig::default()
        };
        let manager = Arc::new(ContextManager::new(store.clone(), config));
        let sweeper = Arc::clone(&manager).spawn_sweeper();

        // Created after the first sweep has already run
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        let mut stale = Session::new("en");
        stale.last_active = Utc::now() - Duration::hours(30);
        store.create_session(&stale).unwrap();

        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        assert!(!store.load_session(&stale.id).unwrap().unwrap().expired);

        tokio::time::sleep(std::time::Duration::from_secs(31)).await;
        assert!(store.load_session(&stale.id).unwrap().unwrap().expired);

        sweeper.abort();
        assert!(sweeper.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_failed_exchange_leaves_guard_unchanged() {
        let store = Arc::new(FlakySessionStore::default());
        let manager = ContextManager::new(store.clone(), SessionConfig::default());
        let mut guard = manager.begin(None, "en").await.unwrap();
        let last_active = guard.session().last_active;

        store.fail_exchanges.store(true, Ordering::SeqCst);
        let assistant = Turn::assistant("a", "en");
        let record = EscalationRecord::pending(
            guard.id(),
            &assistant.id,
            vec![EscalationReason::TriggerKeyword],
        );
        assert!(manager
            .append_exchange(&mut guard, Turn::user("q", "en"), assistant, Some(&record))
            .is_err());

        assert!(guard.session().turns.is_empty());
        assert_eq!(guard.session().last_active, last_active);
        let stored = store.load_session(guard.id()).unwrap().unwrap();
        assert!(stored.turns.is_empty());
        assert!(store.list_escalations(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_language_and_intent_persist() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = ContextManager::new(store.clone(), SessionConfig::default());

        let mut guard = manager.begin(None, "en").await.unwrap();
        manager.set_language(&mut guard, "pa").unwrap();
        manager.set_last_intent(&mut guard, "fees").unwrap();

        let stored = store.load_session(guard.id()).unwrap().unwrap();
        assert_eq!(stored.language, "pa");
        assert_eq!(stored.last_intent.as_deref(), Some("fees"));
    }

    #[tokio::test]
    async fn test_active_window_bounds_history() {
        let config = SessionConfig {
            active_window_exchanges: 2,
            ..SessionConfig::default()
        };
        let manager = ContextManager::new(Arc::new(MemorySessionStore::new()), config);

        let mut guard = manager.begin(None, "en").await.unwrap();
        for i in 0..4 {
            manager
                .append_exchange(
                    &mut guard,
                    Turn::user(format!("q{}", i), "en"),
                    Turn::assistant(format!("a{}", i), "en"),
                    None,
                )
                .unwrap();
        }

        let window = manager.active_window(&guard);
        assert_eq!(window.len(), 4);
        assert_eq!(window[0].content, "q2");
        assert_eq!(guard.session().turns.len(), 8);
    }
}
