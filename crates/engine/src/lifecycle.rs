//! Match lifecycle - owns the current session
//!
//! One match runs at a time. The manager creates it on first use, replaces it
//! once it has finished, and drops it when the last player leaves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use crate::session::{MatchSession, SessionConfig};

#[derive(Debug)]
pub struct MatchManager {
    config: SessionConfig,
    next_id: AtomicU64,
    current: Mutex<Option<Arc<MatchSession>>>,
}

impl MatchManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            current: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<MatchSession>>> {
        self.current.lock().unwrap_or_else(|poisoned| {
            warn!("match slot lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// The match new players join, created if there is none or the last one finished
    pub fn session(&self) -> Arc<MatchSession> {
        let mut slot = self.slot();
        if let Some(session) = slot.as_ref().filter(|s| !s.is_finished()) {
            return Arc::clone(session);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(MatchSession::new(id, self.config));
        info!(session = id, "match created");
        *slot = Some(Arc::clone(&session));
        session
    }

    /// The current match, if any
    pub fn current(&self) -> Option<Arc<MatchSession>> {
        self.slot().clone()
    }

    /// Drop `session` if it is current and either finished or empty
    ///
    /// Returns true when the session was released.
    pub fn release_if_done(&self, session: &Arc<MatchSession>) -> bool {
        let mut slot = self.slot();
        let is_current = slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, session));
        if !is_current || !(session.is_finished() || session.player_count() == 0) {
            return false;
        }
        info!(session = session.id(), "match released");
        *slot = None;
        true
    }
}

impl Default for MatchManager {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Intent;
    use crate::types::{ConnectionId, DiceRoll};

    #[test]
    fn test_session_created_lazily_and_reused() {
        let manager = MatchManager::default();
        assert!(manager.current().is_none());
        let a = manager.session();
        let b = manager.session();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_empty_session_is_released() {
        let manager = MatchManager::default();
        let session = manager.session();
        let (id, _) = session.join("ana", None, ConnectionId(1)).unwrap();
        assert!(!manager.release_if_done(&session));
        session.disconnect(id).unwrap();
        assert!(manager.release_if_done(&session));
        assert!(manager.current().is_none());
    }

    #[test]
    fn test_finished_session_is_replaced() {
        let manager = MatchManager::default();
        let session = manager.session();
        let (a, _) = session.join("ana", None, ConnectionId(1)).unwrap();
        let (b, _) = session.join("bo", None, ConnectionId(2)).unwrap();
        session.handle(a, Intent::Start).unwrap();
        session
            .handle(a, Intent::DetermineRoll(Some(DiceRoll::new(6, 6))))
            .unwrap();
        session
            .handle(b, Intent::DetermineRoll(Some(DiceRoll::new(1, 1))))
            .unwrap();
        assert!(session.snapshot().match_started);
        session.disconnect(b).unwrap();
        assert!(session.is_finished());

        let next = manager.session();
        assert!(!Arc::ptr_eq(&session, &next));
        assert_ne!(next.id(), session.id());
        assert_eq!(next.player_count(), 0);
    }
}
