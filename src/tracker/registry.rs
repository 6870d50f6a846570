use super::session::{Session, SessionKey};
use std::collections::HashMap;

/// Owns every live session. Removal always cancels the session's pending
/// timers so an orphaned timer can never fire against a removed entry.
pub struct SessionRegistry {
    sessions: HashMap<SessionKey, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.contains_key(key)
    }

    pub fn get_mut(&mut self, key: &SessionKey) -> Option<&mut Session> {
        self.sessions.get_mut(key)
    }

    /// Only called for absent keys, by contract of the tracker.
    pub fn insert(&mut self, key: SessionKey, session: Session) {
        self.sessions.insert(key, session);
    }

    pub fn remove(&mut self, key: &SessionKey) -> Option<Session> {
        let mut session = self.sessions.remove(key)?;
        session.cancel_timers();
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
