use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::types::Session;

/// Registry of authenticated sessions keyed by opaque ids.
///
/// Entries are never updated after insertion and nothing evicts them; a
/// process restart is the only way they disappear. Handlers receive an
/// implementation by reference, so a bounded or external backing can be
/// swapped in without touching them.
pub trait SessionStore: Send + Sync {
    fn put(&self, id: String, session: Session);
    fn get(&self, id: &str) -> Option<Session>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn put(&self, id: String, session: Session) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, session);
    }

    fn get(&self, id: &str) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}
