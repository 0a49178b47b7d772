use std::sync::Arc;

use fawtara::{MemoryStore, PortalClient, SessionStore};

/// Shared handler state: the portal client plus the session registry,
/// passed in explicitly so tests can swap either.
#[derive(Clone)]
pub struct AppState {
    pub portal: PortalClient,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(portal: PortalClient) -> Self {
        Self::with_store(portal, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(portal: PortalClient, sessions: Arc<dyn SessionStore>) -> Self {
        Self { portal, sessions }
    }
}
