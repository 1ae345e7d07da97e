//! Registry of live sessions keyed by session id

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::error::SessionError;
use crate::transport::StreamableTransport;

/// Map from session id to the transport serving that session
///
/// The lock is only taken for map operations and never held across an
/// await point.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<StreamableTransport>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transport under its session id; existing entries are kept
    pub fn register(
        &self,
        session_id: &str,
        transport: Arc<StreamableTransport>,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        if sessions.contains_key(session_id) {
            return Err(SessionError::AlreadyRegistered(session_id.to_string()));
        }

        sessions.insert(session_id.to_string(), transport);
        debug!("Registered session {} ({} live)", session_id, sessions.len());
        Ok(())
    }

    pub fn lookup(&self, session_id: &str) -> Option<Arc<StreamableTransport>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(session_id).cloned()
    }

    /// Remove a session if present
    pub fn remove(&self, session_id: &str) -> Option<Arc<StreamableTransport>> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let removed = sessions.remove(session_id);
        if removed.is_some() {
            debug!("Removed session {} ({} live)", session_id, sessions.len());
        }
        removed
    }

    pub fn contains(&self, session_id: &str) -> bool {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn session_ids(&self) -> Vec<String> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.keys().cloned().collect()
    }

    /// Remove and return every session
    pub fn drain(&self) -> Vec<(String, Arc<StreamableTransport>)> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.drain().collect()
    }
}
