//! Session credential holder.
//!
//! Lifecycle: init → set-on-login → clear-on-401-or-logout. Holds at
//! most one bearer token. The first read is lazy against the durable
//! store so a restart survives without re-login. Built as an injectable
//! object handed to `ApiClient` by construction — not a module-level
//! singleton — so tests get isolated sessions.

use std::sync::{Arc, RwLock};

use crate::store::LocalStore;

pub struct Session {
    token: RwLock<Option<String>>,
    store: Arc<LocalStore>,
}

impl Session {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            token: RwLock::new(None),
            store,
        }
    }

    /// Current token, pulling from durable storage on first read.
    pub fn get(&self) -> Option<String> {
        if let Some(token) = self.token.read().ok().and_then(|g| g.clone()) {
            return Some(token);
        }
        let durable = self.store.load_token();
        if let Some(ref token) = durable {
            if let Ok(mut guard) = self.token.write() {
                *guard = Some(token.clone());
            }
        }
        durable
    }

    /// Set the token (login). Dual-writes to durable storage.
    pub fn set(&self, token: &str) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.to_string());
        }
        if let Err(e) = self.store.store_token(token) {
            tracing::warn!(error = %e, "failed to persist session token");
        }
    }

    /// Clear the token (logout or 401). Removes both the in-memory and
    /// durable copy so no later request carries a stale credential.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
        self.store.clear_token();
        tracing::info!("session cleared");
    }

    pub fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (tempfile::TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        (dir, Session::new(store))
    }

    #[test]
    fn starts_unauthenticated() {
        let (_dir, session) = session();
        assert!(!session.is_authenticated());
        assert!(session.get().is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let (_dir, session) = session();
        session.set("tok-1");
        assert_eq!(session.get().as_deref(), Some("tok-1"));
    }

    #[test]
    fn survives_a_fresh_holder_via_durable_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        Session::new(Arc::clone(&store)).set("tok-2");

        // Simulated restart: new holder, same backing store.
        let revived = Session::new(store);
        assert_eq!(revived.get().as_deref(), Some("tok-2"));
    }

    #[test]
    fn clear_removes_memory_and_durable_copies() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        let session = Session::new(Arc::clone(&store));
        session.set("tok-3");
        session.clear();
        assert!(session.get().is_none());
        assert!(store.load_token().is_none());
    }
}
