//! Registry of live gateway sessions.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

/// Opaque, server-assigned session identifier.
pub type SessionId = String;

/// Shared set of currently connected session IDs.
///
/// A single `parking_lot::Mutex` guards a copy-on-write set. Taking a
/// snapshot only clones the `Arc`; a mutation clones the set if (and only if)
/// a snapshot is still alive, so readers never observe a partial update.
pub struct SessionRegistry {
    sessions: Mutex<Arc<HashSet<SessionId>>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(Arc::new(HashSet::new())),
        }
    }

    /// Register a session. Returns `false` if it was already present.
    pub fn add(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock();
        if sessions.contains(session_id) {
            return false;
        }
        Arc::make_mut(&mut *sessions).insert(session_id.to_string())
    }

    /// Deregister a session. Returns `false` if it was not present.
    pub fn remove(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock();
        if !sessions.contains(session_id) {
            return false;
        }
        Arc::make_mut(&mut *sessions).remove(session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().contains(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Point-in-time copy of the membership, safe to iterate while sessions
    /// come and go.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.sessions.lock().clone())
    }
}

/// Immutable view of the registry at the moment it was taken.
#[derive(Debug, Clone)]
pub struct Snapshot(Arc<HashSet<SessionId>>);

impl Snapshot {
    pub fn iter(&self) -> impl Iterator<Item = &SessionId> {
        self.0.iter()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.0.contains(session_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
