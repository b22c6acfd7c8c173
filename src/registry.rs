//! Connection directory
//!
//! Thread-safe mapping from connection identifier to a weak connection
//! handle. An identifier present here denotes a connection still eligible
//! to receive broadcasts. The registry never owns a connection: only a
//! connection's own in-flight socket tasks keep it alive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, warn};

use crate::connection::Connection;
use crate::types::ConnectionId;

#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<HashMap<ConnectionId, Weak<Connection>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Weak<Connection>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a record for `id`. Calling twice for the same identifier
    /// overwrites the previous record.
    pub fn add_user(&self, id: ConnectionId, conn: Weak<Connection>) {
        self.lock().insert(id, conn);
        debug!(%id, "user inserted");
    }

    /// Remove the record for `id` if present. Returns whether removal
    /// occurred; removing an absent identifier is logged, never fatal.
    pub fn remove_user(&self, id: ConnectionId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!(%id, "user erased");
        } else {
            warn!(%id, "no such user to erase");
        }
        removed
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Visit every live connection currently in the directory.
    ///
    /// The registry lock is held for the whole traversal: the visitor must
    /// not call back into `add_user`/`remove_user`. Entries whose
    /// connection has already been dropped are skipped.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&Arc<Connection>),
    {
        for entry in self.lock().values() {
            if let Some(conn) = entry.upgrade() {
                visit(&conn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dangling() -> Weak<Connection> {
        Weak::new()
    }

    #[test]
    fn test_add_and_contains() {
        let registry = Registry::new();
        assert!(registry.is_empty());

        registry.add_user(ConnectionId(10_000), dangling());
        assert!(registry.contains(ConnectionId(10_000)));
        assert!(!registry.contains(ConnectionId(10_001)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_twice_overwrites() {
        let registry = Registry::new();
        registry.add_user(ConnectionId(10_000), dangling());
        registry.add_user(ConnectionId(10_000), dangling());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = Registry::new();
        registry.add_user(ConnectionId(10_000), dangling());

        assert!(registry.remove_user(ConnectionId(10_000)));
        assert!(!registry.remove_user(ConnectionId(10_000)));
        assert!(!registry.contains(ConnectionId(10_000)));
    }

    #[test]
    fn test_remove_absent_id_is_a_noop() {
        let registry = Registry::new();
        assert!(!registry.remove_user(ConnectionId(99)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_for_each_skips_dead_handles() {
        let registry = Registry::new();
        registry.add_user(ConnectionId(10_000), dangling());
        registry.add_user(ConnectionId(10_001), dangling());

        let mut visited = 0;
        registry.for_each(|_conn| visited += 1);
        assert_eq!(visited, 0);
    }
}
