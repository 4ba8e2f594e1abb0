//! The connection-id to display-name bijection.

use super::{ConnectionId, Session};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Prefix of generated guest names.
pub const GUEST_NAME_PREFIX: &str = "webguest";

/// Errors raised by [`SessionRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("connection {0} already has a session")]
    DuplicateSession(ConnectionId),

    #[error("no session for {0}")]
    NotFound(String),
}

#[derive(Debug, Default)]
struct Inner {
    by_connection: HashMap<ConnectionId, Session>,
    by_name: HashMap<String, ConnectionId>,
    last_guest_id: u64,
}

/// Owner of every live [`Session`].
///
/// Both lookup directions sit behind one lock, so a reader can never observe a
/// name without its connection or the other way round.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection under the next guest name and returns the name.
    ///
    /// Guest ids are handed out sequentially starting at 1 and are never
    /// reused, even after the session that held them leaves.
    pub fn register(&self, connection_id: ConnectionId) -> Result<String, RegistryError> {
        let mut inner = self.write();
        if inner.by_connection.contains_key(&connection_id) {
            return Err(RegistryError::DuplicateSession(connection_id));
        }

        inner.last_guest_id += 1;
        let name = format!("{GUEST_NAME_PREFIX}{}", inner.last_guest_id);
        inner.by_name.insert(name.clone(), connection_id);
        inner
            .by_connection
            .insert(connection_id, Session::new(connection_id, name.clone()));
        Ok(name)
    }

    pub fn lookup_name(&self, connection_id: ConnectionId) -> Result<String, RegistryError> {
        self.read()
            .by_connection
            .get(&connection_id)
            .map(|session| session.display_name.clone())
            .ok_or_else(|| RegistryError::NotFound(format!("connection {connection_id}")))
    }

    pub fn lookup_connection(&self, name: &str) -> Result<ConnectionId, RegistryError> {
        self.read()
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::NotFound(format!("name {name:?}")))
    }

    /// Snapshot of a live session.
    pub fn session(&self, connection_id: ConnectionId) -> Option<Session> {
        self.read().by_connection.get(&connection_id).cloned()
    }

    /// Removes both directions of a session's mapping. Absent ids are a no-op.
    pub fn unregister(&self, connection_id: ConnectionId) -> Option<Session> {
        let mut inner = self.write();
        let session = inner.by_connection.remove(&connection_id)?;
        inner.by_name.remove(&session.display_name);
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.read().by_connection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave the maps half-updated: every
    // mutation is completed before anything that could panic.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_sequential_guest_names() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.register(10).unwrap(), "webguest1");
        assert_eq!(registry.register(20).unwrap(), "webguest2");

        assert_eq!(registry.lookup_connection("webguest1"), Ok(10));
        assert_eq!(registry.lookup_connection("webguest2"), Ok(20));
        assert_eq!(registry.lookup_name(20).unwrap(), "webguest2");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unregister_leaves_other_sessions_resolvable() {
        let registry = SessionRegistry::new();
        registry.register(1).unwrap();
        registry.register(2).unwrap();

        let removed = registry.unregister(1).unwrap();
        assert_eq!(removed.display_name, "webguest1");

        assert!(matches!(
            registry.lookup_connection("webguest1"),
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(registry.lookup_name(1), Err(RegistryError::NotFound(_))));
        assert_eq!(registry.lookup_connection("webguest2"), Ok(2));
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = SessionRegistry::new();
        registry.register(7).unwrap();
        assert!(registry.unregister(7).is_some());
        assert!(registry.unregister(7).is_none());
        assert!(registry.unregister(99).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = SessionRegistry::new();
        registry.register(3).unwrap();
        assert_eq!(registry.register(3), Err(RegistryError::DuplicateSession(3)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_guest_ids_are_not_reused() {
        let registry = SessionRegistry::new();
        registry.register(1).unwrap();
        registry.unregister(1);
        assert_eq!(registry.register(1).unwrap(), "webguest2");
    }

    #[test]
    fn test_concurrent_registration_yields_unique_names() {
        let registry = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|thread| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|i| registry.register(thread * 1000 + i).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut names: Vec<String> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 400);

        for name in &names {
            let id = registry.lookup_connection(name).unwrap();
            assert_eq!(&registry.lookup_name(id).unwrap(), name);
        }
    }
}
