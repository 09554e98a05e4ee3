use super::Snapshot;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory key-value store
///
/// All entries live in one `HashMap` behind a single `RwLock`. Reads
/// (`get`, `list`) take the shared lock and never block each other; `set`
/// takes the exclusive lock for a single insert.
///
/// None of the operations fail. A lookup of an unset key returns `None`,
/// which is distinct from a key holding the empty string.
///
/// # Examples
///
/// ```
/// use kvsrv::store::KeyValueStore;
///
/// let store = KeyValueStore::new();
/// assert_eq!(store.get("color"), None);
///
/// store.set("color", "red");
/// assert_eq!(store.get("color").as_deref(), Some("red"));
/// assert_eq!(store.list().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct KeyValueStore {
    pub(super) data: RwLock<HashMap<String, String>>,
}

impl KeyValueStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value for a key, or `None` if it was never written
    pub fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    /// Take a point-in-time copy of every entry
    pub fn list(&self) -> Snapshot {
        let data = self.read();
        Snapshot::from_map(&data)
    }

    /// Insert the key, or replace its value if already present
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        self.write().insert(key, value);
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A writer that panics mid-call can only do so before or after the single
    // `insert`, so the map behind a poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}
