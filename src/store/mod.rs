//! Concurrent in-memory key-value storage
//!
//! This module provides the single piece of shared state in the server:
//! a string-to-string map guarded by one reader/writer lock. Callers only
//! see the `get`, `list` and `set` operations; the map itself never leaves
//! the lock.

pub mod memory;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use memory::KeyValueStore;
pub use snapshot::Snapshot;
