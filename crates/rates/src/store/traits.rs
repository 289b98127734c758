//! SnapshotStore trait definition

use crate::error::StorageError;
use async_trait::async_trait;

/// Durable key/value store for the last snapshot.
///
/// Deliberately a byte interface: the cache controller owns serialization,
/// and implementations only move opaque values. Every failure is a
/// [`StorageError`], which callers treat as non-fatal (logged, then the
/// pipeline continues without durable state).
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the value stored under `key`, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;
}
