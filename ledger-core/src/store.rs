//! Versioned key-value store
//!
//! The ledger expresses every mutation as one atomic [`WriteBatch`] of
//! compare-and-swap puts. The store checks every expected version before
//! applying anything, so a batch either commits whole or fails whole with
//! [`Error::Conflict`] naming the stale key. The engine never retries
//! internally; conflicts surface to the caller.
//!
//! [`MemoryStore`] is the in-process reference implementation. A replicated
//! backend substituted here must provide the same contract: atomic batches,
//! per-key versions, ordered prefix scans.

use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Monotonic per-key version, starting at 1 on first write
pub type Version = u64;

/// Single compare-and-swap put
#[derive(Debug, Clone)]
pub struct Put {
    /// Target key
    pub key: String,
    /// Encoded record
    pub value: Vec<u8>,
    /// `None` requires the key to be unbound; `Some(v)` requires the key
    /// to still be at version `v`
    pub expected: Option<Version>,
}

/// Atomic batch of puts, all-or-nothing
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    puts: Vec<Put>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `key`; the batch fails if the key is already bound
    pub fn create(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.puts.push(Put {
            key: key.into(),
            value,
            expected: None,
        });
    }

    /// Replace `key`, expecting it to still be at `version`
    pub fn update(&mut self, key: impl Into<String>, value: Vec<u8>, version: Version) {
        self.puts.push(Put {
            key: key.into(),
            value,
            expected: Some(version),
        });
    }

    /// Whether the batch holds no puts
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }

    /// Puts in insertion order
    pub fn puts(&self) -> &[Put] {
        &self.puts
    }
}

/// Versioned key-value store contract
pub trait KvStore: Send + Sync {
    /// Read a key with its current version
    fn get(&self, key: &str) -> Option<(Vec<u8>, Version)>;

    /// Apply a batch atomically
    ///
    /// Fails with [`Error::Conflict`] on the first stale expected version,
    /// leaving the store untouched.
    fn apply(&self, batch: WriteBatch) -> Result<()>;

    /// All records under a key prefix, in key order
    fn scan_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>, Version)>;
}

/// In-memory reference store with compare-and-swap semantics
///
/// A `BTreeMap` behind one `RwLock`: ordered keys give the same prefix-scan
/// shape a persistent backend would, and the write lock makes batch
/// application trivially atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<String, (Vec<u8>, Version)>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<(Vec<u8>, Version)> {
        self.inner.read().get(key).cloned()
    }

    fn apply(&self, batch: WriteBatch) -> Result<()> {
        let mut map = self.inner.write();

        // validate every expected version before touching anything
        for put in batch.puts() {
            let current = map.get(&put.key).map(|(_, version)| *version);
            match (put.expected, current) {
                (None, None) => {}
                (Some(expected), Some(version)) if expected == version => {}
                _ => return Err(Error::Conflict(put.key.clone())),
            }
        }

        for put in batch.puts {
            let next = map.get(&put.key).map(|(_, v)| v + 1).unwrap_or(1);
            map.insert(put.key, (put.value, next));
        }

        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>, Version)> {
        self.inner
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, (value, version))| (key.clone(), value.clone(), *version))
            .collect()
    }
}
