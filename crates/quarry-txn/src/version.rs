//! Version chain storage.
//!
//! Every key owns a chain of versions, newest first. A version is either a
//! value or a tombstone, and is pending until its transaction commits.
//!
//! # Version Chain Structure
//!
//! ```text
//! Key: m TblStats: 00 00 00 00 00 00 00 07
//! ┌──────────────────────────────────────────────┐
//! │ Version 3 (pending, txn 9)   value: <blob c> │
//! │                     ↓                        │
//! │ Version 2 (committed @ 150)  tombstone       │
//! │                     ↓                        │
//! │ Version 1 (committed @ 100)  value: <blob a> │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! A reader with snapshot `ts` sees its own pending versions first, then the
//! newest committed version with `commit_ts <= ts`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use quarry_common::types::{Timestamp, TxnId};

/// A unique identifier for a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId(u64);

impl VersionId {
    /// Invalid version ID.
    pub const INVALID: Self = Self(0);

    /// Creates a new version ID.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Checks if this is a valid version ID.
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The state of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionState {
    /// Written by a transaction that has not finished.
    Pending,
    /// Transaction committed.
    Committed,
    /// Transaction aborted; the version is invisible to everyone.
    Aborted,
}

/// A single version of a key.
#[derive(Debug, Clone)]
pub struct Version {
    /// Unique identifier for this version.
    pub id: VersionId,
    /// Transaction that wrote this version.
    pub created_by: TxnId,
    /// Commit timestamp, set once committed.
    pub commit_ts: Option<Timestamp>,
    /// The value, or `None` for a delete.
    pub data: Option<Bytes>,
    /// Current state of the version.
    pub state: VersionState,
}

impl Version {
    /// Creates a pending version.
    pub fn new(id: VersionId, created_by: TxnId, data: Option<Bytes>) -> Self {
        Self {
            id,
            created_by,
            commit_ts: None,
            data,
            state: VersionState::Pending,
        }
    }

    /// Returns true if this version is a delete marker.
    pub fn is_tombstone(&self) -> bool {
        self.data.is_none()
    }

    /// Checks if this version is visible to the given transaction.
    pub fn is_visible_to(&self, txn_id: TxnId, read_ts: Timestamp) -> bool {
        if self.created_by == txn_id {
            return self.state != VersionState::Aborted;
        }
        self.state == VersionState::Committed && self.commit_ts.is_some_and(|ts| ts <= read_ts)
    }

    /// Marks this version as committed.
    pub fn commit(&mut self, commit_ts: Timestamp) {
        self.commit_ts = Some(commit_ts);
        self.state = VersionState::Committed;
    }

    /// Marks this version as aborted.
    pub fn abort(&mut self) {
        self.state = VersionState::Aborted;
    }
}

/// A chain of versions for a single key.
#[derive(Debug)]
pub struct VersionChain {
    /// The key for this chain.
    key: Bytes,
    /// All versions, newest first.
    versions: RwLock<Vec<Version>>,
}

impl VersionChain {
    /// Creates a new empty version chain.
    pub fn new(key: Bytes) -> Self {
        Self {
            key,
            versions: RwLock::new(Vec::new()),
        }
    }

    /// Returns the key for this chain.
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    /// Returns the number of versions in the chain.
    pub fn len(&self) -> usize {
        self.versions.read().len()
    }

    /// Returns true if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.versions.read().is_empty()
    }

    /// Adds a new version at the front of the chain.
    pub fn add_version(&self, version: Version) {
        self.versions.write().insert(0, version);
    }

    /// Gets the version visible to a transaction, tombstones included.
    pub fn get_visible(&self, txn_id: TxnId, read_ts: Timestamp) -> Option<Version> {
        let versions = self.versions.read();
        versions
            .iter()
            .find(|v| v.is_visible_to(txn_id, read_ts))
            .cloned()
    }

    /// Returns the newest version that is not aborted.
    pub fn get_latest_live(&self) -> Option<Version> {
        let versions = self.versions.read();
        versions
            .iter()
            .find(|v| v.state != VersionState::Aborted)
            .cloned()
    }

    /// Commits a version.
    pub fn commit_version(&self, version_id: VersionId, commit_ts: Timestamp) -> bool {
        let mut versions = self.versions.write();
        match versions.iter_mut().find(|v| v.id == version_id) {
            Some(version) => {
                version.commit(commit_ts);
                true
            }
            None => false,
        }
    }

    /// Aborts a version.
    pub fn abort_version(&self, version_id: VersionId) -> bool {
        let mut versions = self.versions.write();
        match versions.iter_mut().find(|v| v.id == version_id) {
            Some(version) => {
                version.abort();
                true
            }
            None => false,
        }
    }

    /// Drops aborted versions. Returns the number removed.
    pub fn gc_aborted(&self) -> usize {
        let mut versions = self.versions.write();
        let before = versions.len();
        versions.retain(|v| v.state != VersionState::Aborted);
        before - versions.len()
    }
}

/// A store for managing version chains.
#[derive(Debug)]
pub struct VersionStore {
    /// All version chains, indexed by key.
    chains: DashMap<Bytes, Arc<VersionChain>>,
    /// Next version ID.
    next_id: AtomicU64,
}

impl VersionStore {
    /// Creates a new empty version store.
    pub fn new() -> Self {
        Self {
            chains: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the number of keys in the store.
    pub fn key_count(&self) -> usize {
        self.chains.len()
    }

    /// Gets or creates a version chain for a key.
    pub fn get_or_create_chain(&self, key: Bytes) -> Arc<VersionChain> {
        self.chains
            .entry(key.clone())
            .or_insert_with(|| Arc::new(VersionChain::new(key)))
            .clone()
    }

    /// Gets a version chain if it exists.
    pub fn get_chain(&self, key: &[u8]) -> Option<Arc<VersionChain>> {
        self.chains.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Creates a new pending version for a key.
    pub fn create_version(&self, key: Bytes, created_by: TxnId, data: Option<Bytes>) -> VersionId {
        let chain = self.get_or_create_chain(key);
        let id = VersionId::new(self.next_id.fetch_add(1, AtomicOrdering::SeqCst));
        chain.add_version(Version::new(id, created_by, data));
        id
    }

    /// Gets the version of `key` visible to a transaction.
    pub fn get_visible(&self, key: &[u8], txn_id: TxnId, read_ts: Timestamp) -> Option<Version> {
        self.get_chain(key)
            .and_then(|chain| chain.get_visible(txn_id, read_ts))
    }

    /// Commits a version.
    pub fn commit(&self, key: &[u8], version_id: VersionId, commit_ts: Timestamp) -> bool {
        self.get_chain(key)
            .is_some_and(|chain| chain.commit_version(version_id, commit_ts))
    }

    /// Aborts a version.
    pub fn abort(&self, key: &[u8], version_id: VersionId) -> bool {
        self.get_chain(key)
            .is_some_and(|chain| chain.abort_version(version_id))
    }

    /// Removes aborted versions from every chain.
    pub fn gc_aborted(&self) -> usize {
        self.chains.iter().map(|c| c.gc_aborted()).sum()
    }
}

impl Default for VersionStore {
    fn default() -> Self {
        Self::new()
    }
}
