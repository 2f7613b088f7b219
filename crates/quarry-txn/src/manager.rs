//! Transaction manager for coordinating transaction lifecycle.
//!
//! # Transaction States
//!
//! ```text
//! ┌───────┐    begin()    ┌────────┐
//! │ Start │──────────────▶│ Active │
//! └───────┘               └────────┘
//!                              │
//!                    ┌────────┴────────┐
//!                    │                 │
//!               commit()           abort()
//!                    │                 │
//!                    ▼                 ▼
//!             ┌───────────┐     ┌──────────┐
//!             │ Committed │     │ Aborted  │
//!             └───────────┘     └──────────┘
//! ```
//!
//! Writes are buffered as pending versions and become visible to other
//! transactions at the commit timestamp. Write-write conflicts are detected
//! eagerly at write time (first writer wins).

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use quarry_common::error::QuarryError;
use quarry_common::types::{Timestamp, TxnId};
use thiserror::Error;
use tracing::debug;

use crate::oracle::TimestampOracle;
use crate::version::{VersionId, VersionState, VersionStore};

/// The state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

impl TransactionState {
    /// Returns true if the transaction can perform operations.
    pub fn is_active(&self) -> bool {
        *self == TransactionState::Active
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Active => write!(f, "Active"),
            TransactionState::Committed => write!(f, "Committed"),
            TransactionState::Aborted => write!(f, "Aborted"),
        }
    }
}

/// A write recorded by a transaction.
#[derive(Debug, Clone)]
struct WriteRecord {
    key: Bytes,
    version_id: VersionId,
}

/// Bookkeeping for one running transaction.
struct TransactionRecord {
    state: TransactionState,
    start_ts: Timestamp,
    writes: Vec<WriteRecord>,
    started_at: Instant,
}

impl TransactionRecord {
    fn new(start_ts: Timestamp) -> Self {
        Self {
            state: TransactionState::Active,
            start_ts,
            writes: Vec::new(),
            started_at: Instant::now(),
        }
    }

    fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Errors that can occur during transaction operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// Transaction not found (never started or already finished).
    #[error("transaction {0} not found")]
    NotFound(TxnId),

    /// Transaction is not in the expected state.
    #[error("transaction {txn_id} in invalid state {current}, expected {expected}")]
    InvalidState {
        /// The transaction ID.
        txn_id: TxnId,
        /// The current state.
        current: TransactionState,
        /// The expected state(s).
        expected: &'static str,
    },

    /// Another transaction wrote the key first.
    #[error("write conflict on transaction {txn_id}: key already written by {other}")]
    WriteConflict {
        /// This transaction.
        txn_id: TxnId,
        /// The transaction holding the newer write.
        other: TxnId,
    },
}

/// Result type for transaction operations.
pub type TxnResult<T> = Result<T, TransactionError>;

impl From<TransactionError> for QuarryError {
    fn from(err: TransactionError) -> Self {
        QuarryError::Transaction {
            message: err.to_string(),
        }
    }
}

/// Statistics about the transaction manager.
#[derive(Debug, Default)]
pub struct TransactionStats {
    /// Total transactions started.
    pub started: AtomicU64,
    /// Total transactions committed.
    pub committed: AtomicU64,
    /// Total transactions aborted.
    pub aborted: AtomicU64,
    /// Currently active transactions.
    pub active: AtomicU64,
    /// Total write conflicts detected.
    pub conflicts: AtomicU64,
}

/// The transaction manager coordinates all transaction operations.
pub struct TransactionManager {
    /// Timestamp source for start and commit timestamps.
    oracle: Arc<TimestampOracle>,
    /// Version store backing every key.
    version_store: Arc<VersionStore>,
    /// Running transactions.
    transactions: RwLock<HashMap<TxnId, Mutex<TransactionRecord>>>,
    /// Statistics.
    stats: TransactionStats,
    /// Next transaction ID.
    next_txn_id: AtomicU64,
}

impl TransactionManager {
    /// Creates a new transaction manager.
    pub fn new(oracle: Arc<TimestampOracle>, version_store: Arc<VersionStore>) -> Self {
        Self {
            oracle,
            version_store,
            transactions: RwLock::new(HashMap::new()),
            stats: TransactionStats::default(),
            next_txn_id: AtomicU64::new(TxnId::FIRST.as_u64()),
        }
    }

    /// Creates a manager over a fresh oracle and empty store.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(TimestampOracle::new()),
            Arc::new(VersionStore::new()),
        )
    }

    /// Begins a new transaction.
    pub fn begin(&self) -> TxnResult<TxnId> {
        let txn_id = TxnId::new(self.next_txn_id.fetch_add(1, AtomicOrdering::SeqCst));
        let start_ts = self.oracle.now();

        self.transactions
            .write()
            .insert(txn_id, Mutex::new(TransactionRecord::new(start_ts)));

        self.stats.started.fetch_add(1, AtomicOrdering::Relaxed);
        self.stats.active.fetch_add(1, AtomicOrdering::Relaxed);

        debug!(txn_id = %txn_id, start_ts = %start_ts, "transaction started");
        Ok(txn_id)
    }

    /// Returns the start timestamp of a running transaction.
    pub fn start_ts(&self, txn_id: TxnId) -> TxnResult<Timestamp> {
        let txns = self.transactions.read();
        let txn = txns
            .get(&txn_id)
            .ok_or(TransactionError::NotFound(txn_id))?;
        let start_ts = txn.lock().start_ts;
        Ok(start_ts)
    }

    /// Gets a value by key.
    pub fn get(&self, txn_id: TxnId, key: &[u8]) -> TxnResult<Option<Bytes>> {
        let txns = self.transactions.read();
        let txn_lock = txns
            .get(&txn_id)
            .ok_or(TransactionError::NotFound(txn_id))?;
        let txn = txn_lock.lock();
        Self::ensure_active(txn_id, &txn)?;

        Ok(self
            .version_store
            .get_visible(key, txn_id, txn.start_ts)
            .and_then(|v| v.data))
    }

    /// Puts a value by key.
    pub fn put(&self, txn_id: TxnId, key: Bytes, value: Bytes) -> TxnResult<VersionId> {
        self.write(txn_id, key, Some(value))
    }

    /// Deletes a key. Returns true if a value was visible before the delete.
    pub fn delete(&self, txn_id: TxnId, key: Bytes) -> TxnResult<bool> {
        let existed = self.get(txn_id, &key)?.is_some();
        if existed {
            self.write(txn_id, key, None)?;
        }
        Ok(existed)
    }

    fn write(&self, txn_id: TxnId, key: Bytes, value: Option<Bytes>) -> TxnResult<VersionId> {
        let txns = self.transactions.read();
        let txn_lock = txns
            .get(&txn_id)
            .ok_or(TransactionError::NotFound(txn_id))?;
        let mut txn = txn_lock.lock();
        Self::ensure_active(txn_id, &txn)?;

        if let Some(latest) = self
            .version_store
            .get_chain(&key)
            .and_then(|chain| chain.get_latest_live())
        {
            let conflicts = latest.created_by != txn_id
                && match latest.state {
                    VersionState::Pending => true,
                    VersionState::Committed => latest.commit_ts.is_some_and(|ts| ts > txn.start_ts),
                    VersionState::Aborted => false,
                };
            if conflicts {
                self.stats.conflicts.fetch_add(1, AtomicOrdering::Relaxed);
                return Err(TransactionError::WriteConflict {
                    txn_id,
                    other: latest.created_by,
                });
            }
        }

        let version_id = self.version_store.create_version(key.clone(), txn_id, value);
        txn.writes.push(WriteRecord { key, version_id });
        Ok(version_id)
    }

    fn ensure_active(txn_id: TxnId, txn: &TransactionRecord) -> TxnResult<()> {
        if txn.state.is_active() {
            Ok(())
        } else {
            Err(TransactionError::InvalidState {
                txn_id,
                current: txn.state,
                expected: "Active",
            })
        }
    }

    /// Commits a transaction, returning its commit timestamp.
    pub fn commit(&self, txn_id: TxnId) -> TxnResult<Timestamp> {
        let record = self
            .transactions
            .write()
            .remove(&txn_id)
            .ok_or(TransactionError::NotFound(txn_id))?;
        let mut txn = record.into_inner();
        Self::ensure_active(txn_id, &txn)?;

        let commit_ts = self.oracle.now();
        for write in &txn.writes {
            self.version_store
                .commit(&write.key, write.version_id, commit_ts);
        }
        txn.state = TransactionState::Committed;

        self.stats.committed.fetch_add(1, AtomicOrdering::Relaxed);
        self.stats.active.fetch_sub(1, AtomicOrdering::Relaxed);

        debug!(
            txn_id = %txn_id,
            commit_ts = %commit_ts,
            writes = txn.writes.len(),
            elapsed_us = txn.duration().as_micros() as u64,
            "transaction committed"
        );
        Ok(commit_ts)
    }

    /// Aborts a transaction, discarding its writes.
    pub fn abort(&self, txn_id: TxnId) -> TxnResult<()> {
        let record = self
            .transactions
            .write()
            .remove(&txn_id)
            .ok_or(TransactionError::NotFound(txn_id))?;
        let mut txn = record.into_inner();

        for write in &txn.writes {
            self.version_store.abort(&write.key, write.version_id);
        }
        txn.state = TransactionState::Aborted;

        self.stats.aborted.fetch_add(1, AtomicOrdering::Relaxed);
        self.stats.active.fetch_sub(1, AtomicOrdering::Relaxed);

        debug!(txn_id = %txn_id, writes = txn.writes.len(), "transaction aborted");
        Ok(())
    }

    /// Returns the state of a running transaction.
    pub fn state(&self, txn_id: TxnId) -> Option<TransactionState> {
        let txns = self.transactions.read();
        txns.get(&txn_id).map(|t| t.lock().state)
    }

    /// Returns the number of active transactions.
    pub fn active_count(&self) -> usize {
        self.stats.active.load(AtomicOrdering::Relaxed) as usize
    }

    /// Returns statistics.
    pub fn stats(&self) -> &TransactionStats {
        &self.stats
    }

    /// Returns the version store.
    pub fn version_store(&self) -> &Arc<VersionStore> {
        &self.version_store
    }

    /// Returns the timestamp oracle.
    pub fn oracle(&self) -> &Arc<TimestampOracle> {
        &self.oracle
    }
}

impl fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionManager")
            .field("active_count", &self.active_count())
            .field("keys", &self.version_store.key_count())
            .finish()
    }
}
