//! Transaction handles.
//!
//! [`Transaction`] is the narrow interface that metadata writers (statistics
//! persistence, account management) program against. [`TxnHandle`] is the
//! implementation bound to a [`TransactionManager`].

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use quarry_common::error::QuarryResult;
use quarry_common::types::{Timestamp, TxnId};

use crate::manager::TransactionManager;

/// An open read/write transaction.
pub trait Transaction: Send + Sync {
    /// Returns the transaction ID.
    fn id(&self) -> TxnId;

    /// Returns the start timestamp that anchors the snapshot.
    fn start_ts(&self) -> Timestamp;

    /// Reads a key.
    fn get(&self, key: &[u8]) -> QuarryResult<Option<Bytes>>;

    /// Writes a key.
    fn set(&self, key: Bytes, value: Bytes) -> QuarryResult<()>;

    /// Deletes a key. Returns true if it existed.
    fn delete(&self, key: Bytes) -> QuarryResult<bool>;
}

/// A transaction owned by a [`TransactionManager`].
#[derive(Clone)]
pub struct TxnHandle {
    manager: Arc<TransactionManager>,
    id: TxnId,
    start_ts: Timestamp,
}

impl TxnHandle {
    /// Begins a new transaction on `manager`.
    pub fn begin(manager: Arc<TransactionManager>) -> QuarryResult<Self> {
        let id = manager.begin()?;
        let start_ts = manager.start_ts(id)?;
        Ok(Self {
            manager,
            id,
            start_ts,
        })
    }

    /// Commits the transaction and returns its commit timestamp.
    pub fn commit(&self) -> QuarryResult<Timestamp> {
        Ok(self.manager.commit(self.id)?)
    }

    /// Rolls the transaction back.
    pub fn rollback(&self) -> QuarryResult<()> {
        Ok(self.manager.abort(self.id)?)
    }

    /// Returns true while the manager still tracks this transaction.
    pub fn is_active(&self) -> bool {
        self.manager
            .state(self.id)
            .is_some_and(|state| state.is_active())
    }
}

impl Transaction for TxnHandle {
    fn id(&self) -> TxnId {
        self.id
    }

    fn start_ts(&self) -> Timestamp {
        self.start_ts
    }

    fn get(&self, key: &[u8]) -> QuarryResult<Option<Bytes>> {
        Ok(self.manager.get(self.id, key)?)
    }

    fn set(&self, key: Bytes, value: Bytes) -> QuarryResult<()> {
        self.manager.put(self.id, key, value)?;
        Ok(())
    }

    fn delete(&self, key: Bytes) -> QuarryResult<bool> {
        Ok(self.manager.delete(self.id, key)?)
    }
}

impl fmt::Debug for TxnHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxnHandle")
            .field("id", &self.id)
            .field("start_ts", &self.start_ts)
            .finish()
    }
}
