//! Typed access to metadata keys.
//!
//! All metadata lives under the `m` prefix of the key space:
//!
//! ```text
//! m TblStats: <table id, 8 bytes big-endian>   -> encoded table statistics
//! m User:     <user> 0x00 <host>               -> encoded account record
//! ```
//!
//! [`Meta`] never begins, commits, or rolls back; every write joins the
//! transaction it was constructed with.

use bytes::{BufMut, Bytes, BytesMut};
use quarry_common::error::{QuarryError, QuarryResult};
use quarry_common::types::TableId;
use tracing::debug;

use crate::handle::Transaction;

const META_PREFIX: &[u8] = b"m";
const TABLE_STATS_PREFIX: &[u8] = b"TblStats:";
const USER_PREFIX: &[u8] = b"User:";

/// Metadata accessor bound to an open transaction.
pub struct Meta<'a> {
    txn: &'a dyn Transaction,
}

impl<'a> Meta<'a> {
    /// Creates an accessor that reads and writes through `txn`.
    pub fn new(txn: &'a dyn Transaction) -> Self {
        Self { txn }
    }

    /// Key under which statistics for `table_id` are stored.
    pub fn table_stats_key(table_id: TableId) -> Bytes {
        let mut key = BytesMut::with_capacity(META_PREFIX.len() + TABLE_STATS_PREFIX.len() + 8);
        key.put_slice(META_PREFIX);
        key.put_slice(TABLE_STATS_PREFIX);
        key.put_u64(table_id.as_u64());
        key.freeze()
    }

    /// Key under which the account `user@host` is stored.
    ///
    /// User names cannot contain NUL, so the separator is unambiguous.
    pub fn user_key(user: &str, host: &str) -> QuarryResult<Bytes> {
        if user.as_bytes().contains(&0) {
            return Err(QuarryError::InvalidUser {
                spec: format!("{}@{}", user.escape_debug(), host),
            });
        }
        let mut key = BytesMut::with_capacity(
            META_PREFIX.len() + USER_PREFIX.len() + user.len() + 1 + host.len(),
        );
        key.put_slice(META_PREFIX);
        key.put_slice(USER_PREFIX);
        key.put_slice(user.as_bytes());
        key.put_u8(0);
        key.put_slice(host.as_bytes());
        Ok(key.freeze())
    }

    /// Stores the encoded statistics for a table, replacing any previous value.
    pub fn set_table_stats(&self, table_id: TableId, blob: &[u8]) -> QuarryResult<()> {
        debug!(
            txn_id = %self.txn.id(),
            table_id = %table_id,
            bytes = blob.len(),
            "writing table statistics"
        );
        self.txn
            .set(Self::table_stats_key(table_id), Bytes::copy_from_slice(blob))
    }

    /// Reads the encoded statistics for a table.
    pub fn get_table_stats(&self, table_id: TableId) -> QuarryResult<Option<Bytes>> {
        self.txn.get(&Self::table_stats_key(table_id))
    }

    /// Removes the statistics for a table. Returns true if they existed.
    pub fn delete_table_stats(&self, table_id: TableId) -> QuarryResult<bool> {
        self.txn.delete(Self::table_stats_key(table_id))
    }

    /// Stores an encoded account record.
    pub fn set_user(&self, user: &str, host: &str, record: Bytes) -> QuarryResult<()> {
        self.txn.set(Self::user_key(user, host)?, record)
    }

    /// Reads an encoded account record.
    pub fn get_user(&self, user: &str, host: &str) -> QuarryResult<Option<Bytes>> {
        self.txn.get(&Self::user_key(user, host)?)
    }

    /// Removes an account record. Returns true if it existed.
    pub fn delete_user(&self, user: &str, host: &str) -> QuarryResult<bool> {
        self.txn.delete(Self::user_key(user, host)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::TxnHandle;
    use crate::manager::TransactionManager;
    use std::sync::Arc;

    #[test]
    fn test_table_stats_key_layout() {
        let key = Meta::table_stats_key(TableId::new(0x0102));
        assert_eq!(&key[..10], b"mTblStats:");
        assert_eq!(&key[10..], &[0, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_user_key_layout() {
        let key = Meta::user_key("root", "%").unwrap();
        assert_eq!(&key[..], b"mUser:root\0%");
        assert!(Meta::user_key("ro\0ot", "%").is_err());
    }

    #[test]
    fn test_stats_visible_only_after_commit() {
        let tm = Arc::new(TransactionManager::in_memory());
        let writer = TxnHandle::begin(Arc::clone(&tm)).unwrap();
        let reader = TxnHandle::begin(Arc::clone(&tm)).unwrap();

        Meta::new(&writer)
            .set_table_stats(TableId::new(1), b"stats")
            .unwrap();
        assert!(Meta::new(&reader)
            .get_table_stats(TableId::new(1))
            .unwrap()
            .is_none());

        writer.commit().unwrap();
        let later = TxnHandle::begin(tm).unwrap();
        let blob = Meta::new(&later).get_table_stats(TableId::new(1)).unwrap();
        assert_eq!(blob, Some(Bytes::from_static(b"stats")));
        assert!(Meta::new(&later).delete_table_stats(TableId::new(1)).unwrap());
    }

    #[test]
    fn test_user_records() {
        let tm = Arc::new(TransactionManager::in_memory());
        let txn = TxnHandle::begin(tm).unwrap();
        let meta = Meta::new(&txn);

        meta.set_user("alice", "localhost", Bytes::from("rec")).unwrap();
        assert_eq!(
            meta.get_user("alice", "localhost").unwrap(),
            Some(Bytes::from("rec"))
        );
        assert!(meta.get_user("alice", "%").unwrap().is_none());
        assert!(meta.delete_user("alice", "localhost").unwrap());
        assert!(!meta.delete_user("alice", "localhost").unwrap());
    }
}
