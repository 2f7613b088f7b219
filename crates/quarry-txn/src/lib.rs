//! # quarry-txn
//!
//! Transactions and the metadata store for Quarry.
//!
//! This crate provides:
//!
//! - **Timestamp Oracle**: strictly increasing start and commit timestamps
//!   derived from the wall clock plus a logical counter.
//! - **Version Store**: multi-version key-value chains with snapshot
//!   visibility, so uncommitted writes stay private to their transaction.
//! - **Transaction Manager**: begin, get, put, delete, commit, and abort
//!   keyed by transaction ID.
//! - **Meta**: typed metadata keys (table statistics, user accounts) written
//!   through an already-open [`Transaction`].
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            Meta (typed metadata keys)          │
//! │                      │                         │
//! │                      ▼                         │
//! │          dyn Transaction (TxnHandle)           │
//! │                      │                         │
//! │                      ▼                         │
//! │             TransactionManager                 │
//! │            ┌─────────┴─────────┐               │
//! │            ▼                   ▼               │
//! │   ┌─────────────────┐  ┌──────────────┐        │
//! │   │ TimestampOracle │  │ VersionStore │        │
//! │   └─────────────────┘  └──────────────┘        │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use quarry_common::types::TableId;
//! use quarry_txn::{Meta, Transaction, TransactionManager, TxnHandle};
//!
//! let tm = Arc::new(TransactionManager::in_memory());
//! let txn = TxnHandle::begin(Arc::clone(&tm)).unwrap();
//! Meta::new(&txn).set_table_stats(TableId::new(7), b"blob").unwrap();
//! txn.commit().unwrap();
//!
//! let reader = TxnHandle::begin(tm).unwrap();
//! let stored = Meta::new(&reader).get_table_stats(TableId::new(7)).unwrap();
//! assert_eq!(stored.as_deref(), Some(&b"blob"[..]));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod handle;
pub mod manager;
pub mod meta;
pub mod oracle;
pub mod version;

pub use handle::{Transaction, TxnHandle};
pub use manager::{
    TransactionError, TransactionManager, TransactionState, TransactionStats, TxnResult,
};
pub use meta::Meta;
pub use oracle::TimestampOracle;
pub use version::{Version, VersionChain, VersionId, VersionState, VersionStore};
