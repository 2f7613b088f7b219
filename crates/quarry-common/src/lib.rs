//! # quarry-common
//!
//! Common types, errors, and configuration for Quarry.
//!
//! This crate provides the foundational types used by every Quarry crate:
//!
//! - **Types**: Core identifiers (`TableId`, `DatabaseId`, `TxnId`, `ConnectionId`)
//!   and the transaction `Timestamp`
//! - **Errors**: Unified error handling with `QuarryError`
//! - **Config**: Engine configuration, including the ANALYZE parameters
//! - **Constants**: System-wide constants and limits
//!
//! ## Example
//!
//! ```rust
//! use quarry_common::types::{TableId, TxnId};
//! use quarry_common::error::QuarryResult;
//!
//! fn example() -> QuarryResult<()> {
//!     let table = TableId::new(42);
//!     let txn = TxnId::new(1);
//!     assert!(table.is_valid() && txn.is_valid());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{ErrorCode, QuarryError, QuarryResult};
pub use types::{ConnectionId, DatabaseId, TableId, Timestamp, TxnId};
