//! Core identifier types for Quarry.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing accidental misuse of different ID types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Table identifier - uniquely identifies a table across all databases.
///
/// Table IDs key the persisted statistics for a table in the metadata
/// store, so they are stable for the lifetime of the table.
///
/// # Example
///
/// ```rust
/// use quarry_common::types::TableId;
///
/// let table = TableId::new(42);
/// assert_eq!(table.as_u64(), 42);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TableId(u64);

impl TableId {
    /// Invalid table ID constant, used as a sentinel value.
    pub const INVALID: Self = Self(0);

    /// Creates a new `TableId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next table ID.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Checks if this is a valid table ID.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Creates a TableId from bytes (big-endian).
    #[inline]
    #[must_use]
    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }

    /// Converts to bytes (big-endian).
    #[inline]
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "TableId(INVALID)")
        } else {
            write!(f, "TableId({})", self.0)
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TableId {
    #[inline]
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<TableId> for u64 {
    #[inline]
    fn from(id: TableId) -> Self {
        id.0
    }
}

/// Database (schema) identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DatabaseId(u64);

impl DatabaseId {
    /// Invalid database ID constant.
    pub const INVALID: Self = Self(0);

    /// Creates a new `DatabaseId`.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next database ID.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Debug for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DatabaseId({})", self.0)
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction identifier - uniquely identifies a transaction.
///
/// Transaction IDs are monotonically increasing and are used to:
/// - Track transaction state
/// - Determine visibility of uncommitted writes
///
/// # Example
///
/// ```rust
/// use quarry_common::types::TxnId;
///
/// let txn = TxnId::new(1);
/// assert!(txn.is_valid());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TxnId(u64);

impl TxnId {
    /// Invalid transaction ID constant.
    pub const INVALID: Self = Self(0);

    /// First valid transaction ID.
    pub const FIRST: Self = Self(1);

    /// Creates a new `TxnId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next transaction ID.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Checks if this is a valid transaction ID.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Debug for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "TxnId(INVALID)")
        } else {
            write!(f, "TxnId({})", self.0)
        }
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TxnId {
    #[inline]
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// Client connection identifier, used to tag session log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId`.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
