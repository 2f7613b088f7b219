//! Transaction timestamps.
//!
//! A [`Timestamp`] packs a physical wall-clock component (milliseconds)
//! in the high bits and a logical counter in the low bits, so that many
//! timestamps can be allocated inside the same millisecond while staying
//! strictly ordered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of low bits reserved for the logical counter.
pub const LOGICAL_BITS: u32 = 18;

const LOGICAL_MASK: u64 = (1 << LOGICAL_BITS) - 1;

/// A transaction timestamp allocated by the timestamp oracle.
///
/// Start timestamps anchor a transaction's snapshot and double as the
/// version stamp of statistics written by that transaction.
///
/// # Example
///
/// ```rust
/// use quarry_common::types::Timestamp;
///
/// let ts = Timestamp::compose(1_000, 5);
/// assert_eq!(ts.physical(), 1_000);
/// assert_eq!(ts.logical(), 5);
/// assert!(Timestamp::compose(1_000, 6) > ts);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Zero timestamp, never handed out by the oracle.
    pub const ZERO: Self = Self(0);

    /// Maximum timestamp value.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a timestamp from its raw encoding.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Builds a timestamp from physical milliseconds and a logical counter.
    ///
    /// The logical part is truncated to [`LOGICAL_BITS`] bits.
    #[inline]
    #[must_use]
    pub const fn compose(physical_ms: u64, logical: u64) -> Self {
        Self((physical_ms << LOGICAL_BITS) | (logical & LOGICAL_MASK))
    }

    /// Returns the raw encoding.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Physical component in milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn physical(self) -> u64 {
        self.0 >> LOGICAL_BITS
    }

    /// Logical counter within the physical millisecond.
    #[inline]
    #[must_use]
    pub const fn logical(self) -> u64 {
        self.0 & LOGICAL_MASK
    }

    /// Checks whether this timestamp was allocated (non-zero).
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}.{})", self.physical(), self.logical())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestamp {
    #[inline]
    fn from(raw: u64) -> Self {
        Self::new(raw)
    }
}

impl From<Timestamp> for u64 {
    #[inline]
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_roundtrip() {
        let ts = Timestamp::compose(1_700_000_000_000, 42);
        assert_eq!(ts.physical(), 1_700_000_000_000);
        assert_eq!(ts.logical(), 42);
        assert!(ts.is_valid());
        assert!(!Timestamp::ZERO.is_valid());
    }

    #[test]
    fn test_ordering() {
        let a = Timestamp::compose(10, LOGICAL_MASK);
        let b = Timestamp::compose(11, 0);
        assert!(a < b);
        assert!(Timestamp::compose(10, 1) < Timestamp::compose(10, 2));
    }

    #[test]
    fn test_logical_truncated() {
        let ts = Timestamp::compose(1, LOGICAL_MASK + 3);
        assert_eq!(ts.physical(), 1);
        assert_eq!(ts.logical(), 2);
    }
}
