//! Timestamp oracle.
//!
//! The oracle hands out strictly increasing [`Timestamp`]s that combine the
//! wall clock (milliseconds) with a logical counter:
//!
//! On each allocation:
//! 1. l' = l
//! 2. l = max(l', pt)
//! 3. if l == l' then c = c + 1 else c = 0
//! 4. if c overflows the logical bits then l = l + 1, c = 0

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use quarry_common::types::{Timestamp, LOGICAL_BITS};

/// Exclusive upper bound of the logical counter.
const LOGICAL_LIMIT: u64 = 1 << LOGICAL_BITS;

/// Allocates monotonic transaction timestamps.
///
/// Thread-safe; start and commit timestamps from one oracle are totally
/// ordered.
pub struct TimestampOracle {
    /// Last physical time handed out.
    physical: AtomicU64,
    /// Logical counter within `physical`.
    logical: AtomicU64,
    /// Serializes read-modify-write of the pair above.
    state: Mutex<()>,
}

impl TimestampOracle {
    /// Creates a new oracle seeded from the wall clock.
    pub fn new() -> Self {
        Self {
            physical: AtomicU64::new(Self::physical_time()),
            logical: AtomicU64::new(0),
            state: Mutex::new(()),
        }
    }

    /// Returns the current physical time in milliseconds.
    #[inline]
    fn physical_time() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }

    /// Allocates the next timestamp.
    pub fn now(&self) -> Timestamp {
        let _guard = self.state.lock();

        let pt = Self::physical_time();
        let prev_l = self.physical.load(AtomicOrdering::Acquire);

        let mut new_l = pt.max(prev_l);
        let mut new_c = if new_l == prev_l {
            self.logical.load(AtomicOrdering::Acquire) + 1
        } else {
            0
        };

        if new_c >= LOGICAL_LIMIT {
            new_l += 1;
            new_c = 0;
        }

        self.physical.store(new_l, AtomicOrdering::Release);
        self.logical.store(new_c, AtomicOrdering::Release);

        Timestamp::compose(new_l, new_c)
    }

    /// Returns the last allocated timestamp without advancing.
    pub fn read(&self) -> Timestamp {
        let _guard = self.state.lock();
        Timestamp::compose(
            self.physical.load(AtomicOrdering::Acquire),
            self.logical.load(AtomicOrdering::Acquire),
        )
    }
}

impl Default for TimestampOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimestampOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampOracle")
            .field("physical", &self.physical.load(AtomicOrdering::Relaxed))
            .field("logical", &self.logical.load(AtomicOrdering::Relaxed))
            .finish()
    }
}
