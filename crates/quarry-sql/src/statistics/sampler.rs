//! Single-pass reservoir sampling over a record set.

use std::sync::atomic::{AtomicBool, Ordering};

use quarry_common::error::{QuarryError, QuarryResult};
use rand::Rng;
use tracing::debug;

use crate::context::RecordSet;
use crate::row::Row;

/// Rows between sampler progress log lines.
const PROGRESS_INTERVAL: u64 = 100_000;

/// Output of one sampling pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleCollection {
    /// Exact number of rows read.
    pub count: u64,
    /// At most `capacity` rows drawn from the stream.
    pub samples: Vec<Row>,
}

/// A bounded reservoir of rows.
///
/// The first `capacity` rows are kept in arrival order. After that, the row
/// that arrives when `count` rows have been seen replaces a random slot
/// with probability `capacity / count`, with `count` taken before it is
/// incremented for the current row.
#[derive(Debug)]
pub struct ReservoirSampler {
    capacity: usize,
    samples: Vec<Row>,
    count: u64,
}

impl ReservoirSampler {
    /// Creates an empty reservoir.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: Vec::with_capacity(capacity.min(1024)),
            count: 0,
        }
    }

    /// Offers one row to the reservoir.
    pub fn observe<R: Rng + ?Sized>(&mut self, row: Row, rng: &mut R) {
        if self.samples.len() < self.capacity {
            self.samples.push(row);
        } else if self.capacity > 0 && rng.gen_range(0..self.count) < self.capacity as u64 {
            let slot = rng.gen_range(0..self.capacity);
            self.samples[slot] = row;
        }
        self.count += 1;
    }

    /// Rows seen so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Rows currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no row is held.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Consumes the sampler.
    pub fn finish(self) -> SampleCollection {
        SampleCollection {
            count: self.count,
            samples: self.samples,
        }
    }
}

/// Reads `rs` to exhaustion through a reservoir of `capacity` rows.
///
/// Does not close `rs`. A read error is returned as is and the partial
/// reservoir is dropped. `killed` is checked before every row.
pub fn collect_samples<R: Rng + ?Sized>(
    rs: &mut dyn RecordSet,
    capacity: usize,
    rng: &mut R,
    killed: &AtomicBool,
) -> QuarryResult<SampleCollection> {
    let mut sampler = ReservoirSampler::new(capacity);
    loop {
        if killed.load(Ordering::Relaxed) {
            debug!(rows = sampler.count(), "sampling cancelled");
            return Err(QuarryError::Cancelled);
        }
        let Some(row) = rs.next()? else {
            break;
        };
        sampler.observe(row, rng);
        if sampler.count() % PROGRESS_INTERVAL == 0 {
            debug!(rows = sampler.count(), sampled = sampler.len(), "sampling progress");
        }
    }
    Ok(sampler.finish())
}
