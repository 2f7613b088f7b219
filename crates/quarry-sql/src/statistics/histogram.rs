//! Equi-depth histograms built from column samples.
//!
//! Counts in a histogram are scaled from the sample to the whole table by
//! the sample factor `count / sample_len`, so a histogram built from a
//! 10 000 row sample of a 20 000 row table reports 20 000 rows.

use serde::{Deserialize, Serialize};

use crate::value::Datum;

/// One histogram bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Cumulative number of non-null rows up to and including this bucket.
    pub count: u64,
    /// Largest value in the bucket.
    pub upper_bound: Datum,
    /// Number of rows equal to `upper_bound`.
    pub repeats: u64,
}

/// Value distribution of one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    /// Distinct non-null values in the sample.
    pub ndv: u64,
    /// Estimated NULL rows.
    pub null_count: u64,
    /// Buckets in ascending `upper_bound` order.
    pub buckets: Vec<Bucket>,
}

impl Histogram {
    /// Returns true if no rows are described.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty() && self.null_count == 0
    }

    /// Estimated non-null rows.
    pub fn non_null_count(&self) -> u64 {
        self.buckets.last().map_or(0, |b| b.count)
    }

    /// Estimated total rows, NULLs included.
    pub fn total_count(&self) -> u64 {
        self.non_null_count() + self.null_count
    }
}

/// Builds an equi-depth histogram of at most `bucket_count` buckets.
///
/// `count` is the exact table row count and `samples` the column's values
/// from the sample. Equal values always land in the same bucket.
pub fn build_histogram(count: u64, bucket_count: usize, samples: &[Datum]) -> Histogram {
    if count == 0 || samples.is_empty() {
        return Histogram::default();
    }

    let factor = count / samples.len() as u64;
    let mut values: Vec<&Datum> = samples.iter().filter(|v| !v.is_null()).collect();
    let null_count = (samples.len() - values.len()) as u64 * factor;
    values.sort();

    let mut hist = Histogram {
        ndv: 0,
        null_count,
        buckets: Vec::new(),
    };
    if bucket_count == 0 {
        return hist;
    }

    let depth = count / bucket_count as u64 + factor;
    let mut last_count = 0u64;
    let mut prev: Option<&Datum> = None;

    for (i, value) in values.into_iter().enumerate() {
        let total = (i as u64 + 1) * factor;
        if prev != Some(value) {
            hist.ndv += 1;
        }
        prev = Some(value);

        let full = hist.buckets.len() >= bucket_count;
        match hist.buckets.last_mut() {
            Some(bucket) if bucket.upper_bound == *value => {
                bucket.count = total;
                bucket.repeats += factor;
            }
            Some(bucket) if total - last_count <= depth || full => {
                bucket.count = total;
                bucket.upper_bound = value.clone();
                bucket.repeats = factor;
            }
            Some(bucket) => {
                last_count = bucket.count;
                hist.buckets.push(Bucket {
                    count: total,
                    upper_bound: value.clone(),
                    repeats: factor,
                });
            }
            None => hist.buckets.push(Bucket {
                count: total,
                upper_bound: value.clone(),
                repeats: factor,
            }),
        }
    }
    hist
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: impl IntoIterator<Item = i64>) -> Vec<Datum> {
        values.into_iter().map(Datum::Int).collect()
    }

    fn assert_well_formed(hist: &Histogram, bucket_count: usize) {
        assert!(hist.buckets.len() <= bucket_count);
        for pair in hist.buckets.windows(2) {
            assert!(pair[0].upper_bound < pair[1].upper_bound);
            assert!(pair[0].count < pair[1].count);
        }
        for bucket in &hist.buckets {
            assert!(bucket.repeats > 0);
            assert!(bucket.repeats <= bucket.count);
        }
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(build_histogram(0, 256, &[]), Histogram::default());
        assert_eq!(build_histogram(0, 256, &ints([1, 2])), Histogram::default());
        assert_eq!(build_histogram(5, 256, &[]), Histogram::default());
        assert!(Histogram::default().is_empty());
    }

    #[test]
    fn test_unique_values() {
        let hist = build_histogram(1000, 10, &ints(0..1000));
        assert_well_formed(&hist, 10);
        assert_eq!(hist.ndv, 1000);
        assert_eq!(hist.null_count, 0);
        assert_eq!(hist.non_null_count(), 1000);
        assert_eq!(hist.buckets.last().unwrap().upper_bound, Datum::Int(999));
        // depth = 1000 / 10 + 1
        assert_eq!(hist.buckets[0].count, 101);
    }

    #[test]
    fn test_repeated_values_share_bucket() {
        let mut samples = ints(std::iter::repeat(5).take(50));
        samples.extend(ints(0..10));
        let hist = build_histogram(60, 4, &samples);
        assert_well_formed(&hist, 4);
        assert_eq!(hist.ndv, 10);

        let five = hist
            .buckets
            .iter()
            .find(|b| b.upper_bound == Datum::Int(5))
            .unwrap();
        assert_eq!(five.repeats, 51);
    }

    #[test]
    fn test_nulls_counted_separately() {
        let samples = vec![Datum::Null, Datum::Int(2), Datum::Null, Datum::Int(1)];
        let hist = build_histogram(4, 256, &samples);
        assert_eq!(hist.null_count, 2);
        assert_eq!(hist.ndv, 2);
        assert_eq!(hist.non_null_count(), 2);
        assert_eq!(hist.total_count(), 4);
        assert_eq!(hist.buckets[0].upper_bound, Datum::Int(1));
    }

    #[test]
    fn test_all_nulls() {
        let hist = build_histogram(3, 256, &[Datum::Null, Datum::Null, Datum::Null]);
        assert_eq!(hist.null_count, 3);
        assert!(hist.buckets.is_empty());
        assert!(!hist.is_empty());
    }

    #[test]
    fn test_counts_scaled_by_sample_factor() {
        let hist = build_histogram(20_000, 256, &ints(0..10_000));
        assert_well_formed(&hist, 256);
        assert_eq!(hist.non_null_count(), 20_000);
        assert!(hist.buckets.iter().all(|b| b.repeats == 2));
    }

    #[test]
    fn test_bucket_limit_respected() {
        let hist = build_histogram(100, 3, &ints(0..100));
        assert_well_formed(&hist, 3);
        assert_eq!(hist.buckets.last().unwrap().count, 100);
        assert_eq!(hist.buckets.last().unwrap().upper_bound, Datum::Int(99));

        assert!(build_histogram(100, 0, &ints(0..100)).buckets.is_empty());
    }

    #[test]
    fn test_mixed_numeric_kinds() {
        let samples = vec![Datum::Double(2.5), Datum::Int(1), Datum::Int(3)];
        let hist = build_histogram(3, 256, &samples);
        assert_eq!(hist.ndv, 3);
        assert_eq!(hist.buckets.last().unwrap().upper_bound, Datum::Int(3));
    }
}
