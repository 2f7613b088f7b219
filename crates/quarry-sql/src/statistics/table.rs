//! Per-table statistics object and its stored encoding.

use quarry_common::error::{QuarryError, QuarryResult};
use quarry_common::types::{TableId, Timestamp};
use serde::{Deserialize, Serialize};

use super::histogram::{build_histogram, Histogram};
use crate::infoschema::TableInfo;
use crate::value::Datum;

/// Leading byte of every encoded statistics blob.
pub const STATS_FORMAT_VERSION: u8 = 1;

/// Statistics of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    /// Column ID from the table metadata.
    pub column_id: u64,
    /// Value distribution.
    pub histogram: Histogram,
}

/// Statistics of one table, as written by `ANALYZE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStatistics {
    /// Table the statistics describe.
    pub table_id: TableId,
    /// Start timestamp of the transaction that collected them.
    pub version: Timestamp,
    /// Exact row count at collection time.
    pub count: u64,
    /// Bucket limit used for every histogram.
    pub bucket_count: usize,
    /// One entry per table column, in column order.
    pub columns: Vec<ColumnStatistics>,
}

impl TableStatistics {
    /// Builds statistics from per-column samples.
    ///
    /// `column_samples` is indexed by column offset and is either empty (no
    /// rows were sampled) or has one entry per column of `table`.
    pub fn build(
        table: &TableInfo,
        version: Timestamp,
        count: u64,
        bucket_count: usize,
        column_samples: &[Vec<Datum>],
    ) -> QuarryResult<Self> {
        if !column_samples.is_empty() && column_samples.len() != table.columns.len() {
            return Err(QuarryError::StatisticsBuild {
                table: table.name.clone(),
                reason: format!(
                    "sampled {} columns but the table has {}",
                    column_samples.len(),
                    table.columns.len()
                ),
            });
        }

        let columns = table
            .columns
            .iter()
            .map(|col| {
                let samples = column_samples
                    .get(col.offset)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                ColumnStatistics {
                    column_id: col.id,
                    histogram: build_histogram(count, bucket_count, samples),
                }
            })
            .collect();

        Ok(Self {
            table_id: table.id,
            version,
            count,
            bucket_count,
            columns,
        })
    }

    /// Returns the statistics of a column by ID.
    pub fn column(&self, column_id: u64) -> Option<&ColumnStatistics> {
        self.columns.iter().find(|c| c.column_id == column_id)
    }

    /// Encodes the statistics for storage.
    pub fn encode(&self) -> QuarryResult<Vec<u8>> {
        let body = bincode::serialize(self).map_err(|e| QuarryError::serialization(e.to_string()))?;
        let mut blob = Vec::with_capacity(body.len() + 1);
        blob.push(STATS_FORMAT_VERSION);
        blob.extend_from_slice(&body);
        Ok(blob)
    }

    /// Decodes statistics written by [`encode`](Self::encode).
    pub fn decode(blob: &[u8]) -> QuarryResult<Self> {
        match blob.split_first() {
            Some((&STATS_FORMAT_VERSION, body)) => {
                bincode::deserialize(body).map_err(|e| QuarryError::serialization(e.to_string()))
            }
            Some((version, _)) => Err(QuarryError::serialization(format!(
                "unknown statistics format version {}",
                version
            ))),
            None => Err(QuarryError::serialization("empty statistics blob")),
        }
    }
}
