//! Reading and writing statistics through the metadata store.

use quarry_common::error::QuarryResult;
use quarry_common::types::TableId;
use quarry_txn::{Meta, Transaction};

use super::table::TableStatistics;

/// Writes `stats` into `txn`. The caller owns commit and rollback.
pub fn save_table_stats(txn: &dyn Transaction, stats: &TableStatistics) -> QuarryResult<()> {
    let blob = stats.encode()?;
    Meta::new(txn).set_table_stats(stats.table_id, &blob)
}

/// Reads the statistics of a table visible to `txn`.
pub fn load_table_stats(
    txn: &dyn Transaction,
    table_id: TableId,
) -> QuarryResult<Option<TableStatistics>> {
    Meta::new(txn)
        .get_table_stats(table_id)?
        .map(|blob| TableStatistics::decode(&blob))
        .transpose()
}
