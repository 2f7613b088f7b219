//! Table statistics collection.
//!
//! `ANALYZE TABLE` runs these stages once per table:
//!
//! 1. [`collect_samples`] reads the scan once, keeping an exact count and a
//!    bounded reservoir of rows.
//! 2. [`rows_to_column_samples`] turns the sampled rows into per-column
//!    value vectors.
//! 3. [`TableStatistics::build`] builds one [`Histogram`] per column.
//! 4. [`save_table_stats`] encodes the result and writes it through the
//!    caller's transaction.

mod histogram;
mod persist;
mod sampler;
mod table;
mod transpose;

pub use histogram::{build_histogram, Bucket, Histogram};
pub use persist::{load_table_stats, save_table_stats};
pub use sampler::{collect_samples, ReservoirSampler, SampleCollection};
pub use table::{ColumnStatistics, TableStatistics, STATS_FORMAT_VERSION};
pub use transpose::rows_to_column_samples;
