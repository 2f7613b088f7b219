//! Statement executors.
//!
//! Executors use a pull-based model: the caller drives [`Executor::next`]
//! until it returns `Ok(None)`, then calls [`Executor::close`].
//!
//! ```ignore
//! let mut exec = SimpleExec::new(stmt, &mut session, config.analyze.clone());
//! while let Some(row) = exec.next()? {
//!     // simple statements produce no rows
//! }
//! exec.close()?;
//! ```

mod analyze;
mod simple;
mod user;

#[cfg(test)]
mod testutil;

pub use simple::SimpleExec;
pub use user::{encode_password, parse_user};

use quarry_common::error::QuarryResult;

use crate::infoschema::ColumnInfo;
use crate::row::Row;

/// A pull-based statement executor.
pub trait Executor {
    /// Columns of the rows produced.
    fn fields(&self) -> &[ColumnInfo];

    /// Produces the next row, or `None` when finished.
    fn next(&mut self) -> QuarryResult<Option<Row>>;

    /// Releases resources held by the executor.
    fn close(&mut self) -> QuarryResult<()>;
}
