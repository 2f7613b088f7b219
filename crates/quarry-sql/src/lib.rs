//! # quarry-sql
//!
//! Execution of simple (non-relational) statements and the `ANALYZE TABLE`
//! statistics pipeline.
//!
//! This crate implements:
//! - Runtime values (`Datum`) and rows
//! - The statement AST and the expression evaluator used by `DO`
//! - The schema snapshot (`InfoSchema`) and session context traits
//! - Reservoir sampling, histogram construction, and statistics persistence
//! - `SimpleExec`, the executor that dispatches every simple statement
//!
//! # ANALYZE pipeline
//!
//! ```text
//! RecordSet ──▶ ReservoirSampler ──▶ rows_to_column_samples
//!                                              │
//!                                              ▼
//!          Meta::set_table_stats ◀── encode ◀── TableStatistics::build
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Statement syntax tree
pub mod ast;

/// Session context and restricted query interfaces
pub mod context;

/// Expression evaluation
pub mod evaluator;

/// Statement executors
pub mod executor;

/// Schema snapshot
pub mod infoschema;

/// Sampling, histograms, and persisted table statistics
pub mod statistics;

mod row;
mod value;

pub use row::Row;
pub use value::Datum;
