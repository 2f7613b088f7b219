//! Configuration structures for Quarry.
//!
//! This module contains the engine configuration, including the
//! parameters used by `ANALYZE TABLE`.

mod database;

pub use database::{AnalyzeConfig, QuarryConfig, SessionDefaults};
