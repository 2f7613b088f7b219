//! Type definitions for Quarry.
//!
//! This module contains the core identifier and timestamp types used
//! across the engine.

mod ids;
mod timestamps;

pub use ids::{ConnectionId, DatabaseId, TableId, TxnId};
pub use timestamps::{Timestamp, LOGICAL_BITS};
