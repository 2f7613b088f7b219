//! # Quarry Database Engine
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Database                          │
//! │   ┌──────────────┐  ┌────────────────┐  ┌────────────┐   │
//! │   │ InfoSchema   │  │ TransactionMgr │  │ Table rows │   │
//! │   │ (snapshots)  │  │ + Meta keys    │  │            │   │
//! │   └──────────────┘  └────────────────┘  └────────────┘   │
//! │                           │                              │
//! │                           ▼                              │
//! │                        Session                           │
//! │        SessionContext + RestrictedSqlExecutor            │
//! │                           │                              │
//! │                           ▼                              │
//! │                      SimpleExec                          │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod engine;
mod result;
mod session;

pub use engine::{Database, DatabaseStats};
pub use result::StatementResult;
pub use session::Session;
