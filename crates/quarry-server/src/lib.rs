//! # quarry-server
//!
//! Embeddable in-memory engine for Quarry.
//!
//! This crate provides:
//!
//! - **Database**: owns the transaction manager, the schema snapshot, and
//!   table rows, and offers an admin API to create databases and tables.
//! - **Session**: connection-level state. Runs simple statements through
//!   `SimpleExec` with autocommit, and serves restricted queries (table
//!   scans and `mysql.user` access) from its current transaction.
//!
//! # Quick Start
//!
//! ```rust
//! use quarry_server::Database;
//! use quarry_sql::ast::{AnalyzeTableStmt, Statement, TableName, UseStmt};
//! use quarry_sql::infoschema::{ColumnInfo, DataType};
//! use quarry_sql::{Datum, Row};
//!
//! let db = Database::open_memory().unwrap();
//! db.create_database("shop", "utf8", "utf8_bin").unwrap();
//! db.create_table("shop", "items", vec![ColumnInfo::new("id", DataType::BigInt)])
//!     .unwrap();
//! db.insert_rows("shop", "items", vec![Row::new(vec![Datum::Int(1)])])
//!     .unwrap();
//!
//! let mut session = db.create_session();
//! session
//!     .execute(Statement::Use(UseStmt { db_name: "shop".into() }))
//!     .unwrap();
//! session
//!     .execute(Statement::AnalyzeTable(AnalyzeTableStmt {
//!         tables: vec![TableName::new("items")],
//!     }))
//!     .unwrap();
//!
//! let stats = session.table_stats(&TableName::new("items")).unwrap().unwrap();
//! assert_eq!(stats.count, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Database engine and sessions.
pub mod database;

pub use database::{Database, DatabaseStats, Session, StatementResult};
