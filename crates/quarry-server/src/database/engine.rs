//! Main database engine.
//!
//! The `Database` struct is the top-level entry point for Quarry. It owns
//! the transaction manager and schema, holds table rows in memory, and
//! hands out sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use quarry_common::config::QuarryConfig;
use quarry_common::constants::SYSTEM_DB;
use quarry_common::error::{QuarryError, QuarryResult};
use quarry_common::types::{ConnectionId, DatabaseId, TableId};
use quarry_sql::infoschema::{ColumnInfo, DatabaseInfo, InfoSchema, TableInfo};
use quarry_sql::Row;
use quarry_txn::TransactionManager;
use tracing::{debug, info};

use super::session::Session;

/// Database statistics.
#[derive(Debug, Default)]
pub struct DatabaseStats {
    /// Total sessions created.
    pub total_sessions: u64,
    /// Total statements executed.
    pub total_statements: u64,
    /// Number of databases, the system database included.
    pub total_databases: usize,
    /// Total tables.
    pub total_tables: usize,
    /// Total rows across all tables.
    pub total_rows: usize,
    /// Open transactions.
    pub active_transactions: usize,
    /// Uptime.
    pub uptime: Duration,
}

/// The main database engine.
pub struct Database {
    /// Configuration.
    config: QuarryConfig,
    /// Transactions and metadata keys.
    txn_manager: Arc<TransactionManager>,
    /// Current schema snapshot.
    schema: RwLock<Arc<InfoSchema>>,
    /// Rows by table. Scans hold a snapshot; inserts copy on write.
    tables: RwLock<HashMap<TableId, Arc<Vec<Row>>>>,
    next_database_id: AtomicU64,
    next_table_id: AtomicU64,
    next_connection_id: AtomicU64,
    total_sessions: AtomicU64,
    total_statements: AtomicU64,
    /// When the database was started.
    started_at: Instant,
}

impl Database {
    /// Opens a database with the given configuration.
    ///
    /// The system database `mysql` always exists.
    pub fn open(config: QuarryConfig) -> QuarryResult<Arc<Self>> {
        config.validate()?;

        let db = Self {
            txn_manager: Arc::new(TransactionManager::in_memory()),
            schema: RwLock::new(Arc::new(InfoSchema::new())),
            tables: RwLock::new(HashMap::new()),
            next_database_id: AtomicU64::new(1),
            next_table_id: AtomicU64::new(1),
            next_connection_id: AtomicU64::new(1),
            total_sessions: AtomicU64::new(0),
            total_statements: AtomicU64::new(0),
            started_at: Instant::now(),
            config,
        };
        let charset = db.config.session.default_charset.clone();
        let collation = db.config.session.default_collation.clone();
        db.create_database(SYSTEM_DB, &charset, &collation)?;

        info!(
            node_id = db.config.node_id,
            max_sample_count = db.config.analyze.max_sample_count,
            bucket_count = db.config.analyze.bucket_count,
            "database opened"
        );
        Ok(Arc::new(db))
    }

    /// Opens a database with the default configuration.
    pub fn open_memory() -> QuarryResult<Arc<Self>> {
        Self::open(QuarryConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &QuarryConfig {
        &self.config
    }

    /// Returns the transaction manager.
    pub fn txn_manager(&self) -> &Arc<TransactionManager> {
        &self.txn_manager
    }

    /// Returns the current schema snapshot.
    pub fn info_schema(&self) -> Arc<InfoSchema> {
        Arc::clone(&self.schema.read())
    }

    /// Creates a new session.
    pub fn create_session(self: &Arc<Self>) -> Session {
        let id = ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
        debug!(connection_id = %id, "session created");
        Session::new(Arc::clone(self), id)
    }

    /// Creates a database.
    pub fn create_database(&self, name: &str, charset: &str, collate: &str) -> QuarryResult<DatabaseId> {
        let id = DatabaseId::new(self.next_database_id.fetch_add(1, Ordering::Relaxed));
        self.update_schema(|schema| {
            schema.add_database(DatabaseInfo::new(id, name, charset, collate))
        })?;
        debug!(database = name, id = %id, "database created");
        Ok(id)
    }

    /// Creates a table. Column IDs and offsets follow the given order.
    pub fn create_table(&self, db: &str, name: &str, columns: Vec<ColumnInfo>) -> QuarryResult<TableId> {
        let id = TableId::new(self.next_table_id.fetch_add(1, Ordering::Relaxed));
        let table = TableInfo::new(id, name, columns);
        self.update_schema(|schema| schema.add_table(db, table))?;
        self.tables.write().insert(id, Arc::new(Vec::new()));
        debug!(database = db, table = name, id = %id, "table created");
        Ok(id)
    }

    /// Appends rows to a table. Returns the number of rows inserted.
    pub fn insert_rows(&self, db: &str, table: &str, rows: Vec<Row>) -> QuarryResult<usize> {
        let info = self.info_schema().table_by_name(db, table)?;
        if let Some(bad) = rows.iter().find(|r| r.num_columns() != info.columns.len()) {
            return Err(QuarryError::invalid_argument(format!(
                "row {} has {} values but table {} has {} columns",
                bad,
                bad.num_columns(),
                info.name,
                info.columns.len()
            )));
        }

        let count = rows.len();
        let mut tables = self.tables.write();
        Arc::make_mut(tables.entry(info.id).or_default()).extend(rows);
        Ok(count)
    }

    /// Returns a snapshot of a table's rows.
    pub(crate) fn table_rows(&self, id: TableId) -> Arc<Vec<Row>> {
        self.tables.read().get(&id).cloned().unwrap_or_default()
    }

    /// Counts one executed statement.
    pub(crate) fn record_statement(&self) {
        self.total_statements.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns database statistics.
    pub fn stats(&self) -> DatabaseStats {
        let schema = self.info_schema();
        let total_tables = schema
            .schema_names()
            .iter()
            .filter_map(|name| schema.schema_by_name(name))
            .map(|db| db.tables.len())
            .sum();
        DatabaseStats {
            total_sessions: self.total_sessions.load(Ordering::Relaxed),
            total_statements: self.total_statements.load(Ordering::Relaxed),
            total_databases: schema.schema_names().len(),
            total_tables,
            total_rows: self.tables.read().values().map(|rows| rows.len()).sum(),
            active_transactions: self.txn_manager.active_count(),
            uptime: self.started_at.elapsed(),
        }
    }

    /// Applies a change to a copy of the schema and publishes it.
    fn update_schema<F>(&self, change: F) -> QuarryResult<()>
    where
        F: FnOnce(&mut InfoSchema) -> QuarryResult<()>,
    {
        let mut guard = self.schema.write();
        let mut next = InfoSchema::clone(&guard);
        change(&mut next)?;
        *guard = Arc::new(next);
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("node_id", &self.config.node_id)
            .field("schema_version", &self.schema.read().version())
            .finish()
    }
}
