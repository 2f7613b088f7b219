//! Schema snapshot.
//!
//! An [`InfoSchema`] is an immutable view of databases and their tables.
//! Sessions hold an `Arc<InfoSchema>`; schema changes build a new snapshot
//! and bump its version.

use std::collections::HashMap;
use std::sync::Arc;

use quarry_common::error::{QuarryError, QuarryResult};
use quarry_common::types::{DatabaseId, TableId};
use serde::{Deserialize, Serialize};

/// Column data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean.
    Boolean,
    /// 64-bit integer.
    BigInt,
    /// 64-bit float.
    Double,
    /// Variable-length string.
    Varchar,
    /// Binary data.
    Blob,
    /// Date.
    Date,
    /// Timestamp.
    Timestamp,
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column ID, unique within the table.
    pub id: u64,
    /// Column name.
    pub name: String,
    /// Position of the column in a row.
    pub offset: usize,
    /// Declared type.
    pub data_type: DataType,
}

impl ColumnInfo {
    /// Creates a column; `id` and `offset` are assigned by [`TableInfo::new`].
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: 0,
            name: name.into(),
            offset: 0,
            data_type,
        }
    }
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table ID.
    pub id: TableId,
    /// Table name.
    pub name: String,
    /// Columns in row order.
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    /// Creates table metadata, numbering columns from 1 in the given order.
    pub fn new(id: TableId, name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(offset, mut col)| {
                col.id = offset as u64 + 1;
                col.offset = offset;
                col
            })
            .collect();
        Self {
            id,
            name: name.into(),
            columns,
        }
    }

    /// Finds a column by name, case-insensitively.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Database metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    /// Database ID.
    pub id: DatabaseId,
    /// Database name as created.
    pub name: String,
    /// Default character set.
    pub charset: String,
    /// Default collation.
    pub collate: String,
    /// Tables in creation order.
    pub tables: Vec<Arc<TableInfo>>,
}

impl DatabaseInfo {
    /// Creates an empty database.
    pub fn new(
        id: DatabaseId,
        name: impl Into<String>,
        charset: impl Into<String>,
        collate: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            charset: charset.into(),
            collate: collate.into(),
            tables: Vec::new(),
        }
    }

    /// Finds a table by name, case-insensitively.
    pub fn table(&self, name: &str) -> Option<&Arc<TableInfo>> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// Immutable schema snapshot.
#[derive(Debug, Clone, Default)]
pub struct InfoSchema {
    version: u64,
    /// Databases keyed by lower-cased name.
    databases: HashMap<String, Arc<DatabaseInfo>>,
}

impl InfoSchema {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the schema version. Every change increments it.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Looks up a database by name, case-insensitively.
    pub fn schema_by_name(&self, name: &str) -> Option<Arc<DatabaseInfo>> {
        self.databases.get(&name.to_lowercase()).cloned()
    }

    /// Returns true if the database exists.
    pub fn schema_exists(&self, name: &str) -> bool {
        self.databases.contains_key(&name.to_lowercase())
    }

    /// Looks up a table, case-insensitively.
    pub fn table_by_name(&self, schema: &str, table: &str) -> QuarryResult<Arc<TableInfo>> {
        self.schema_by_name(schema)
            .and_then(|db| db.table(table).cloned())
            .ok_or_else(|| QuarryError::TableNotExists {
                schema: schema.to_string(),
                table: table.to_string(),
            })
    }

    /// Lists database names, sorted.
    pub fn schema_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.databases.values().map(|db| db.name.clone()).collect();
        names.sort();
        names
    }

    /// Adds a database.
    pub fn add_database(&mut self, db: DatabaseInfo) -> QuarryResult<()> {
        let key = db.name.to_lowercase();
        if self.databases.contains_key(&key) {
            return Err(QuarryError::DatabaseExists { name: db.name });
        }
        self.databases.insert(key, Arc::new(db));
        self.version += 1;
        Ok(())
    }

    /// Adds a table to an existing database.
    pub fn add_table(&mut self, schema: &str, table: TableInfo) -> QuarryResult<()> {
        let key = schema.to_lowercase();
        let db = self
            .databases
            .get_mut(&key)
            .ok_or_else(|| QuarryError::DatabaseNotExists {
                name: schema.to_string(),
            })?;
        if db.table(&table.name).is_some() {
            return Err(QuarryError::TableExists {
                schema: db.name.clone(),
                table: table.name,
            });
        }
        Arc::make_mut(db).tables.push(Arc::new(table));
        self.version += 1;
        Ok(())
    }
}
