//! Session context and restricted query interfaces.
//!
//! Executors never reach into a concrete session type. They see a
//! [`SessionContext`], which supplies session variables, the schema
//! snapshot, and the current transaction, and optionally a
//! [`RestrictedSqlExecutor`] for internal reads and writes of system
//! tables.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use quarry_common::constants::{SERVER_STATUS_AUTOCOMMIT, SERVER_STATUS_IN_TRANS};
use quarry_common::error::{QuarryError, QuarryResult};
use quarry_common::types::ConnectionId;
use quarry_txn::Transaction;
use serde::{Deserialize, Serialize};

use crate::ast::TableName;
use crate::infoschema::{ColumnInfo, InfoSchema};
use crate::row::Row;

// =============================================================================
// Record sets
// =============================================================================

/// A forward-only stream of rows.
///
/// Callers must call [`close`](RecordSet::close) exactly once when done,
/// whether or not the stream was exhausted.
pub trait RecordSet {
    /// Columns of the rows produced.
    fn fields(&self) -> &[ColumnInfo];

    /// Returns the next row, or `None` when exhausted.
    fn next(&mut self) -> QuarryResult<Option<Row>>;

    /// Releases the underlying scan.
    fn close(&mut self) -> QuarryResult<()>;
}

/// A record set over rows already in memory.
///
/// Rows are shared, not copied: each call to `next` clones one row out of
/// the snapshot.
#[derive(Debug)]
pub struct MemRecordSet {
    fields: Vec<ColumnInfo>,
    rows: Arc<Vec<Row>>,
    pos: usize,
    closed: bool,
}

impl MemRecordSet {
    /// Creates a record set yielding `rows` in order.
    pub fn new(fields: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self::shared(fields, Arc::new(rows))
    }

    /// Creates a record set over a shared row snapshot.
    pub fn shared(fields: Vec<ColumnInfo>, rows: Arc<Vec<Row>>) -> Self {
        Self {
            fields,
            rows,
            pos: 0,
            closed: false,
        }
    }
}

impl RecordSet for MemRecordSet {
    fn fields(&self) -> &[ColumnInfo] {
        &self.fields
    }

    fn next(&mut self) -> QuarryResult<Option<Row>> {
        if self.closed {
            return Err(QuarryError::scan("record set is closed"));
        }
        let row = self.rows.get(self.pos).cloned();
        if row.is_some() {
            self.pos += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> QuarryResult<()> {
        if self.closed {
            return Err(QuarryError::internal("record set closed twice"));
        }
        self.closed = true;
        Ok(())
    }
}

// =============================================================================
// Restricted queries
// =============================================================================

/// An account row of `mysql.user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Account name.
    pub user: String,
    /// Host pattern.
    pub host: String,
    /// Encoded password, empty for none.
    pub password: String,
}

/// Typed internal query against system or user tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestrictedQuery {
    /// Full scan of a table. Unqualified names use the current database.
    ScanTable(TableName),
    /// Returns one row if the account exists.
    LookupUser {
        /// Account name.
        user: String,
        /// Host pattern.
        host: String,
    },
    /// Inserts accounts in one request.
    InsertUsers(Vec<UserRecord>),
    /// Deletes one account.
    DeleteUser {
        /// Account name.
        user: String,
        /// Host pattern.
        host: String,
    },
    /// Replaces an account's encoded password.
    UpdatePassword {
        /// Account name.
        user: String,
        /// Host pattern.
        host: String,
        /// Encoded password.
        password: String,
    },
}

/// Result of a restricted query.
pub enum RestrictedOutput {
    /// Rows to be read and closed by the caller.
    Rows(Box<dyn RecordSet>),
    /// Number of affected rows.
    Affected(u64),
}

impl RestrictedOutput {
    /// Unwraps a row result.
    pub fn into_rows(self) -> QuarryResult<Box<dyn RecordSet>> {
        match self {
            RestrictedOutput::Rows(rs) => Ok(rs),
            RestrictedOutput::Affected(_) => {
                Err(QuarryError::internal("restricted query returned no rows"))
            }
        }
    }

    /// Unwraps an affected-row count.
    pub fn into_affected(self) -> QuarryResult<u64> {
        match self {
            RestrictedOutput::Affected(n) => Ok(n),
            RestrictedOutput::Rows(_) => Err(QuarryError::internal(
                "restricted query returned rows instead of a count",
            )),
        }
    }
}

impl fmt::Debug for RestrictedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestrictedOutput::Rows(rs) => write!(f, "Rows({} fields)", rs.fields().len()),
            RestrictedOutput::Affected(n) => write!(f, "Affected({})", n),
        }
    }
}

/// Runs restricted queries inside the session's current transaction.
pub trait RestrictedSqlExecutor {
    /// Executes one query.
    fn exec_restricted(&mut self, query: RestrictedQuery) -> QuarryResult<RestrictedOutput>;
}

// =============================================================================
// Session state
// =============================================================================

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserIdentity {
    /// Account name.
    pub user: String,
    /// Host pattern.
    pub host: String,
}

impl UserIdentity {
    /// Creates an identity.
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
        }
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.host)
    }
}

/// Per-connection variables.
#[derive(Debug, Clone)]
pub struct SessionVars {
    /// Connection this session belongs to.
    pub connection_id: ConnectionId,
    /// Current database; empty when none is selected.
    pub current_db: String,
    /// Logged-in account, if any.
    pub current_user: Option<UserIdentity>,
    /// Server status flags (`SERVER_STATUS_*`).
    pub status: u16,
    /// System variables keyed by lower-cased name.
    systems: HashMap<String, String>,
    killed: Arc<AtomicBool>,
}

impl SessionVars {
    /// Creates variables for a new connection with autocommit enabled.
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            current_db: String::new(),
            current_user: None,
            status: SERVER_STATUS_AUTOCOMMIT,
            systems: HashMap::new(),
            killed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sets a system variable.
    pub fn set_system_var(&mut self, name: &str, value: impl Into<String>) {
        self.systems.insert(name.to_lowercase(), value.into());
    }

    /// Reads a system variable, case-insensitively.
    pub fn system_var(&self, name: &str) -> Option<&str> {
        self.systems.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Sets or clears a status flag.
    pub fn set_status_flag(&mut self, flag: u16, on: bool) {
        if on {
            self.status |= flag;
        } else {
            self.status &= !flag;
        }
    }

    /// Returns true if every bit of `flag` is set.
    pub fn has_status_flag(&self, flag: u16) -> bool {
        self.status & flag == flag
    }

    /// Returns true inside an explicit transaction.
    pub fn in_transaction(&self) -> bool {
        self.has_status_flag(SERVER_STATUS_IN_TRANS)
    }

    /// Shared kill flag; setting it cancels long-running statements.
    pub fn kill_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.killed)
    }

    /// Returns true once the session has been killed.
    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Relaxed)
    }
}

/// Everything a statement executor needs from its session.
pub trait SessionContext {
    /// Session variables.
    fn session_vars(&self) -> &SessionVars;

    /// Mutable session variables.
    fn session_vars_mut(&mut self) -> &mut SessionVars;

    /// Current schema snapshot.
    fn info_schema(&self) -> Arc<InfoSchema>;

    /// Returns the current transaction, starting one if needed.
    ///
    /// With `force_new`, an open transaction is committed first and a fresh
    /// one is started.
    fn txn(&mut self, force_new: bool) -> QuarryResult<Arc<dyn Transaction>>;

    /// Commits the current transaction. A no-op when none is open.
    fn commit_txn(&mut self) -> QuarryResult<()>;

    /// Rolls back the current transaction. A no-op when none is open.
    fn rollback_txn(&mut self) -> QuarryResult<()>;

    /// Capability for internal queries; `None` if the session has none.
    fn restricted_executor(&mut self) -> Option<&mut dyn RestrictedSqlExecutor> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infoschema::DataType;
    use crate::value::Datum;

    #[test]
    fn test_session_vars_flags() {
        let mut vars = SessionVars::new(ConnectionId::new(7));
        assert!(vars.has_status_flag(SERVER_STATUS_AUTOCOMMIT));
        assert!(!vars.in_transaction());

        vars.set_status_flag(SERVER_STATUS_IN_TRANS, true);
        assert!(vars.in_transaction());
        vars.set_status_flag(SERVER_STATUS_IN_TRANS, false);
        assert!(!vars.in_transaction());
        assert!(vars.has_status_flag(SERVER_STATUS_AUTOCOMMIT));
    }

    #[test]
    fn test_system_vars_case_insensitive() {
        let mut vars = SessionVars::new(ConnectionId::new(1));
        vars.set_system_var("Collation_Database", "utf8_bin");
        assert_eq!(vars.system_var("COLLATION_DATABASE"), Some("utf8_bin"));
        assert_eq!(vars.system_var("missing"), None);
    }

    #[test]
    fn test_kill_flag_shared() {
        let vars = SessionVars::new(ConnectionId::new(1));
        let flag = vars.kill_flag();
        assert!(!vars.is_killed());
        flag.store(true, Ordering::Relaxed);
        assert!(vars.is_killed());
    }

    #[test]
    fn test_mem_record_set() {
        let fields = vec![ColumnInfo::new("a", DataType::BigInt)];
        let mut rs = MemRecordSet::new(fields, vec![Row::new(vec![Datum::Int(1)])]);
        assert_eq!(rs.fields().len(), 1);
        assert_eq!(rs.next().unwrap().unwrap().get(0), Some(&Datum::Int(1)));
        assert!(rs.next().unwrap().is_none());
        rs.close().unwrap();
        assert!(rs.close().is_err());
        assert!(rs.next().is_err());
    }

    #[test]
    fn test_mem_record_set_shares_rows() {
        let rows = Arc::new(vec![
            Row::new(vec![Datum::Int(1)]),
            Row::new(vec![Datum::Int(2)]),
        ]);
        let mut rs = MemRecordSet::shared(vec![], Arc::clone(&rows));
        assert_eq!(Arc::strong_count(&rows), 2);
        assert_eq!(rs.next().unwrap().unwrap().get(0), Some(&Datum::Int(1)));
        assert_eq!(rs.next().unwrap().unwrap().get(0), Some(&Datum::Int(2)));
        assert!(rs.next().unwrap().is_none());
        assert!(rs.next().unwrap().is_none());
        rs.close().unwrap();
        drop(rs);
        assert_eq!(Arc::strong_count(&rows), 1);
    }

    #[test]
    fn test_restricted_output_unwrap() {
        assert_eq!(RestrictedOutput::Affected(3).into_affected().unwrap(), 3);
        assert!(RestrictedOutput::Affected(3).into_rows().is_err());
        let rows = RestrictedOutput::Rows(Box::new(MemRecordSet::new(vec![], vec![])));
        assert_eq!(format!("{:?}", rows), "Rows(0 fields)");
        assert!(rows.into_affected().is_err());
    }

    #[test]
    fn test_user_identity_display() {
        assert_eq!(UserIdentity::new("root", "%").to_string(), "root@%");
    }
}
