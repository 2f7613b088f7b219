//! Database sessions.
//!
//! A `Session` is one client connection. It owns the session variables and
//! at most one open transaction, runs statements through `SimpleExec`, and
//! serves the restricted queries those statements issue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use quarry_common::error::{QuarryError, QuarryResult};
use quarry_common::types::ConnectionId;
use quarry_sql::ast::{Statement, TableName};
use quarry_sql::context::{
    MemRecordSet, RestrictedOutput, RestrictedQuery, RestrictedSqlExecutor, SessionContext,
    SessionVars, UserIdentity, UserRecord,
};
use quarry_sql::executor::{Executor, SimpleExec};
use quarry_sql::infoschema::{ColumnInfo, DataType, InfoSchema, TableInfo};
use quarry_sql::statistics::{load_table_stats, TableStatistics};
use quarry_sql::{Datum, Row};
use quarry_txn::{Meta, Transaction, TxnHandle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use super::engine::Database;
use super::result::StatementResult;

/// A client session.
pub struct Session {
    db: Arc<Database>,
    vars: SessionVars,
    txn: Option<TxnHandle>,
    rng_seed: Option<u64>,
    statement_count: u64,
}

impl Session {
    pub(crate) fn new(db: Arc<Database>, id: ConnectionId) -> Self {
        Self {
            db,
            vars: SessionVars::new(id),
            txn: None,
            rng_seed: None,
            statement_count: 0,
        }
    }

    /// Returns the connection ID.
    pub fn id(&self) -> ConnectionId {
        self.vars.connection_id
    }

    /// Returns the session variables.
    pub fn vars(&self) -> &SessionVars {
        &self.vars
    }

    /// Sets the logged-in account.
    pub fn set_current_user(&mut self, user: UserIdentity) {
        self.vars.current_user = Some(user);
    }

    /// Makes `ANALYZE TABLE` sampling deterministic for this session.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Returns true while a transaction is open.
    pub fn has_open_txn(&self) -> bool {
        self.txn.is_some()
    }

    /// Executes one statement.
    ///
    /// Outside `BEGIN`, every statement runs in its own transaction, which
    /// is committed on success and rolled back on failure. Inside `BEGIN`,
    /// a failed statement leaves the transaction open.
    pub fn execute(&mut self, stmt: Statement) -> QuarryResult<StatementResult> {
        self.statement_count += 1;
        self.db.record_statement();
        let result = StatementResult::for_statement(&stmt);
        let command = stmt.name();
        debug!(connection_id = %self.id(), command, "executing statement");

        let outcome = self.run_statement(stmt);
        if self.vars.in_transaction() {
            return outcome.map(|_| result);
        }

        match outcome {
            Ok(()) => {
                self.commit_txn()?;
                Ok(result)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback_txn() {
                    warn!(
                        connection_id = %self.id(),
                        error = %rollback_err,
                        "rollback after failed statement failed"
                    );
                }
                Err(err)
            }
        }
    }

    fn run_statement(&mut self, stmt: Statement) -> QuarryResult<()> {
        let config = self.db.config().analyze.clone();
        let seed = self
            .rng_seed
            .map(|seed| seed.wrapping_add(self.statement_count));

        let mut exec = SimpleExec::new(stmt, self, config);
        if let Some(seed) = seed {
            exec = exec.with_rng(StdRng::seed_from_u64(seed));
        }
        while exec.next()?.is_some() {}
        exec.close()
    }

    /// Reads the statistics stored for a table.
    ///
    /// Uses the open transaction if there is one, so statistics written
    /// earlier in the same transaction are visible.
    pub fn table_stats(&mut self, name: &TableName) -> QuarryResult<Option<TableStatistics>> {
        let table = self.resolve_table(name)?;
        if let Some(txn) = &self.txn {
            return load_table_stats(txn, table.id);
        }

        let txn = TxnHandle::begin(Arc::clone(self.db.txn_manager()))?;
        let loaded = load_table_stats(&txn, table.id);
        txn.rollback()?;
        loaded
    }

    /// Cancels the running statement and every later `ANALYZE TABLE`.
    pub fn kill(&self) {
        self.vars.kill_flag().store(true, Ordering::Relaxed);
    }

    /// Flag another thread can set to kill this session.
    pub fn kill_handle(&self) -> Arc<AtomicBool> {
        self.vars.kill_flag()
    }

    fn resolve_table(&self, name: &TableName) -> QuarryResult<Arc<TableInfo>> {
        let schema = match &name.schema {
            Some(schema) => schema.as_str(),
            None => self.vars.current_db.as_str(),
        };
        if schema.is_empty() {
            return Err(QuarryError::NoDatabaseSelected);
        }
        self.db.info_schema().table_by_name(schema, &name.name)
    }

    fn read_user(txn: &dyn Transaction, user: &str, host: &str) -> QuarryResult<Option<UserRecord>> {
        Meta::new(txn)
            .get_user(user, host)?
            .map(|raw| {
                bincode::deserialize(&raw).map_err(|e| QuarryError::serialization(e.to_string()))
            })
            .transpose()
    }

    fn write_user(txn: &dyn Transaction, record: &UserRecord) -> QuarryResult<()> {
        let raw = bincode::serialize(record).map_err(|e| QuarryError::serialization(e.to_string()))?;
        Meta::new(txn).set_user(&record.user, &record.host, Bytes::from(raw))
    }
}

/// Columns of a `mysql.user` lookup.
fn user_fields() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("Host", DataType::Varchar),
        ColumnInfo::new("User", DataType::Varchar),
        ColumnInfo::new("Password", DataType::Varchar),
    ]
}

impl SessionContext for Session {
    fn session_vars(&self) -> &SessionVars {
        &self.vars
    }

    fn session_vars_mut(&mut self) -> &mut SessionVars {
        &mut self.vars
    }

    fn info_schema(&self) -> Arc<InfoSchema> {
        self.db.info_schema()
    }

    fn txn(&mut self, force_new: bool) -> QuarryResult<Arc<dyn Transaction>> {
        if force_new && self.txn.is_some() {
            self.commit_txn()?;
        }
        let txn = match &self.txn {
            Some(txn) => txn.clone(),
            None => {
                let txn = TxnHandle::begin(Arc::clone(self.db.txn_manager()))?;
                debug!(connection_id = %self.id(), txn = ?txn, "transaction started");
                self.txn = Some(txn.clone());
                txn
            }
        };
        Ok(Arc::new(txn))
    }

    fn commit_txn(&mut self) -> QuarryResult<()> {
        match self.txn.take() {
            Some(txn) => {
                let commit_ts = txn.commit()?;
                debug!(connection_id = %self.id(), txn_id = %txn.id(), %commit_ts, "transaction committed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn rollback_txn(&mut self) -> QuarryResult<()> {
        match self.txn.take() {
            Some(txn) => {
                txn.rollback()?;
                debug!(connection_id = %self.id(), txn_id = %txn.id(), "transaction rolled back");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn restricted_executor(&mut self) -> Option<&mut dyn RestrictedSqlExecutor> {
        Some(self)
    }
}

impl RestrictedSqlExecutor for Session {
    fn exec_restricted(&mut self, query: RestrictedQuery) -> QuarryResult<RestrictedOutput> {
        let txn = self.txn(false)?;
        let txn = txn.as_ref();

        match query {
            RestrictedQuery::ScanTable(name) => {
                let table = self.resolve_table(&name)?;
                let rows = self.db.table_rows(table.id);
                Ok(RestrictedOutput::Rows(Box::new(MemRecordSet::shared(
                    table.columns.clone(),
                    rows,
                ))))
            }
            RestrictedQuery::LookupUser { user, host } => {
                let rows = Self::read_user(txn, &user, &host)?
                    .map(|r| {
                        vec![Row::new(vec![
                            Datum::String(r.host),
                            Datum::String(r.user),
                            Datum::String(r.password),
                        ])]
                    })
                    .unwrap_or_default();
                Ok(RestrictedOutput::Rows(Box::new(MemRecordSet::new(
                    user_fields(),
                    rows,
                ))))
            }
            RestrictedQuery::InsertUsers(records) => {
                for record in &records {
                    Self::write_user(txn, record)?;
                }
                Ok(RestrictedOutput::Affected(records.len() as u64))
            }
            RestrictedQuery::DeleteUser { user, host } => {
                let removed = Meta::new(txn).delete_user(&user, &host)?;
                Ok(RestrictedOutput::Affected(u64::from(removed)))
            }
            RestrictedQuery::UpdatePassword {
                user,
                host,
                password,
            } => match Self::read_user(txn, &user, &host)? {
                Some(mut record) => {
                    record.password = password;
                    Self::write_user(txn, &record)?;
                    Ok(RestrictedOutput::Affected(1))
                }
                None => Ok(RestrictedOutput::Affected(0)),
            },
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.rollback_txn() {
            warn!(connection_id = %self.id(), error = %err, "failed to roll back on session close");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.vars.connection_id)
            .field("current_db", &self.vars.current_db)
            .field("txn", &self.txn)
            .finish()
    }
}
