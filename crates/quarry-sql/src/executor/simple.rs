//! Executor for simple statements.

use quarry_common::config::AnalyzeConfig;
use quarry_common::constants::{CHARACTER_SET_DATABASE, COLLATION_DATABASE, SERVER_STATUS_IN_TRANS};
use quarry_common::error::{QuarryError, QuarryResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use super::Executor;
use crate::ast::{DoStmt, Statement, UseStmt};
use crate::context::{RestrictedOutput, RestrictedQuery, SessionContext};
use crate::evaluator::evaluate;
use crate::infoschema::ColumnInfo;
use crate::row::Row;

/// Executes one simple statement.
///
/// The statement runs on the first call to [`next`](Executor::next), which
/// returns `Ok(None)`. Later calls do nothing. `BINLOG` is ignored and
/// leaves the executor not done.
pub struct SimpleExec<'a, C: SessionContext + ?Sized> {
    pub(super) stmt: Statement,
    pub(super) ctx: &'a mut C,
    pub(super) config: AnalyzeConfig,
    pub(super) rng: StdRng,
    done: bool,
}

impl<'a, C: SessionContext + ?Sized> SimpleExec<'a, C> {
    /// Creates an executor with an entropy-seeded random source.
    pub fn new(stmt: Statement, ctx: &'a mut C, config: AnalyzeConfig) -> Self {
        Self {
            stmt,
            ctx,
            config,
            rng: StdRng::from_entropy(),
            done: false,
        }
    }

    /// Replaces the random source used for sampling.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Returns true once the statement has run.
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn execute(&mut self, stmt: &Statement) -> QuarryResult<()> {
        match stmt {
            Statement::Use(s) => self.execute_use(s),
            // Accepted for compatibility; there are no table caches to flush
            Statement::FlushTable(_) => Ok(()),
            Statement::Do(s) => self.execute_do(s),
            Statement::Begin => self.execute_begin(),
            Statement::Commit => self.execute_commit(),
            Statement::Rollback => self.execute_rollback(),
            Statement::CreateUser(s) => self.execute_create_user(s),
            Statement::DropUser(s) => self.execute_drop_user(s),
            Statement::SetPassword(s) => self.execute_set_password(s),
            Statement::AnalyzeTable(s) => self.execute_analyze_table(s),
            Statement::Binlog(_) => Ok(()),
        }
    }

    fn execute_use(&mut self, stmt: &UseStmt) -> QuarryResult<()> {
        let db = self
            .ctx
            .info_schema()
            .schema_by_name(&stmt.db_name)
            .ok_or_else(|| QuarryError::DatabaseNotExists {
                name: stmt.db_name.clone(),
            })?;

        let vars = self.ctx.session_vars_mut();
        vars.current_db = stmt.db_name.clone();
        vars.set_system_var(CHARACTER_SET_DATABASE, db.charset.as_str());
        vars.set_system_var(COLLATION_DATABASE, db.collate.as_str());
        Ok(())
    }

    fn execute_do(&mut self, stmt: &DoStmt) -> QuarryResult<()> {
        for expr in &stmt.exprs {
            evaluate(expr, self.ctx.session_vars())?;
        }
        Ok(())
    }

    fn execute_begin(&mut self) -> QuarryResult<()> {
        self.ctx.txn(true)?;
        self.ctx
            .session_vars_mut()
            .set_status_flag(SERVER_STATUS_IN_TRANS, true);
        Ok(())
    }

    fn execute_commit(&mut self) -> QuarryResult<()> {
        let result = self.ctx.commit_txn();
        self.ctx
            .session_vars_mut()
            .set_status_flag(SERVER_STATUS_IN_TRANS, false);
        result
    }

    fn execute_rollback(&mut self) -> QuarryResult<()> {
        let conn = self.ctx.session_vars().connection_id;
        info!(connection_id = %conn, "[{}] execute rollback statement", conn);
        let result = self.ctx.rollback_txn();
        self.ctx
            .session_vars_mut()
            .set_status_flag(SERVER_STATUS_IN_TRANS, false);
        result
    }

    /// Fails unless the session can run restricted queries.
    pub(super) fn ensure_restricted(&mut self) -> QuarryResult<()> {
        match self.ctx.restricted_executor() {
            Some(_) => Ok(()),
            None => Err(QuarryError::RestrictedSqlUnsupported),
        }
    }

    pub(super) fn exec_restricted(&mut self, query: RestrictedQuery) -> QuarryResult<RestrictedOutput> {
        debug!(?query, "executing restricted query");
        self.ctx
            .restricted_executor()
            .ok_or(QuarryError::RestrictedSqlUnsupported)?
            .exec_restricted(query)
    }
}

impl<C: SessionContext + ?Sized> Executor for SimpleExec<'_, C> {
    fn fields(&self) -> &[ColumnInfo] {
        &[]
    }

    fn next(&mut self) -> QuarryResult<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        if let Statement::Binlog(_) = self.stmt {
            return Ok(None);
        }
        let stmt = self.stmt.clone();
        self.execute(&stmt)?;
        self.done = true;
        Ok(None)
    }

    fn close(&mut self) -> QuarryResult<()> {
        Ok(())
    }
}
