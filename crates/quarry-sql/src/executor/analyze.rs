//! `ANALYZE TABLE`: sample, build, and persist table statistics.

use std::sync::Arc;
use std::time::Instant;

use quarry_common::error::{QuarryError, QuarryResult};
use tracing::{info, warn};

use super::simple::SimpleExec;
use crate::ast::{AnalyzeTableStmt, TableName};
use crate::context::{RecordSet, RestrictedQuery, SessionContext};
use crate::infoschema::TableInfo;
use crate::statistics::{collect_samples, rows_to_column_samples, save_table_stats, TableStatistics};

/// Closes a scan exactly once, on whichever path leaves first.
struct ScanGuard {
    rs: Box<dyn RecordSet>,
    closed: bool,
}

impl ScanGuard {
    fn new(rs: Box<dyn RecordSet>) -> Self {
        Self { rs, closed: false }
    }

    fn record_set(&mut self) -> &mut dyn RecordSet {
        self.rs.as_mut()
    }

    fn close(&mut self) -> QuarryResult<()> {
        self.closed = true;
        self.rs.close()
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.rs.close() {
                warn!(error = %err, "failed to close table scan");
            }
        }
    }
}

impl<C: SessionContext + ?Sized> SimpleExec<'_, C> {
    pub(super) fn execute_analyze_table(&mut self, stmt: &AnalyzeTableStmt) -> QuarryResult<()> {
        self.ensure_restricted()?;
        for table in &stmt.tables {
            self.analyze_table(table)?;
        }
        Ok(())
    }

    /// Resolves a table name against the current database.
    fn resolve_table(&self, name: &TableName) -> QuarryResult<Arc<TableInfo>> {
        let schema = match &name.schema {
            Some(schema) => schema.as_str(),
            None => self.ctx.session_vars().current_db.as_str(),
        };
        if schema.is_empty() {
            return Err(QuarryError::NoDatabaseSelected);
        }
        self.ctx.info_schema().table_by_name(schema, &name.name)
    }

    fn analyze_table(&mut self, name: &TableName) -> QuarryResult<()> {
        let started = Instant::now();
        let table = self.resolve_table(name)?;
        let killed = self.ctx.session_vars().kill_flag();

        let rs = self
            .exec_restricted(RestrictedQuery::ScanTable(name.clone()))?
            .into_rows()?;
        let mut scan = ScanGuard::new(rs);
        let collected = collect_samples(
            scan.record_set(),
            self.config.max_sample_count,
            &mut self.rng,
            &killed,
        )?;
        scan.close()?;
        drop(scan);

        let txn = self.ctx.txn(false)?;
        let sampled = collected.samples.len();
        let columns = rows_to_column_samples(collected.samples);
        let stats = TableStatistics::build(
            &table,
            txn.start_ts(),
            collected.count,
            self.config.bucket_count,
            &columns,
        )?;
        save_table_stats(txn.as_ref(), &stats)?;

        info!(
            table = %name,
            table_id = %table.id,
            rows = collected.count,
            sampled,
            version = ?stats.version,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analyzed table"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;
    use crate::executor::testutil::MockSession;
    use crate::executor::Executor;
    use crate::statistics::load_table_stats;
    use crate::value::Datum;
    use quarry_common::config::AnalyzeConfig;
    use quarry_common::types::TableId;
    use quarry_txn::{Transaction, TxnHandle};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn analyze(session: &mut MockSession, tables: Vec<TableName>) -> QuarryResult<()> {
        let stmt = Statement::AnalyzeTable(AnalyzeTableStmt { tables });
        SimpleExec::new(stmt, session, AnalyzeConfig::default())
            .with_rng(StdRng::seed_from_u64(11))
            .next()
            .map(|_| ())
    }

    fn stored(session: &MockSession, id: u64) -> Option<TableStatistics> {
        let txn = session.txn.as_ref().expect("open transaction");
        load_table_stats(txn, TableId::new(id)).unwrap()
    }

    #[test]
    fn test_small_table() {
        let mut session = MockSession::new();
        session.use_db("test");
        session.fill_t1(3);
        analyze(&mut session, vec![TableName::new("t1")]).unwrap();

        let stats = stored(&session, 1).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.bucket_count, 256);
        assert_eq!(stats.columns.len(), 2);
        assert_eq!(stats.columns[0].histogram.ndv, 3);
        assert_eq!(
            stats.columns[0].histogram.buckets.last().unwrap().upper_bound,
            Datum::Int(2)
        );
        assert_eq!(stats.version, session.txn.as_ref().unwrap().start_ts());
        assert_eq!(session.scan_closes(), 1);
    }

    #[test]
    fn test_large_table_sampled() {
        let mut session = MockSession::new();
        session.fill_t1(20_000);
        analyze(&mut session, vec![TableName::qualified("test", "t1")]).unwrap();

        let stats = stored(&session, 1).unwrap();
        assert_eq!(stats.count, 20_000);
        let hist = &stats.columns[0].histogram;
        assert_eq!(hist.ndv, 10_000);
        assert_eq!(hist.non_null_count(), 20_000);
    }

    #[test]
    fn test_empty_table() {
        let mut session = MockSession::new();
        analyze(&mut session, vec![TableName::qualified("test", "empty")]).unwrap();

        let stats = stored(&session, 3).unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.columns.len(), 1);
        assert!(stats.columns[0].histogram.is_empty());
        assert_eq!(session.scan_closes(), 1);
    }

    #[test]
    fn test_reanalyze_gets_fresh_version() {
        let mut session = MockSession::new();
        session.fill_t1(10);
        let name = TableName::qualified("test", "t1");

        analyze(&mut session, vec![name.clone()]).unwrap();
        let first = stored(&session, 1).unwrap();
        session.commit();

        analyze(&mut session, vec![name]).unwrap();
        let second = stored(&session, 1).unwrap();
        assert_eq!(first.count, second.count);
        assert_eq!(first.bucket_count, second.bucket_count);
        assert!(second.version > first.version);
    }

    #[test]
    fn test_second_table_failure_keeps_first() {
        let mut session = MockSession::new();
        session.fill_t1(5);
        session.fail_scan_after("t2", 2);

        let err = analyze(
            &mut session,
            vec![
                TableName::qualified("test", "t1"),
                TableName::qualified("test", "t2"),
            ],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "scan failed: injected failure on t2");

        assert_eq!(stored(&session, 1).unwrap().count, 5);
        assert!(stored(&session, 2).is_none());
        assert_eq!(session.scan_closes(), 2);
    }

    #[test]
    fn test_scan_failure_persists_nothing() {
        let mut session = MockSession::new();
        session.fail_scan_after("t2", 0);
        assert!(analyze(&mut session, vec![TableName::qualified("test", "t2")]).is_err());

        // The scan opened the session transaction and the failure leaves it
        // open without a write; committing it publishes nothing either
        assert!(session.txn.is_some());
        assert_eq!(session.txn_begins, 1);
        assert_eq!(session.commits, 0);
        assert!(stored(&session, 2).is_none());
        assert_eq!(session.scan_closes(), 1);

        session.commit_txn().unwrap();
        let reader = TxnHandle::begin(Arc::clone(&session.tm)).unwrap();
        assert!(load_table_stats(&reader, TableId::new(2)).unwrap().is_none());
    }

    #[test]
    fn test_unknown_table_and_no_database() {
        let mut session = MockSession::new();
        let err = analyze(&mut session, vec![TableName::new("t1")]).unwrap_err();
        assert!(matches!(err, QuarryError::NoDatabaseSelected));

        let err = analyze(&mut session, vec![TableName::qualified("test", "zzz")]).unwrap_err();
        assert_eq!(err.to_string(), "Table 'test.zzz' doesn't exist");
        assert_eq!(session.scan_closes(), 0);
    }

    #[test]
    fn test_killed_session_cancels() {
        let mut session = MockSession::new();
        session.fill_t1(10);
        session
            .vars
            .kill_flag()
            .store(true, std::sync::atomic::Ordering::Relaxed);
        let err = analyze(&mut session, vec![TableName::qualified("test", "t1")]).unwrap_err();
        assert!(matches!(err, QuarryError::Cancelled));
        assert_eq!(session.scan_closes(), 1);
    }

    #[test]
    fn test_requires_restricted_executor() {
        let mut session = MockSession::new();
        session.restricted = false;
        let err = analyze(&mut session, vec![TableName::qualified("test", "t1")]).unwrap_err();
        assert!(matches!(err, QuarryError::RestrictedSqlUnsupported));
    }
}
