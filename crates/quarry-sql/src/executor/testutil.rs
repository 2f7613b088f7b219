//! In-memory session used by executor tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use quarry_common::error::{QuarryError, QuarryResult};
use quarry_common::types::{ConnectionId, DatabaseId, TableId};
use quarry_txn::{Transaction, TransactionManager, TxnHandle};

use crate::context::{
    MemRecordSet, RecordSet, RestrictedOutput, RestrictedQuery, RestrictedSqlExecutor,
    SessionContext, SessionVars,
};
use crate::infoschema::{ColumnInfo, DataType, DatabaseInfo, InfoSchema, TableInfo};
use crate::row::Row;
use crate::value::Datum;

pub(crate) struct MockSession {
    pub vars: SessionVars,
    pub schema: Arc<InfoSchema>,
    pub tm: Arc<TransactionManager>,
    pub txn: Option<TxnHandle>,
    pub rows: HashMap<String, Vec<Row>>,
    pub fail_scan: HashMap<String, usize>,
    pub users: BTreeMap<(String, String), String>,
    pub fail_delete: HashSet<String>,
    pub queries: Vec<RestrictedQuery>,
    pub restricted: bool,
    pub fail_commit: bool,
    pub txn_begins: usize,
    pub commits: usize,
    closes: Arc<AtomicUsize>,
}

impl MockSession {
    pub fn new() -> Self {
        let mut schema = InfoSchema::new();
        schema
            .add_database(DatabaseInfo::new(DatabaseId::new(1), "test", "latin1", "latin1_bin"))
            .unwrap();
        let tables = [
            (1, "t1", vec![("a", DataType::BigInt), ("b", DataType::Varchar)]),
            (2, "t2", vec![("a", DataType::BigInt)]),
            (3, "empty", vec![("a", DataType::BigInt)]),
        ];
        for (id, name, cols) in tables {
            let columns = cols
                .into_iter()
                .map(|(n, t)| ColumnInfo::new(n, t))
                .collect();
            schema
                .add_table("test", TableInfo::new(TableId::new(id), name, columns))
                .unwrap();
        }

        let mut rows = HashMap::new();
        rows.insert(
            "t2".to_string(),
            (0..10).map(|i| Row::new(vec![Datum::Int(i)])).collect(),
        );

        Self {
            vars: SessionVars::new(ConnectionId::new(1)),
            schema: Arc::new(schema),
            tm: Arc::new(TransactionManager::in_memory()),
            txn: None,
            rows,
            fail_scan: HashMap::new(),
            users: BTreeMap::new(),
            fail_delete: HashSet::new(),
            queries: Vec::new(),
            restricted: true,
            fail_commit: false,
            txn_begins: 0,
            commits: 0,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn use_db(&mut self, name: &str) {
        self.vars.current_db = name.to_string();
    }

    /// Fills `t1` with `(i, "v{i}")` for `i` in `0..n`.
    pub fn fill_t1(&mut self, n: i64) {
        let rows = (0..n)
            .map(|i| Row::new(vec![Datum::Int(i), Datum::string(format!("v{}", i))]))
            .collect();
        self.rows.insert("t1".to_string(), rows);
    }

    pub fn fail_scan_after(&mut self, table: &str, rows: usize) {
        self.fail_scan.insert(table.to_string(), rows);
    }

    pub fn add_user(&mut self, user: &str, host: &str, password: &str) {
        self.users
            .insert((user.to_string(), host.to_string()), password.to_string());
    }

    pub fn password(&self, user: &str, host: &str) -> Option<String> {
        self.users
            .get(&(user.to_string(), host.to_string()))
            .cloned()
    }

    pub fn begin(&mut self) {
        self.txn(true).unwrap();
    }

    pub fn commit(&mut self) {
        self.commit_txn().unwrap();
    }

    pub fn scan_closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn user_rows(&self, user: &str, host: &str) -> Vec<Row> {
        self.password(user, host)
            .map(|pw| vec![Row::new(vec![Datum::string(host), Datum::string(user), Datum::string(pw)])])
            .unwrap_or_default()
    }
}

struct MockScan {
    table: String,
    rows: std::vec::IntoIter<Row>,
    fail_after: Option<usize>,
    read: usize,
    closes: Arc<AtomicUsize>,
}

impl RecordSet for MockScan {
    fn fields(&self) -> &[ColumnInfo] {
        &[]
    }

    fn next(&mut self) -> QuarryResult<Option<Row>> {
        if self.fail_after == Some(self.read) {
            return Err(QuarryError::scan(format!("injected failure on {}", self.table)));
        }
        self.read += 1;
        Ok(self.rows.next())
    }

    fn close(&mut self) -> QuarryResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl SessionContext for MockSession {
    fn session_vars(&self) -> &SessionVars {
        &self.vars
    }

    fn session_vars_mut(&mut self) -> &mut SessionVars {
        &mut self.vars
    }

    fn info_schema(&self) -> Arc<InfoSchema> {
        Arc::clone(&self.schema)
    }

    fn txn(&mut self, force_new: bool) -> QuarryResult<Arc<dyn Transaction>> {
        if force_new && self.txn.is_some() {
            self.commit_txn()?;
        }
        if self.txn.is_none() {
            self.txn = Some(TxnHandle::begin(Arc::clone(&self.tm))?);
            self.txn_begins += 1;
        }
        match &self.txn {
            Some(txn) => Ok(Arc::new(txn.clone())),
            None => Err(QuarryError::NoActiveTransaction),
        }
    }

    fn commit_txn(&mut self) -> QuarryResult<()> {
        let Some(txn) = self.txn.take() else {
            return Ok(());
        };
        if self.fail_commit {
            txn.rollback()?;
            return Err(QuarryError::Transaction {
                message: "injected commit failure".to_string(),
            });
        }
        txn.commit()?;
        self.commits += 1;
        Ok(())
    }

    fn rollback_txn(&mut self) -> QuarryResult<()> {
        match self.txn.take() {
            Some(txn) => txn.rollback(),
            None => Ok(()),
        }
    }

    fn restricted_executor(&mut self) -> Option<&mut dyn RestrictedSqlExecutor> {
        if self.restricted {
            Some(self)
        } else {
            None
        }
    }
}

impl RestrictedSqlExecutor for MockSession {
    fn exec_restricted(&mut self, query: RestrictedQuery) -> QuarryResult<RestrictedOutput> {
        self.queries.push(query.clone());
        match query {
            RestrictedQuery::ScanTable(name) => {
                self.txn(false)?;
                let table = name.name.to_lowercase();
                let rows = self.rows.get(&table).cloned().unwrap_or_default();
                Ok(RestrictedOutput::Rows(Box::new(MockScan {
                    fail_after: self.fail_scan.get(&table).copied(),
                    table,
                    rows: rows.into_iter(),
                    read: 0,
                    closes: Arc::clone(&self.closes),
                })))
            }
            RestrictedQuery::LookupUser { user, host } => Ok(RestrictedOutput::Rows(Box::new(
                MemRecordSet::new(vec![], self.user_rows(&user, &host)),
            ))),
            RestrictedQuery::InsertUsers(records) => {
                let n = records.len() as u64;
                for r in records {
                    self.users.insert((r.user, r.host), r.password);
                }
                Ok(RestrictedOutput::Affected(n))
            }
            RestrictedQuery::DeleteUser { user, host } => {
                if self.fail_delete.contains(&user) {
                    return Err(QuarryError::storage("injected delete failure"));
                }
                let removed = self.users.remove(&(user, host)).is_some();
                Ok(RestrictedOutput::Affected(u64::from(removed)))
            }
            RestrictedQuery::UpdatePassword {
                user,
                host,
                password,
            } => match self.users.get_mut(&(user, host)) {
                Some(pw) => {
                    *pw = password;
                    Ok(RestrictedOutput::Affected(1))
                }
                None => Ok(RestrictedOutput::Affected(0)),
            },
        }
    }
}
