//! Statement execution results.

use std::fmt;

use quarry_sql::ast::Statement;

/// Outcome of a successfully executed statement.
///
/// Simple statements return no rows, so a result only says what ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementResult {
    /// Transaction control (BEGIN, COMMIT, ROLLBACK).
    Transaction {
        /// The statement keyword.
        command: String,
    },
    /// ANALYZE TABLE.
    Analyze {
        /// Number of tables analyzed.
        tables: usize,
    },
    /// Statement accepted but not acted on (BINLOG).
    Ignored {
        /// The statement keyword.
        command: String,
    },
    /// Any other statement.
    Ok {
        /// The statement keyword.
        command: String,
    },
}

impl StatementResult {
    /// Builds the result for a statement that completed.
    pub fn for_statement(stmt: &Statement) -> Self {
        let command = stmt.name().to_string();
        match stmt {
            Statement::Begin | Statement::Commit | Statement::Rollback => {
                StatementResult::Transaction { command }
            }
            Statement::AnalyzeTable(s) => StatementResult::Analyze {
                tables: s.tables.len(),
            },
            Statement::Binlog(_) => StatementResult::Ignored { command },
            _ => StatementResult::Ok { command },
        }
    }

    /// The statement keyword.
    pub fn command(&self) -> &str {
        match self {
            StatementResult::Transaction { command }
            | StatementResult::Ignored { command }
            | StatementResult::Ok { command } => command,
            StatementResult::Analyze { .. } => "ANALYZE TABLE",
        }
    }
}

impl fmt::Display for StatementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementResult::Analyze { tables } => write!(f, "ANALYZE TABLE {}", tables),
            other => write!(f, "{}", other.command()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_sql::ast::{AnalyzeTableStmt, BinlogStmt, TableName, UseStmt};

    #[test]
    fn test_result_kinds() {
        assert_eq!(
            StatementResult::for_statement(&Statement::Commit),
            StatementResult::Transaction {
                command: "COMMIT".into()
            }
        );

        let analyze = StatementResult::for_statement(&Statement::AnalyzeTable(AnalyzeTableStmt {
            tables: vec![TableName::new("a"), TableName::new("b")],
        }));
        assert_eq!(analyze.to_string(), "ANALYZE TABLE 2");
        assert_eq!(analyze.command(), "ANALYZE TABLE");

        let binlog = StatementResult::for_statement(&Statement::Binlog(BinlogStmt {
            payload: String::new(),
        }));
        assert!(matches!(binlog, StatementResult::Ignored { .. }));

        let use_db = StatementResult::for_statement(&Statement::Use(UseStmt {
            db_name: "x".into(),
        }));
        assert_eq!(use_db.to_string(), "USE");
    }
}
