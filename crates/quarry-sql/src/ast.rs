//! Statement syntax tree.
//!
//! Simple statements arrive already parsed. Each variant carries exactly
//! the fields its executor needs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Datum;

/// A simple (non-relational) statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// USE db.
    Use(UseStmt),
    /// FLUSH TABLE.
    FlushTable(FlushTableStmt),
    /// DO expr, ...
    Do(DoStmt),
    /// BEGIN / START TRANSACTION.
    Begin,
    /// COMMIT.
    Commit,
    /// ROLLBACK.
    Rollback,
    /// CREATE USER.
    CreateUser(CreateUserStmt),
    /// DROP USER.
    DropUser(DropUserStmt),
    /// SET PASSWORD.
    SetPassword(SetPasswordStmt),
    /// ANALYZE TABLE.
    AnalyzeTable(AnalyzeTableStmt),
    /// BINLOG 'base64'.
    Binlog(BinlogStmt),
}

impl Statement {
    /// Statement keyword, used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Statement::Use(_) => "USE",
            Statement::FlushTable(_) => "FLUSH TABLE",
            Statement::Do(_) => "DO",
            Statement::Begin => "BEGIN",
            Statement::Commit => "COMMIT",
            Statement::Rollback => "ROLLBACK",
            Statement::CreateUser(_) => "CREATE USER",
            Statement::DropUser(_) => "DROP USER",
            Statement::SetPassword(_) => "SET PASSWORD",
            Statement::AnalyzeTable(_) => "ANALYZE TABLE",
            Statement::Binlog(_) => "BINLOG",
        }
    }

    /// Returns true for statements that end or start a transaction.
    pub fn is_transaction_control(&self) -> bool {
        matches!(
            self,
            Statement::Begin | Statement::Commit | Statement::Rollback
        )
    }
}

/// A possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    /// Optional schema name.
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
}

impl TableName {
    /// Creates an unqualified table name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Creates a schema-qualified table name.
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// USE statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseStmt {
    /// Database to select.
    pub db_name: String,
}

/// FLUSH TABLE statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushTableStmt {
    /// Tables named by the statement; empty means all.
    pub tables: Vec<TableName>,
}

/// DO statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoStmt {
    /// Expressions evaluated for their side effects.
    pub exprs: Vec<Expr>,
}

/// How a new account's password is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthOption {
    /// `IDENTIFIED BY 'plaintext'`.
    ByAuthString(String),
    /// `IDENTIFIED BY PASSWORD 'hash'`, stored as given.
    ByHash(String),
}

/// One account in a CREATE USER statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    /// Account in `name@host` form.
    pub user: String,
    /// Password, if any.
    pub auth: Option<AuthOption>,
}

/// CREATE USER statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserStmt {
    /// Skip existing accounts instead of failing.
    pub if_not_exists: bool,
    /// Accounts to create.
    pub specs: Vec<UserSpec>,
}

/// DROP USER statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropUserStmt {
    /// Ignore missing accounts.
    pub if_exists: bool,
    /// Accounts in `name@host` form.
    pub users: Vec<String>,
}

/// SET PASSWORD statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPasswordStmt {
    /// Target account; `None` means the current user.
    pub user: Option<String>,
    /// New plaintext password.
    pub password: String,
}

/// ANALYZE TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeTableStmt {
    /// Tables to analyze, in order.
    pub tables: Vec<TableName>,
}

/// BINLOG statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinlogStmt {
    /// Base64 event payload.
    pub payload: String,
}

/// A scalar expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Constant value.
    Literal(Datum),
    /// `@@name` session variable.
    SystemVariable(String),
    /// Unary operation.
    Unary {
        /// The operator.
        op: UnaryOperator,
        /// The operand.
        expr: Box<Expr>,
    },
    /// Binary operation.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// The operator.
        op: BinaryOperator,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Scalar function call.
    Function {
        /// Function name, case-insensitive.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Creates a literal expression.
    pub fn lit(value: impl Into<Datum>) -> Self {
        Expr::Literal(value.into())
    }

    /// Creates a binary expression.
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Creates a function call.
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Comparison
    /// Equal.
    Eq,
    /// Not equal.
    NotEq,
    /// Less than.
    Lt,
    /// Less than or equal.
    LtEq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    GtEq,

    // Arithmetic
    /// Addition.
    Plus,
    /// Subtraction.
    Minus,
    /// Multiplication.
    Multiply,
    /// Division.
    Divide,
    /// Modulo.
    Modulo,

    // Logical
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Arithmetic negation.
    Minus,
    /// Logical NOT.
    Not,
}
