//! Account management statements.

use quarry_common::error::{QuarryError, QuarryResult};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::simple::SimpleExec;
use crate::ast::{AuthOption, CreateUserStmt, DropUserStmt, SetPasswordStmt};
use crate::context::{RestrictedQuery, SessionContext, UserRecord};
use crate::value::hex;

/// Splits `name@host` into its parts.
pub fn parse_user(spec: &str) -> QuarryResult<(String, String)> {
    spec.split_once('@')
        .map(|(user, host)| (user.to_string(), host.to_string()))
        .ok_or_else(|| QuarryError::InvalidUser {
            spec: spec.to_string(),
        })
}

/// Encodes a plaintext password for storage.
///
/// The result is `*` followed by the upper-case hex of a double SHA-256.
/// An empty password stays empty.
pub fn encode_password(password: &str) -> String {
    if password.is_empty() {
        return String::new();
    }
    let stage1 = Sha256::digest(password.as_bytes());
    let stage2 = Sha256::digest(stage1);
    format!("*{}", hex::encode_upper(&stage2))
}

impl<C: SessionContext + ?Sized> SimpleExec<'_, C> {
    fn user_exists(&mut self, user: &str, host: &str) -> QuarryResult<bool> {
        let mut rs = self
            .exec_restricted(RestrictedQuery::LookupUser {
                user: user.to_string(),
                host: host.to_string(),
            })?
            .into_rows()?;
        let row = rs.next();
        let closed = rs.close();
        let found = row?.is_some();
        closed?;
        Ok(found)
    }

    pub(super) fn execute_create_user(&mut self, stmt: &CreateUserStmt) -> QuarryResult<()> {
        self.ensure_restricted()?;

        let mut records = Vec::with_capacity(stmt.specs.len());
        for spec in &stmt.specs {
            let (user, host) = parse_user(&spec.user)?;
            if self.user_exists(&user, &host)? {
                if !stmt.if_not_exists {
                    return Err(QuarryError::DuplicateUser {
                        user: spec.user.clone(),
                    });
                }
                continue;
            }
            let password = match &spec.auth {
                Some(AuthOption::ByAuthString(plain)) => encode_password(plain),
                Some(AuthOption::ByHash(hash)) => hash.clone(),
                None => String::new(),
            };
            records.push(UserRecord {
                user,
                host,
                password,
            });
        }

        if records.is_empty() {
            return Ok(());
        }
        self.exec_restricted(RestrictedQuery::InsertUsers(records))?
            .into_affected()?;
        Ok(())
    }

    pub(super) fn execute_drop_user(&mut self, stmt: &DropUserStmt) -> QuarryResult<()> {
        self.ensure_restricted()?;

        let mut failed = Vec::new();
        for spec in &stmt.users {
            let (user, host) = parse_user(spec)?;
            if !self.user_exists(&user, &host)? {
                if !stmt.if_exists {
                    failed.push(spec.as_str());
                }
                continue;
            }
            let deleted = self
                .exec_restricted(RestrictedQuery::DeleteUser { user, host })
                .and_then(|out| out.into_affected());
            if let Err(err) = deleted {
                warn!(user = %spec, error = %err, "failed to drop user");
                failed.push(spec.as_str());
            }
        }

        self.ctx.commit_txn()?;
        if !failed.is_empty() {
            return Err(QuarryError::CannotUser {
                operation: "DROP USER".to_string(),
                users: failed.join(","),
            });
        }
        Ok(())
    }

    pub(super) fn execute_set_password(&mut self, stmt: &SetPasswordStmt) -> QuarryResult<()> {
        self.ensure_restricted()?;

        let (user, host) = match &stmt.user {
            Some(spec) => parse_user(spec)?,
            None => {
                let current = self.ctx.session_vars().current_user.clone().ok_or_else(|| {
                    QuarryError::invalid_argument("SET PASSWORD without a user requires a logged-in session")
                })?;
                (current.user, current.host)
            }
        };
        self.exec_restricted(RestrictedQuery::UpdatePassword {
            user,
            host,
            password: encode_password(&stmt.password),
        })?
        .into_affected()?;
        Ok(())
    }
}
