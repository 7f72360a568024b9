//! Row relocation strategies.
//!
//! A strategy moves the rows a company owns in one tenant table from the
//! source schema into the (already created) table of the company schema, and
//! removes them from the source.
//!
//! [`InsertThenDelete`] is the default and issues two independent statements.
//! If the process dies between them the rows exist in both schemas: they are
//! duplicated, never lost. Re-running such a company needs manual cleanup
//! first. [`TransactionalRelocation`] closes that window by wrapping both
//! statements in one transaction.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::Result;
use crate::company::{CompanyId, SchemaName};
use crate::conn::PartitionConnection;
use crate::sql::Statement;

/// One (company, table) relocation.
#[derive(Debug, Clone, Copy)]
pub struct RelocationTarget<'a> {
    pub company: CompanyId,
    pub source: &'a SchemaName,
    pub target: &'a SchemaName,
    pub table: &'a str,
    /// Ownership column, `companyId` by default.
    pub column: &'a str,
}

impl RelocationTarget<'_> {
    #[must_use]
    pub fn copy_statement(&self) -> Statement {
        Statement::CopyCompanyRows {
            target: self.target.clone(),
            source: self.source.clone(),
            table: self.table.to_owned(),
            column: self.column.to_owned(),
            company: self.company,
        }
    }

    #[must_use]
    pub fn delete_statement(&self) -> Statement {
        Statement::DeleteCompanyRows {
            source: self.source.clone(),
            table: self.table.to_owned(),
            column: self.column.to_owned(),
            company: self.company,
        }
    }
}

/// Affected-row counts of one relocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowsMoved {
    pub copied: u64,
    pub deleted: u64,
}

#[async_trait]
pub trait RelocationStrategy: Send + Sync {
    /// Move the company's rows of one table.
    ///
    /// # Errors
    /// Returns the first failing statement's error.
    async fn relocate(
        &self,
        conn: &mut dyn PartitionConnection,
        target: &RelocationTarget<'_>,
    ) -> Result<RowsMoved>;
}

/// Copy, then delete, with no enclosing transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertThenDelete;

#[async_trait]
impl RelocationStrategy for InsertThenDelete {
    async fn relocate(
        &self,
        conn: &mut dyn PartitionConnection,
        target: &RelocationTarget<'_>,
    ) -> Result<RowsMoved> {
        copy_then_delete(conn, target).await
    }
}

/// Copy and delete inside one transaction; rolled back on failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionalRelocation;

#[async_trait]
impl RelocationStrategy for TransactionalRelocation {
    async fn relocate(
        &self,
        conn: &mut dyn PartitionConnection,
        target: &RelocationTarget<'_>,
    ) -> Result<RowsMoved> {
        conn.execute(&Statement::Begin).await?;
        match copy_then_delete(conn, target).await {
            Ok(rows) => {
                conn.execute(&Statement::Commit).await?;
                Ok(rows)
            }
            Err(err) => {
                // Best-effort rollback; keep the original error.
                if let Err(rollback) = conn.execute(&Statement::Rollback).await {
                    warn!(
                        table = target.table,
                        company = %target.company,
                        error = %rollback,
                        "Rollback after failed relocation also failed"
                    );
                }
                Err(err)
            }
        }
    }
}

async fn copy_then_delete(
    conn: &mut dyn PartitionConnection,
    target: &RelocationTarget<'_>,
) -> Result<RowsMoved> {
    let copy = target.copy_statement();
    debug!(sql = %copy, "Copying company rows");
    let copied = conn.execute(&copy).await?;

    let delete = target.delete_statement();
    debug!(sql = %delete, "Deleting relocated rows from source");
    let deleted = conn.execute(&delete).await?;

    if copied != deleted {
        warn!(
            table = target.table,
            company = %target.company,
            copied,
            deleted,
            "Copied and deleted row counts differ"
        );
    }
    Ok(RowsMoved { copied, deleted })
}
