//! Backend seam: how the engine opens connections and talks to the database.
//!
//! The engine only needs four round-trips: the company lookup, base-table
//! enumeration, a single-column metadata probe, and statement execution.
//! Connections are scoped: every connection handed out by [`Connector::connect`]
//! goes back through [`Connector::release`] on every exit path.

use async_trait::async_trait;

use crate::Result;
use crate::company::CompanyId;
use crate::sql::Statement;

/// One open connection, positioned on the default (source) schema.
#[async_trait]
pub trait PartitionConnection: Send {
    /// Ids of every company except the one with the minimum id, in database order.
    async fn non_default_company_ids(&mut self) -> Result<Vec<CompanyId>>;

    /// Names of all base tables (not views) of the current schema.
    async fn base_tables(&mut self) -> Result<Vec<String>>;

    /// Whether `table` has a column named exactly `column` (case-sensitive).
    async fn has_column(&mut self, table: &str, column: &str) -> Result<bool>;

    /// Execute one statement, returning the number of affected rows.
    async fn execute(&mut self, statement: &Statement) -> Result<u64>;
}

/// Source of scoped connections.
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: PartitionConnection + 'static;

    async fn connect(&self) -> Result<Self::Conn>;

    /// Close a connection. Dropping also closes it; this makes it explicit
    /// and surfaces close errors.
    async fn release(&self, conn: Self::Conn) -> Result<()> {
        drop(conn);
        Ok(())
    }
}
