//! Statements issued by the migration engine, rendered as `MySQL` SQL.
//!
//! Every statement the engine runs is a [`Statement`] value, so backends can
//! either render it ([`Statement::to_sql`]) or interpret it directly. Row
//! relocation statements always carry their company filter; an unfiltered
//! copy or delete cannot be expressed.

use std::fmt;

use crate::company::{CompanyId, SchemaName};

/// Query returning every company except the default (minimum id) one.
pub const NON_DEFAULT_COMPANY_IDS: &str =
    "select companyId from Company where companyId > (select min(companyId) from Company)";

/// Base tables of the connection's current schema.
pub const BASE_TABLES: &str = "select cast(table_name as char) from information_schema.tables \
     where table_schema = database() and table_type = 'BASE TABLE' order by table_name";

/// Columns of one table matching a name (collation-insensitive; callers
/// compare the returned names exactly).
pub const COLUMN_LOOKUP: &str = "select cast(column_name as char) from information_schema.columns \
     where table_schema = database() and table_name = ? and column_name = ?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateSchema {
        schema: SchemaName,
        charset: String,
    },
    /// `create or replace view`: pass-through view over a control table.
    CreateView {
        target: SchemaName,
        source: SchemaName,
        table: String,
    },
    /// `create table if not exists ... like`: structure only, no rows.
    CreateTableLike {
        target: SchemaName,
        source: SchemaName,
        table: String,
    },
    CopyCompanyRows {
        target: SchemaName,
        source: SchemaName,
        table: String,
        column: String,
        company: CompanyId,
    },
    DeleteCompanyRows {
        source: SchemaName,
        table: String,
        column: String,
        company: CompanyId,
    },
    Begin,
    Commit,
    Rollback,
}

impl Statement {
    /// Render the statement as `MySQL` SQL. Identifiers are backtick-quoted.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::CreateSchema { schema, charset } => {
                format!("create schema {} character set {charset}", quote(schema))
            }
            Self::CreateView {
                target,
                source,
                table,
            } => format!(
                "create or replace view {} as select * from {}",
                qualified(target, table),
                qualified(source, table)
            ),
            Self::CreateTableLike {
                target,
                source,
                table,
            } => format!(
                "create table if not exists {} like {}",
                qualified(target, table),
                qualified(source, table)
            ),
            Self::CopyCompanyRows {
                target,
                source,
                table,
                column,
                company,
            } => format!(
                "insert into {} select * from {} where {} = {company}",
                qualified(target, table),
                qualified(source, table),
                quote(column)
            ),
            Self::DeleteCompanyRows {
                source,
                table,
                column,
                company,
            } => format!(
                "delete from {} where {} = {company}",
                qualified(source, table),
                quote(column)
            ),
            Self::Begin => "start transaction".to_owned(),
            Self::Commit => "commit".to_owned(),
            Self::Rollback => "rollback".to_owned(),
        }
    }

    /// Table the statement touches, if any.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::CreateView { table, .. }
            | Self::CreateTableLike { table, .. }
            | Self::CopyCompanyRows { table, .. }
            | Self::DeleteCompanyRows { table, .. } => Some(table),
            Self::CreateSchema { .. } | Self::Begin | Self::Commit | Self::Rollback => None,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Backtick-quote a `MySQL` identifier, doubling embedded backticks.
#[must_use]
pub fn quote(ident: impl AsRef<str>) -> String {
    format!("`{}`", ident.as_ref().replace('`', "``"))
}

fn qualified(schema: &SchemaName, table: &str) -> String {
    format!("{}.{}", quote(schema), quote(table))
}
