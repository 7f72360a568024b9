//! Run-level and company-level errors.
//!
//! [`RunError`] aborts the whole run. [`CompanyError`] is recorded for one
//! company while the run moves on to the next one.

use thiserror::Error;

use crate::DbError;
use crate::company::SchemaName;

/// Fatal errors: the run cannot proceed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to open connection for company enumeration: {source}")]
    Connect { source: DbError },

    #[error("failed to list companies to migrate: {source}")]
    ListCompanies { source: DbError },
}

/// Per-company errors. The company may be left partially migrated.
#[derive(Debug, Error)]
pub enum CompanyError {
    #[error("failed to open connection: {source}")]
    Connect { source: DbError },

    #[error("failed to create schema '{schema}': {source}")]
    CreateSchema { schema: SchemaName, source: DbError },

    #[error("failed to list tables of the source schema: {source}")]
    ListTables { source: DbError },

    #[error("failed to classify table '{table}': {source}")]
    Classify { table: String, source: DbError },

    #[error("failed to create view '{table}': {source}")]
    CreateView { table: String, source: DbError },

    #[error("failed to create table '{table}': {source}")]
    CreateTable { table: String, source: DbError },

    #[error("failed to relocate rows of table '{table}': {source}")]
    Relocate { table: String, source: DbError },
}

impl CompanyError {
    /// Table being processed when the error happened, if any.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Classify { table, .. }
            | Self::CreateView { table, .. }
            | Self::CreateTable { table, .. }
            | Self::Relocate { table, .. } => Some(table),
            Self::Connect { .. } | Self::CreateSchema { .. } | Self::ListTables { .. } => None,
        }
    }
}
