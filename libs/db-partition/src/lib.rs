#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Shared-schema to partitioned-schema migration engine.
//!
//! A shared-schema installation keeps every company's rows in one set of
//! tables, discriminated by a `companyId` column. This crate relocates each
//! non-default company into its own schema (`lpartition_<companyId>`):
//!
//! - tables without a `companyId` column, the explicit override set
//!   (`Company`, `VirtualHost`) and scheduler tables (`QUARTZ_*`) are
//!   *control* tables and become pass-through views in the target schema;
//! - every other table is a *tenant* table: it is copied structurally into the
//!   target schema and the company's rows are moved over.
//!
//! The company with the lowest id is the default tenant and stays in place.
//!
//! # Features
//! - `mysql` (default): `SQLx` `MySQL` backend
//! - `integration`: enables the `testcontainers` suites under `tests/`
//!
//! # Example
//! ```rust,no_run
//! use db_partition::{MigrationConfig, Migrator, mysql::MySqlConnector};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = MigrationConfig::from_args("lportal", "root", "secret")?;
//! let connector = MySqlConnector::new(&config);
//! let report = Migrator::new(&connector, &config)?.run().await?;
//! println!("{} companies migrated", report.succeeded().count());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(
    not(feature = "mysql"),
    allow(unused_imports, unused_variables, dead_code)
)]

// Core modules
pub mod classifier;
pub mod company;
pub mod config;
pub mod conn;
pub mod error;
pub mod orchestrator;
pub mod password;
pub mod provisioner;
pub mod relocator;
pub mod sql;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(test)]
mod testing;

pub use classifier::{ClassificationPolicy, NameRule, TableClass};
pub use company::{CompanyId, SchemaName};
pub use config::{ConfigError, MigrationConfig, MigrationSettings};
pub use conn::{Connector, PartitionConnection};
pub use error::{CompanyError, RunError};
pub use orchestrator::{CompanyOutcome, MigrationReport, Migrator};
pub use password::Password;
pub use provisioner::{ProvisionReport, SchemaProvisioner, TableRelocation};
pub use relocator::{
    InsertThenDelete, RelocationStrategy, RelocationTarget, RowsMoved, TransactionalRelocation,
};
pub use sql::Statement;

use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for backend round-trips.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
