//! Migrate a shared-schema database to one schema per company.
//!
//! # Usage
//!
//! ```bash
//! migrate-to-db-partition lportal root secret
//! ```
//!
//! Every company except the one with the lowest id is moved into
//! `lpartition_<companyId>`. Failures are logged per company; the process
//! exits normally once every company has been attempted.

// CLI tools are expected to print to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod logging;

use std::ffi::OsString;

use anyhow::Result;
use clap::Parser;
use db_partition::mysql::MySqlConnector;
use db_partition::{MigrationConfig, Migrator, Password};

/// Moves every non-default company of a shared schema into its own schema.
#[derive(Parser, Debug)]
#[command(name = "migrate-to-db-partition")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Name of the shared (default) schema
    #[arg(value_name = "SCHEMA", allow_hyphen_values = true)]
    schema: String,

    /// Database user
    #[arg(value_name = "USER", allow_hyphen_values = true)]
    user: String,

    /// Database password
    #[arg(value_name = "PASSWORD", allow_hyphen_values = true)]
    password: Password,
}

/// Parse the command line. A usage problem prints clap's message and yields
/// `None`, so the process still exits normally.
fn parse_args<I, T>(args: I) -> Result<Option<Cli>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => {
            err.print()?;
            Ok(None)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    logging::init();

    let Some(cli) = parse_args(std::env::args_os())? else {
        return Ok(());
    };

    let config = MigrationConfig::from_args(&cli.schema, &cli.user, cli.password)?;
    let connector = MySqlConnector::new(&config);
    let migrator = Migrator::new(&connector, &config)?;

    // Per-company failures and the final counts are logged by the migrator.
    migrator.run().await?;
    Ok(())
}
