//! `MySQL` backend over `SQLx`.
//!
//! Connection options are typed (`MySqlConnectOptions`); credentials are never
//! interpolated into a DSN string. DDL, relocation and transaction-control
//! statements are sent as plain text queries (`COM_QUERY`); the prepared
//! protocol rejects `start transaction` and `rollback`. Metadata probes bind
//! their parameters.

use std::fmt;

use async_trait::async_trait;
use sqlx::{Connection, Executor};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use tracing::debug;

use crate::Result;
use crate::company::CompanyId;
use crate::config::MigrationConfig;
use crate::conn::{Connector, PartitionConnection};
use crate::sql::{self, Statement};

/// Opens one `MySqlConnection` per unit of work, on the default schema.
#[derive(Clone)]
pub struct MySqlConnector {
    options: MySqlConnectOptions,
}

impl fmt::Debug for MySqlConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mysql://<redacted>@{}:{}/{}",
            self.options.get_host(),
            self.options.get_port(),
            self.options.get_database().unwrap_or("")
        )
    }
}

impl MySqlConnector {
    #[must_use]
    pub fn new(config: &MigrationConfig) -> Self {
        let s = &config.settings;
        let options = MySqlConnectOptions::new()
            .host(&s.host)
            .port(s.port)
            .username(&s.username)
            .password(config.password.expose())
            .database(&s.default_schema)
            .charset("utf8mb4")
            .timezone(Some(String::from("+00:00")));
        Self { options }
    }

    #[must_use]
    pub fn from_options(options: MySqlConnectOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    type Conn = MySqlPartitionConnection;

    async fn connect(&self) -> Result<MySqlPartitionConnection> {
        let conn = MySqlConnection::connect_with(&self.options).await?;
        debug!(
            host = self.options.get_host(),
            database = self.options.get_database(),
            "Opened connection"
        );
        Ok(MySqlPartitionConnection { conn })
    }

    async fn release(&self, conn: MySqlPartitionConnection) -> Result<()> {
        conn.conn.close().await?;
        Ok(())
    }
}

pub struct MySqlPartitionConnection {
    conn: MySqlConnection,
}

#[async_trait]
impl PartitionConnection for MySqlPartitionConnection {
    async fn non_default_company_ids(&mut self) -> Result<Vec<CompanyId>> {
        let ids: Vec<i64> = sqlx::query_scalar(sql::NON_DEFAULT_COMPANY_IDS)
            .fetch_all(&mut self.conn)
            .await?;
        Ok(ids.into_iter().map(CompanyId::new).collect())
    }

    async fn base_tables(&mut self) -> Result<Vec<String>> {
        let tables: Vec<String> = sqlx::query_scalar(sql::BASE_TABLES)
            .fetch_all(&mut self.conn)
            .await?;
        Ok(tables)
    }

    async fn has_column(&mut self, table: &str, column: &str) -> Result<bool> {
        let names: Vec<String> = sqlx::query_scalar(sql::COLUMN_LOOKUP)
            .bind(table)
            .bind(column)
            .fetch_all(&mut self.conn)
            .await?;
        // information_schema compares case-insensitively; the match must be exact.
        Ok(names.iter().any(|name| name == column))
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        let sql = statement.to_sql();
        // A bare `&str` carries no arguments, so sqlx sends it unprepared.
        let result = (&mut self.conn).execute(sql.as_str()).await?;
        Ok(result.rows_affected())
    }
}
