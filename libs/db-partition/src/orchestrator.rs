//! Migration run: enumerate companies, provision each one, keep going on failure.
//!
//! The company list is computed once up front. Each company gets its own
//! connection, released whether provisioning succeeds or not. A failing
//! company is logged and recorded in the [`MigrationReport`]; only failing to
//! enumerate the companies aborts the run.

use tracing::{error, info, warn};

use crate::classifier::ClassificationPolicy;
use crate::company::{CompanyId, SchemaName};
use crate::config::{ConfigError, MigrationConfig};
use crate::conn::{Connector, PartitionConnection};
use crate::error::{CompanyError, RunError};
use crate::provisioner::{ProvisionReport, SchemaProvisioner};
use crate::relocator::InsertThenDelete;

#[derive(Debug)]
pub struct CompanyOutcome {
    pub company: CompanyId,
    pub schema: SchemaName,
    pub result: Result<ProvisionReport, CompanyError>,
}

impl CompanyOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// One outcome per migration target, in processing order.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub outcomes: Vec<CompanyOutcome>,
}

impl MigrationReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &CompanyOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &CompanyOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(CompanyOutcome::is_success)
    }
}

pub struct Migrator<'a, C: Connector> {
    connector: &'a C,
    provisioner: SchemaProvisioner,
}

impl<'a, C: Connector> Migrator<'a, C> {
    /// Migrator with the configured classification policy and the default
    /// [`InsertThenDelete`] relocation.
    ///
    /// # Errors
    /// Returns `ConfigError` if the classification settings are invalid.
    pub fn new(connector: &'a C, config: &MigrationConfig) -> Result<Self, ConfigError> {
        let policy = ClassificationPolicy::from_settings(&config.settings)?;
        Ok(Self::with_provisioner(
            connector,
            SchemaProvisioner::new(config, policy, Box::new(InsertThenDelete)),
        ))
    }

    pub fn with_provisioner(connector: &'a C, provisioner: SchemaProvisioner) -> Self {
        Self {
            connector,
            provisioner,
        }
    }

    #[must_use]
    pub fn provisioner(&self) -> &SchemaProvisioner {
        &self.provisioner
    }

    /// Every company except the minimum-id (default) one.
    ///
    /// # Errors
    /// Returns `RunError` if the connection cannot be opened or the query fails.
    pub async fn companies_to_migrate(&self) -> Result<Vec<CompanyId>, RunError> {
        let mut conn = self
            .connector
            .connect()
            .await
            .map_err(|source| RunError::Connect { source })?;
        let ids = conn.non_default_company_ids().await;
        self.release(conn).await;
        ids.map_err(|source| RunError::ListCompanies { source })
    }

    /// Provision one company on a connection scoped to this call.
    ///
    /// # Errors
    /// Returns `CompanyError` for a failed connect or any provisioning step.
    pub async fn migrate_company(
        &self,
        company: CompanyId,
    ) -> Result<ProvisionReport, CompanyError> {
        let mut conn = self
            .connector
            .connect()
            .await
            .map_err(|source| CompanyError::Connect { source })?;
        let result = self.provisioner.create_schema(&mut conn, company).await;
        self.release(conn).await;
        result
    }

    /// Migrate every non-default company, one after the other.
    ///
    /// # Errors
    /// Returns `RunError` only when the company list cannot be obtained;
    /// per-company failures are reported in the returned [`MigrationReport`].
    pub async fn run(&self) -> Result<MigrationReport, RunError> {
        info!("*** Start migrating companies to DB Partition ***");

        let companies = self.companies_to_migrate().await?;
        info!(count = companies.len(), "Found companies to migrate");

        let mut report = MigrationReport::default();
        for company in companies {
            info!(company = %company, "** Migrating company with id {company}");
            let schema = self.provisioner.schema_for(company);
            let result = self.migrate_company(company).await;
            if let Err(err) = &result {
                error!(
                    company = %company,
                    schema = %schema,
                    table = err.table(),
                    error = %err,
                    details = ?err,
                    "Company migration failed; continuing with next company"
                );
            }
            report.outcomes.push(CompanyOutcome {
                company,
                schema,
                result,
            });
        }

        info!(
            migrated = report.succeeded().count(),
            failed = report.failed().count(),
            "*** End migrating companies to DB Partition ***"
        );
        Ok(report)
    }

    async fn release(&self, conn: C::Conn) {
        if let Err(err) = self.connector.release(conn).await {
            warn!(error = %err, "Failed to close connection");
        }
    }
}
