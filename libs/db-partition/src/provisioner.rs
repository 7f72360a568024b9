//! Per-company schema provisioning.
//!
//! For one company: create `<prefix><companyId>`, then walk the base tables of
//! the source schema in enumeration order. Control tables get a pass-through
//! view, tenant tables get a structural copy followed by row relocation. The
//! first error aborts the remaining tables of that company.

use tracing::{debug, info};

use crate::classifier::{ClassificationPolicy, TableClass};
use crate::company::{CompanyId, SchemaName};
use crate::config::MigrationConfig;
use crate::conn::PartitionConnection;
use crate::error::CompanyError;
use crate::relocator::{RelocationStrategy, RelocationTarget, RowsMoved};
use crate::sql::Statement;

/// Rows moved for one tenant table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRelocation {
    pub table: String,
    pub rows: RowsMoved,
}

/// What was created in a company schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub schema: SchemaName,
    /// Control tables, exposed as views.
    pub views: Vec<String>,
    /// Tenant tables, copied and filled.
    pub tables: Vec<TableRelocation>,
}

impl ProvisionReport {
    fn new(schema: SchemaName) -> Self {
        Self {
            schema,
            views: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Views plus tables created.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.views.len() + self.tables.len()
    }

    #[must_use]
    pub fn rows_moved(&self) -> u64 {
        self.tables.iter().map(|t| t.rows.copied).sum()
    }
}

pub struct SchemaProvisioner {
    source: SchemaName,
    prefix: String,
    charset: String,
    policy: ClassificationPolicy,
    strategy: Box<dyn RelocationStrategy>,
}

impl SchemaProvisioner {
    #[must_use]
    pub fn new(
        config: &MigrationConfig,
        policy: ClassificationPolicy,
        strategy: Box<dyn RelocationStrategy>,
    ) -> Self {
        Self {
            source: config.source_schema(),
            prefix: config.settings.schema_prefix.clone(),
            charset: config.settings.charset.clone(),
            policy,
            strategy,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &ClassificationPolicy {
        &self.policy
    }

    #[must_use]
    pub fn schema_for(&self, company: CompanyId) -> SchemaName {
        SchemaName::for_company(&self.prefix, company)
    }

    /// Create the company schema and populate it.
    ///
    /// Schema creation is not idempotent: an existing schema is an error.
    ///
    /// # Errors
    /// Returns the first failing step as a `CompanyError`; the schema may be
    /// left partially populated.
    pub async fn create_schema(
        &self,
        conn: &mut dyn PartitionConnection,
        company: CompanyId,
    ) -> Result<ProvisionReport, CompanyError> {
        let schema = self.schema_for(company);

        let create = Statement::CreateSchema {
            schema: schema.clone(),
            charset: self.charset.clone(),
        };
        debug!(sql = %create, "Creating schema");
        conn.execute(&create)
            .await
            .map_err(|source| CompanyError::CreateSchema {
                schema: schema.clone(),
                source,
            })?;
        info!(company = %company, schema = %schema, "Schema {schema} created");

        let tables = conn
            .base_tables()
            .await
            .map_err(|source| CompanyError::ListTables { source })?;

        let mut report = ProvisionReport::new(schema);
        for table in tables {
            match self.classify(conn, &table).await? {
                TableClass::Control => {
                    self.create_view(conn, &report.schema, &table).await?;
                    report.views.push(table);
                }
                TableClass::Tenant => {
                    let rows = self
                        .create_tenant_table(conn, company, &report.schema, &table)
                        .await?;
                    report.tables.push(TableRelocation { table, rows });
                }
            }
        }

        info!(
            company = %company,
            schema = %report.schema,
            views = report.views.len(),
            tables = report.tables.len(),
            rows = report.rows_moved(),
            "Tables migrated"
        );
        Ok(report)
    }

    /// Re-run only the view pass for a company whose schema already exists.
    ///
    /// Views are created with replace semantics, so this can run any number
    /// of times. Tenant tables are left alone.
    ///
    /// # Errors
    /// Returns `CompanyError` on enumeration, classification or DDL failure.
    pub async fn create_views(
        &self,
        conn: &mut dyn PartitionConnection,
        company: CompanyId,
    ) -> Result<Vec<String>, CompanyError> {
        let schema = self.schema_for(company);
        let tables = conn
            .base_tables()
            .await
            .map_err(|source| CompanyError::ListTables { source })?;

        let mut views = Vec::new();
        for table in tables {
            if self.classify(conn, &table).await? == TableClass::Control {
                self.create_view(conn, &schema, &table).await?;
                views.push(table);
            }
        }
        info!(company = %company, schema = %schema, views = views.len(), "Views refreshed");
        Ok(views)
    }

    async fn classify(
        &self,
        conn: &mut dyn PartitionConnection,
        table: &str,
    ) -> Result<TableClass, CompanyError> {
        self.policy
            .classify(conn, table)
            .await
            .map_err(|source| CompanyError::Classify {
                table: table.to_owned(),
                source,
            })
    }

    async fn create_view(
        &self,
        conn: &mut dyn PartitionConnection,
        schema: &SchemaName,
        table: &str,
    ) -> Result<(), CompanyError> {
        let stmt = Statement::CreateView {
            target: schema.clone(),
            source: self.source.clone(),
            table: table.to_owned(),
        };
        debug!(sql = %stmt, "Creating view");
        conn.execute(&stmt)
            .await
            .map_err(|source| CompanyError::CreateView {
                table: table.to_owned(),
                source,
            })?;
        Ok(())
    }

    async fn create_tenant_table(
        &self,
        conn: &mut dyn PartitionConnection,
        company: CompanyId,
        schema: &SchemaName,
        table: &str,
    ) -> Result<RowsMoved, CompanyError> {
        let stmt = Statement::CreateTableLike {
            target: schema.clone(),
            source: self.source.clone(),
            table: table.to_owned(),
        };
        debug!(sql = %stmt, "Creating table");
        conn.execute(&stmt)
            .await
            .map_err(|source| CompanyError::CreateTable {
                table: table.to_owned(),
                source,
            })?;

        let target = RelocationTarget {
            company,
            source: &self.source,
            target: schema,
            table,
            column: self.policy.tenant_column(),
        };
        self.strategy
            .relocate(conn, &target)
            .await
            .map_err(|source| CompanyError::Relocate {
                table: table.to_owned(),
                source,
            })
    }
}
