//! Control/tenant classification of source tables.
//!
//! A table is *control* (shared by every company) when any of these holds:
//! 1. its name is in the override set;
//! 2. its name matches one of the [`NameRule`]s;
//! 3. it has no tenant column (`companyId`, exact, case-sensitive).
//!
//! Everything else is *tenant* and gets partitioned. Name checks run first, so
//! overridden tables never cost a metadata round-trip.

use std::collections::BTreeSet;

use regex::Regex;

use crate::Result;
use crate::config::{ConfigError, MigrationSettings};
use crate::conn::PartitionConnection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableClass {
    /// Shared: exposed in every company schema through a view.
    Control,
    /// Company-scoped: copied and split per company.
    Tenant,
}

/// Name predicate marking a table as control regardless of its columns.
#[derive(Debug, Clone)]
pub enum NameRule {
    Prefix(String),
    Pattern(Regex),
}

impl NameRule {
    #[must_use]
    pub fn matches(&self, table: &str) -> bool {
        match self {
            Self::Prefix(prefix) => table.starts_with(prefix.as_str()),
            Self::Pattern(re) => re.is_match(table),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationPolicy {
    control_tables: BTreeSet<String>,
    rules: Vec<NameRule>,
    tenant_column: String,
}

impl Default for ClassificationPolicy {
    /// `Company` and `VirtualHost` overrides, `QUARTZ_` scheduler tables,
    /// `companyId` ownership column.
    fn default() -> Self {
        Self::new("companyId")
            .with_control_table("Company")
            .with_control_table("VirtualHost")
            .with_rule(NameRule::Prefix("QUARTZ_".to_owned()))
    }
}

impl ClassificationPolicy {
    /// Empty policy: only the column check applies.
    #[must_use]
    pub fn new(tenant_column: impl Into<String>) -> Self {
        Self {
            control_tables: BTreeSet::new(),
            rules: Vec::new(),
            tenant_column: tenant_column.into(),
        }
    }

    #[must_use]
    pub fn with_control_table(mut self, table: impl Into<String>) -> Self {
        self.control_tables.insert(table.into());
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: NameRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Build the policy described by the settings.
    ///
    /// # Errors
    /// Returns `ConfigError::Pattern` if a control pattern is not a valid regex.
    pub fn from_settings(settings: &MigrationSettings) -> std::result::Result<Self, ConfigError> {
        let mut policy = Self::new(settings.tenant_column.clone());
        for table in &settings.control_tables {
            policy = policy.with_control_table(table.clone());
        }
        for prefix in &settings.control_prefixes {
            policy = policy.with_rule(NameRule::Prefix(prefix.clone()));
        }
        for pattern in &settings.control_patterns {
            let re = Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            policy = policy.with_rule(NameRule::Pattern(re));
        }
        Ok(policy)
    }

    #[must_use]
    pub fn tenant_column(&self) -> &str {
        &self.tenant_column
    }

    /// Decide from the name alone. `None` means the columns must be checked.
    #[must_use]
    pub fn classify_by_name(&self, table: &str) -> Option<TableClass> {
        if self.control_tables.contains(table) || self.rules.iter().any(|r| r.matches(table)) {
            Some(TableClass::Control)
        } else {
            None
        }
    }

    /// Classify a table of the connection's current schema.
    ///
    /// # Errors
    /// Returns the metadata lookup error unchanged; a failed lookup is never
    /// taken as either classification.
    pub async fn classify(
        &self,
        conn: &mut dyn PartitionConnection,
        table: &str,
    ) -> Result<TableClass> {
        if let Some(class) = self.classify_by_name(table) {
            return Ok(class);
        }
        if conn.has_column(table, &self.tenant_column).await? {
            Ok(TableClass::Tenant)
        } else {
            Ok(TableClass::Control)
        }
    }

    /// # Errors
    /// Same as [`classify`](Self::classify).
    pub async fn is_control_table(
        &self,
        conn: &mut dyn PartitionConnection,
        table: &str,
    ) -> Result<bool> {
        Ok(self.classify(conn, table).await? == TableClass::Control)
    }
}
