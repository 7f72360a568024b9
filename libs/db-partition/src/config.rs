//! Run configuration.
//!
//! Built once at startup and passed by reference into every component.
//! Settings are layered with `figment`: built-in defaults first, then the
//! values supplied on the command line. The password never enters the
//! figment; it is carried separately as a [`Password`].

use figment::Figment;
use figment::providers::Serialized;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::company::{CompanyId, SchemaName};
use crate::password::Password;

pub const DEFAULT_SCHEMA_PREFIX: &str = "lpartition_";
pub const DEFAULT_TENANT_COLUMN: &str = "companyId";
pub const DEFAULT_CHARSET: &str = "utf8";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to extract migration settings: {0}")]
    Extract(#[source] Box<figment::Error>),

    #[error("invalid migration settings: {0}")]
    Invalid(String),

    #[error("invalid control-table pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Non-secret settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationSettings {
    /// The shared schema every company lives in before migration.
    pub default_schema: String,
    pub username: String,
    pub host: String,
    pub port: u16,
    pub schema_prefix: String,
    /// Character set of created schemas.
    pub charset: String,
    /// Tables that are always shared, whatever their columns.
    pub control_tables: Vec<String>,
    /// Name prefixes of infrastructure tables that are always shared.
    pub control_prefixes: Vec<String>,
    /// Regular expressions; a matching table name is always shared.
    pub control_patterns: Vec<String>,
    /// Column holding row ownership.
    pub tenant_column: String,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            default_schema: String::new(),
            username: String::new(),
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            schema_prefix: DEFAULT_SCHEMA_PREFIX.to_owned(),
            charset: DEFAULT_CHARSET.to_owned(),
            control_tables: vec!["Company".to_owned(), "VirtualHost".to_owned()],
            control_prefixes: vec!["QUARTZ_".to_owned()],
            control_patterns: Vec::new(),
            tenant_column: DEFAULT_TENANT_COLUMN.to_owned(),
        }
    }
}

#[derive(Serialize)]
struct Positional<'a> {
    default_schema: &'a str,
    username: &'a str,
}

/// Defaults overlaid with the command-line values.
#[must_use]
pub fn layered(default_schema: &str, username: &str) -> Figment {
    Figment::from(Serialized::defaults(MigrationSettings::default())).merge(Serialized::globals(
        Positional {
            default_schema,
            username,
        },
    ))
}

/// Immutable run configuration.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub settings: MigrationSettings,
    pub password: Password,
}

impl MigrationConfig {
    /// Build from the three command-line values on top of the defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` if the resulting settings are invalid.
    pub fn from_args(
        default_schema: &str,
        username: &str,
        password: impl Into<Password>,
    ) -> Result<Self, ConfigError> {
        Self::from_figment(&layered(default_schema, username), password.into())
    }

    /// Extract and validate settings from a figment.
    ///
    /// # Errors
    /// Returns `ConfigError::Extract` if the figment does not deserialize and
    /// `ConfigError::Invalid` if a required value is empty.
    pub fn from_figment(figment: &Figment, password: Password) -> Result<Self, ConfigError> {
        let settings: MigrationSettings = figment
            .extract()
            .map_err(|e| ConfigError::Extract(Box::new(e)))?;
        settings.validate()?;
        Ok(Self { settings, password })
    }

    #[must_use]
    pub fn source_schema(&self) -> SchemaName {
        SchemaName::new(&self.settings.default_schema)
    }

    #[must_use]
    pub fn target_schema(&self, company: CompanyId) -> SchemaName {
        SchemaName::for_company(&self.settings.schema_prefix, company)
    }
}

impl MigrationSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("default_schema", &self.default_schema),
            ("username", &self.username),
            ("host", &self.host),
            ("schema_prefix", &self.schema_prefix),
            ("charset", &self.charset),
            ("tenant_column", &self.tenant_column),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }
        // The charset is spliced into DDL unquoted.
        if !self
            .charset
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::Invalid(format!(
                "charset '{}' is not a plain identifier",
                self.charset
            )));
        }
        Ok(())
    }
}
