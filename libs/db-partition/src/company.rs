//! Company identifiers and the per-company schema naming convention.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric key partitioning all tenant data (`companyId` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(i64);

impl CompanyId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for CompanyId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a database schema (a `MySQL` database).
///
/// Target schemas are always built with [`SchemaName::for_company`]: the
/// literal prefix followed by the decimal company id. Other tooling relies on
/// this convention, so it must not change.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaName(String);

impl SchemaName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `<prefix><companyId>`, e.g. `lpartition_20101`.
    #[must_use]
    pub fn for_company(prefix: &str, company: CompanyId) -> Self {
        Self(format!("{prefix}{company}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SchemaName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
