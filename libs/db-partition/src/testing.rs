//! In-memory backend for unit tests.
//!
//! Interprets [`Statement`] values directly against a small model of schemas,
//! tables and views. Views resolve to their source table on every read, so
//! pass-through semantics hold without a refresh.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;

use crate::company::CompanyId;
use crate::config::MigrationConfig;
use crate::conn::{Connector, PartitionConnection};
use crate::sql::Statement;
use crate::{DbError, Result};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Int(i64),
    Text(String),
}

pub type Row = Vec<Value>;

pub fn int(v: i64) -> Value {
    Value::Int(v)
}

pub fn text(v: &str) -> Value {
    Value::Text(v.to_owned())
}

#[derive(Debug, Clone, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, Default)]
struct Schema {
    tables: BTreeMap<String, Table>,
    /// view name -> (source schema, source table)
    views: BTreeMap<String, (String, String)>,
}

type StatementFault = Arc<dyn Fn(&Statement) -> bool + Send + Sync>;

#[derive(Default)]
struct State {
    schemas: BTreeMap<String, Schema>,
    snapshot: Option<BTreeMap<String, Schema>>,
    log: Vec<Statement>,
    attempts: usize,
    opened: usize,
    released: usize,
    fail_statement: Option<StatementFault>,
    fail_column_lookup: Option<String>,
    fail_company_query: bool,
    fail_connect_on: Option<usize>,
}

/// Shared in-memory database; clones share state.
#[derive(Clone)]
pub struct MemoryDb {
    default_schema: String,
    state: Arc<Mutex<State>>,
}

fn fail(msg: String) -> DbError {
    DbError::Other(anyhow!(msg))
}

impl MemoryDb {
    pub fn new(default_schema: &str) -> Self {
        let mut state = State::default();
        state
            .schemas
            .insert(default_schema.to_owned(), Schema::default());
        Self {
            default_schema: default_schema.to_owned(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Companies {1 (default), 2, 3}, control `Company`, tenant `Foo`.
    pub fn scenario() -> Self {
        let db = Self::new("lportal");
        db.create_table("Company", &["companyId", "webId"]);
        for (id, web) in [(1, "liferay.com"), (2, "two.com"), (3, "three.com")] {
            db.insert("Company", vec![int(id), text(web)]);
        }
        db.create_table("Foo", &["companyId", "value"]);
        for (id, v) in [(1, "a"), (2, "b"), (3, "c")] {
            db.insert("Foo", vec![int(id), text(v)]);
        }
        db
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn create_table(&self, name: &str, columns: &[&str]) {
        let mut state = self.lock();
        let schema = state.schemas.get_mut(&self.default_schema).unwrap();
        schema.tables.insert(
            name.to_owned(),
            Table {
                columns: columns.iter().map(|c| (*c).to_owned()).collect(),
                rows: Vec::new(),
            },
        );
    }

    pub fn insert(&self, table: &str, row: Row) {
        let mut state = self.lock();
        let schema = state.schemas.get_mut(&self.default_schema).unwrap();
        schema.tables.get_mut(table).unwrap().rows.push(row);
    }

    /// Rows of a table or view; views read through to their source.
    pub fn rows(&self, schema: &str, name: &str) -> Vec<Row> {
        read_rows(&self.lock().schemas, schema, name).unwrap()
    }

    pub fn has_schema(&self, schema: &str) -> bool {
        self.lock().schemas.contains_key(schema)
    }

    /// Every table and view of a schema, sorted by name.
    pub fn entities(&self, schema: &str) -> Vec<String> {
        let state = self.lock();
        let s = &state.schemas[schema];
        let mut names: Vec<String> = s.tables.keys().chain(s.views.keys()).cloned().collect();
        names.sort();
        names
    }

    pub fn is_view(&self, schema: &str, name: &str) -> bool {
        self.lock().schemas[schema].views.contains_key(name)
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.lock().log.clone()
    }

    pub fn opened(&self) -> usize {
        self.lock().opened
    }

    pub fn released(&self) -> usize {
        self.lock().released
    }

    pub fn fail_statement(&self, pred: impl Fn(&Statement) -> bool + Send + Sync + 'static) {
        self.lock().fail_statement = Some(Arc::new(pred));
    }

    pub fn clear_faults(&self) {
        let mut state = self.lock();
        state.fail_statement = None;
        state.fail_column_lookup = None;
        state.fail_company_query = false;
        state.fail_connect_on = None;
    }

    pub fn fail_column_lookup(&self, table: &str) {
        self.lock().fail_column_lookup = Some(table.to_owned());
    }

    pub fn fail_company_query(&self) {
        self.lock().fail_company_query = true;
    }

    /// Fail the `n`-th connection attempt (1-based, counted from now on).
    pub fn fail_connect_on(&self, n: usize) {
        let mut state = self.lock();
        state.fail_connect_on = Some(state.attempts + n);
    }
}

fn read_rows(schemas: &BTreeMap<String, Schema>, schema: &str, name: &str) -> Result<Vec<Row>> {
    let s = schemas
        .get(schema)
        .ok_or_else(|| fail(format!("Unknown database '{schema}'")))?;
    if let Some(table) = s.tables.get(name) {
        return Ok(table.rows.clone());
    }
    if let Some((src_schema, src_table)) = s.views.get(name) {
        return read_rows(schemas, src_schema, src_table);
    }
    Err(fail(format!("Table '{schema}.{name}' doesn't exist")))
}

fn table_mut<'a>(
    schemas: &'a mut BTreeMap<String, Schema>,
    schema: &str,
    name: &str,
) -> Result<&'a mut Table> {
    schemas
        .get_mut(schema)
        .and_then(|s| s.tables.get_mut(name))
        .ok_or_else(|| fail(format!("Table '{schema}.{name}' doesn't exist")))
}

fn column_index(table: &Table, column: &str) -> Result<usize> {
    table
        .columns
        .iter()
        .position(|c| c == column)
        .ok_or_else(|| fail(format!("Unknown column '{column}'")))
}

fn apply(state: &mut State, statement: &Statement) -> Result<u64> {
    let schemas = &mut state.schemas;
    match statement {
        Statement::CreateSchema { schema, .. } => {
            if schemas.contains_key(schema.as_str()) {
                return Err(fail(format!(
                    "Can't create database '{schema}'; database exists"
                )));
            }
            schemas.insert(schema.as_str().to_owned(), Schema::default());
            Ok(1)
        }
        Statement::CreateView {
            target,
            source,
            table,
        } => {
            read_rows(schemas, source.as_str(), table)?;
            let t = schemas
                .get_mut(target.as_str())
                .ok_or_else(|| fail(format!("Unknown database '{target}'")))?;
            if t.tables.contains_key(table) {
                return Err(fail(format!("'{target}.{table}' is not VIEW")));
            }
            t.views
                .insert(table.clone(), (source.as_str().to_owned(), table.clone()));
            Ok(0)
        }
        Statement::CreateTableLike {
            target,
            source,
            table,
        } => {
            let columns = table_mut(schemas, source.as_str(), table)?.columns.clone();
            let t = schemas
                .get_mut(target.as_str())
                .ok_or_else(|| fail(format!("Unknown database '{target}'")))?;
            if t.views.contains_key(table) {
                return Err(fail(format!("Table '{table}' already exists")));
            }
            t.tables.entry(table.clone()).or_insert(Table {
                columns,
                rows: Vec::new(),
            });
            Ok(0)
        }
        Statement::CopyCompanyRows {
            target,
            source,
            table,
            column,
            company,
        } => {
            let src = table_mut(schemas, source.as_str(), table)?;
            let idx = column_index(src, column)?;
            let owned: Vec<Row> = src
                .rows
                .iter()
                .filter(|r| r[idx] == Value::Int(company.get()))
                .cloned()
                .collect();
            let dst = table_mut(schemas, target.as_str(), table)?;
            let n = owned.len() as u64;
            dst.rows.extend(owned);
            Ok(n)
        }
        Statement::DeleteCompanyRows {
            source,
            table,
            column,
            company,
        } => {
            let src = table_mut(schemas, source.as_str(), table)?;
            let idx = column_index(src, column)?;
            let before = src.rows.len();
            src.rows.retain(|r| r[idx] != Value::Int(company.get()));
            Ok((before - src.rows.len()) as u64)
        }
        Statement::Begin => {
            state.snapshot = Some(state.schemas.clone());
            Ok(0)
        }
        Statement::Commit => {
            state.snapshot = None;
            Ok(0)
        }
        Statement::Rollback => {
            if let Some(snapshot) = state.snapshot.take() {
                state.schemas = snapshot;
            }
            Ok(0)
        }
    }
}

pub struct MemoryConn {
    db: MemoryDb,
}

#[async_trait]
impl PartitionConnection for MemoryConn {
    async fn non_default_company_ids(&mut self) -> Result<Vec<CompanyId>> {
        let state = self.db.lock();
        if state.fail_company_query {
            return Err(fail("company query failed".to_owned()));
        }
        let schema = &state.schemas[&self.db.default_schema];
        let table = schema
            .tables
            .get("Company")
            .ok_or_else(|| fail("Table 'Company' doesn't exist".to_owned()))?;
        let idx = column_index(table, "companyId")?;
        let ids: Vec<i64> = table
            .rows
            .iter()
            .filter_map(|r| match r[idx] {
                Value::Int(id) => Some(id),
                Value::Text(_) => None,
            })
            .collect();
        let Some(min) = ids.iter().min().copied() else {
            return Ok(Vec::new());
        };
        Ok(ids
            .into_iter()
            .filter(|id| *id > min)
            .map(CompanyId::new)
            .collect())
    }

    async fn base_tables(&mut self) -> Result<Vec<String>> {
        let state = self.db.lock();
        Ok(state.schemas[&self.db.default_schema]
            .tables
            .keys()
            .cloned()
            .collect())
    }

    async fn has_column(&mut self, table: &str, column: &str) -> Result<bool> {
        let state = self.db.lock();
        if state.fail_column_lookup.as_deref() == Some(table) {
            return Err(fail(format!("metadata lookup failed for '{table}'")));
        }
        Ok(state.schemas[&self.db.default_schema]
            .tables
            .get(table)
            .is_some_and(|t| t.columns.iter().any(|c| c == column)))
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        let mut state = self.db.lock();
        state.log.push(statement.clone());
        if let Some(pred) = &state.fail_statement
            && pred(statement)
        {
            return Err(fail(format!("injected failure: {statement}")));
        }
        apply(&mut state, statement)
    }
}

#[async_trait]
impl Connector for MemoryDb {
    type Conn = MemoryConn;

    async fn connect(&self) -> Result<MemoryConn> {
        let mut state = self.lock();
        state.attempts += 1;
        if state.fail_connect_on == Some(state.attempts) {
            return Err(fail("connection refused".to_owned()));
        }
        state.opened += 1;
        Ok(MemoryConn { db: self.clone() })
    }

    async fn release(&self, conn: MemoryConn) -> Result<()> {
        drop(conn);
        self.lock().released += 1;
        Ok(())
    }
}

pub fn config() -> MigrationConfig {
    MigrationConfig::from_args("lportal", "root", "pw").unwrap()
}
