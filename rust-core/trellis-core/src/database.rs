//! # Database Connection
//!
//! One lazily opened SQLx connection (SQLite or PostgreSQL) plus the
//! statement builder for its dialect.
//!
//! ## Failure model
//!
//! - Opening the handle (or running its init scripts) fails with `Error::Connect`
//! - A statement the driver refuses to prepare fails with `Error::Prepare`
//! - A prepared statement that fails to execute is logged and reported
//!   through the return value: `Fetched::success == false`, `exec` returning
//!   `0`, [`Written::Failed`]
//!
//! ## Transactions
//!
//! [`Connection::transact`] issues `BEGIN` unless a transaction is already
//! open, then `COMMIT` when no statement failed inside it, `ROLLBACK`
//! otherwise. Nested calls run inside the outer transaction.
//!
//! `Connection` is deliberately not `Clone`: it owns a single handle.

use crate::builder::{Builder, Criteria, Driver, SelectOptions, Statement};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::types::{DbValue, Row};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use serde::Serialize;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::types::{Decimal, JsonValue, Uuid};
use sqlx::{Column, ConnectOptions, Connection as _, Executor, Row as _, TypeInfo, ValueRef};
use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Boxed future borrowing the connection, as returned by `transact` closures
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Open driver connection
enum Handle {
    Sqlite(SqliteConnection),
    Postgres(PgConnection),
}

/// Result of [`Connection::query`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fetched {
    /// Returned rows
    pub rows: Vec<Row>,
    /// False when the statement failed to execute
    pub success: bool,
}

/// Outcome of a write helper
#[derive(Debug, Clone, PartialEq)]
pub enum Written {
    /// The statement failed to execute
    Failed,
    /// Number of affected rows
    Affected(u64),
    /// The reloaded row (`None` when it could not be found)
    Loaded(Option<Row>),
    /// The reloaded rows
    LoadedMany(Vec<Row>),
}

impl Written {
    /// Returns true for `Failed`
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Affected row count, if that is what was returned
    #[must_use]
    pub fn affected(&self) -> Option<u64> {
        match self {
            Self::Affected(n) => Some(*n),
            _ => None,
        }
    }

    /// Reloaded row, if one was returned
    #[must_use]
    pub fn row(&self) -> Option<&Row> {
        match self {
            Self::Loaded(row) => row.as_ref(),
            _ => None,
        }
    }

    /// Reloaded rows, if those were returned
    #[must_use]
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Self::LoadedMany(rows) => Some(rows),
            _ => None,
        }
    }
}

/// A page with totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// Rows of this page
    pub subset: Vec<Row>,
    /// Rows on this page
    pub count: u64,
    /// Requested page (at least 1)
    pub current_page: u64,
    /// Next page, never past the last page
    pub next_page: u64,
    /// Previous page, `0` on the first
    pub prev_page: u64,
    /// Last page
    pub last_page: u64,
    /// Total matching rows
    pub total: u64,
    /// 1-based position of the first row
    pub first: u64,
    /// 1-based position of the last row
    pub last: u64,
    /// Page size
    pub per_page: u64,
}

/// A page without totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimplePage {
    /// Rows of this page
    pub subset: Vec<Row>,
    /// Rows on this page
    pub count: u64,
    /// Requested page (at least 1)
    pub current_page: u64,
    /// Always `current_page + 1`
    pub next_page: u64,
    /// Previous page, `0` on the first
    pub prev_page: u64,
    /// Page size
    pub per_page: u64,
}

enum Outcome {
    Rows(Vec<Row>),
    Done { affected: u64, last_id: Option<i64> },
    Failed(sqlx::Error),
}

/// Database connection
pub struct Connection {
    config: ConnectionConfig,
    driver: Driver,
    builder: Builder,
    handle: Option<Handle>,
    in_transaction: bool,
    failed: bool,
    last_insert_id: Option<i64>,
}

impl Connection {
    /// Create a connection; nothing is opened until first use
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedDriver` when the DSN scheme is neither
    /// SQLite nor PostgreSQL.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let scheme = config.dsn.split(':').next().unwrap_or_default();
        let driver = match Driver::from_name(scheme) {
            Some(driver @ (Driver::Sqlite | Driver::Postgres)) => driver,
            _ => {
                return Err(Error::UnsupportedDriver {
                    driver: scheme.to_string(),
                })
            }
        };

        Ok(Self {
            builder: Builder::from_config(driver, &config),
            config,
            driver,
            handle: None,
            in_transaction: false,
            failed: false,
            last_insert_id: None,
        })
    }

    /// Shorthand for `Connection::new(ConnectionConfig::new(dsn))`
    ///
    /// # Errors
    ///
    /// See [`Connection::new`].
    pub fn open(dsn: &str) -> Result<Self> {
        Self::new(ConnectionConfig::new(dsn))
    }

    /// Connection settings
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Statement builder for this dialect
    #[must_use]
    pub fn builder(&self) -> &Builder {
        &self.builder
    }

    /// SQL dialect
    #[must_use]
    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Quote an identifier
    #[must_use]
    pub fn quote(&self, expr: &str) -> String {
        self.builder.quote(expr)
    }

    /// Database name from the DSN (`dbname=` / `database=`, or the URL path)
    #[must_use]
    pub fn name(&self) -> Option<String> {
        static KEYED: OnceLock<Option<Regex>> = OnceLock::new();

        let dsn = &self.config.dsn;
        let keyed = KEYED
            .get_or_init(|| Regex::new(r"(?i)^.+?(?:dbname|database)=([^;&]+)").ok())
            .as_ref()?;
        if let Some(caps) = keyed.captures(dsn) {
            return Some(caps[1].replace("\\ ", " "));
        }

        if self.driver != Driver::Postgres {
            return None;
        }

        let (_, rest) = dsn.split_once("://")?;
        let (_, path) = rest.split_once('/')?;
        let name = path.split(|c| c == '?' || c == '#').next().unwrap_or_default();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Whether a transaction opened by [`Connection::transact`] is active
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Open the handle now
    ///
    /// # Errors
    ///
    /// Returns `Error::Connect` if the database cannot be opened or an init
    /// script fails.
    pub async fn connect(&mut self) -> Result<()> {
        self.handle().await.map(|_| ())
    }

    /// Close the handle; the next call opens a fresh one
    pub async fn close(&mut self) {
        let result = match self.handle.take() {
            Some(Handle::Sqlite(conn)) => conn.close().await,
            Some(Handle::Postgres(conn)) => conn.close().await,
            None => Ok(()),
        };
        if let Err(e) = result {
            warn!(error = %e, "closing database handle failed");
        }
        self.in_transaction = false;
    }

    async fn handle(&mut self) -> Result<&mut Handle> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => open_handle(&self.config, self.driver).await?,
        };
        Ok(self.handle.insert(handle))
    }

    /// Server version string
    ///
    /// # Errors
    ///
    /// See [`Connection::query`].
    pub async fn version(&mut self) -> Result<Option<String>> {
        let sql = match self.driver {
            Driver::Postgres => "SHOW server_version",
            _ => "SELECT sqlite_version()",
        };
        let fetched = self.query(sql, &[]).await?;

        Ok(fetched
            .rows
            .first()
            .and_then(|row| row.values().next())
            .map(ToString::to_string))
    }

    /// Id generated by the last insert
    pub async fn last_insert_id(&mut self) -> Option<i64> {
        if self.driver != Driver::Postgres {
            return self.last_insert_id;
        }

        match self.query("SELECT lastval()", &[]).await {
            Ok(fetched) => fetched
                .rows
                .first()
                .and_then(|row| row.values().next())
                .and_then(DbValue::as_int),
            Err(_) => None,
        }
    }

    /// Whether `table` can be selected from
    pub async fn exists(&mut self, table: &str) -> bool {
        let sql = format!("SELECT 1 FROM {} LIMIT 1", self.quote(table));
        let Ok(handle) = self.handle().await else {
            return false;
        };

        match handle {
            Handle::Sqlite(conn) => conn.execute(sql.as_str()).await.is_ok(),
            Handle::Postgres(conn) => conn.execute(sql.as_str()).await.is_ok(),
        }
    }

    /// Run a statement and fetch its rows
    ///
    /// # Errors
    ///
    /// Returns `Error::Connect` or `Error::Prepare`; execution failures are
    /// reported as `success == false`.
    pub async fn query(&mut self, sql: &str, values: &[DbValue]) -> Result<Fetched> {
        Ok(match self.run(sql, values, true).await? {
            Outcome::Rows(rows) => Fetched {
                rows,
                success: true,
            },
            Outcome::Done { .. } => Fetched {
                rows: Vec::new(),
                success: true,
            },
            Outcome::Failed(_) => Fetched::default(),
        })
    }

    /// Run a statement, returning the affected row count (`0` on failure)
    ///
    /// # Errors
    ///
    /// Returns `Error::Connect` or `Error::Prepare`.
    pub async fn exec(&mut self, sql: &str, values: &[DbValue]) -> Result<u64> {
        Ok(match self.run(sql, values, false).await? {
            Outcome::Done { affected, .. } => affected,
            _ => 0,
        })
    }

    async fn run(&mut self, sql: &str, values: &[DbValue], fetch: bool) -> Result<Outcome> {
        let sql = match self.driver {
            Driver::Postgres => numbered_placeholders(sql),
            _ => Cow::Borrowed(sql),
        };
        debug!(sql = %sql, values = values.len(), "executing statement");

        let outcome = match self.handle().await? {
            Handle::Sqlite(conn) => run_sqlite(conn, &sql, values, fetch).await,
            Handle::Postgres(conn) => run_postgres(conn, &sql, values, fetch).await,
        };
        let outcome = outcome.map_err(|e| {
            self.failed = true;
            e
        })?;

        match &outcome {
            Outcome::Failed(e) => {
                warn!(error = %e, sql = %sql, "statement failed");
                self.failed = true;
            }
            Outcome::Done {
                last_id: Some(id), ..
            } => self.last_insert_id = Some(*id),
            _ => {}
        }

        Ok(outcome)
    }

    async fn run_statement(&mut self, statement: &Statement) -> Result<Option<u64>> {
        Ok(match self.run(&statement.sql, &statement.values, false).await? {
            Outcome::Done { affected, .. } => Some(affected),
            Outcome::Rows(_) => Some(0),
            Outcome::Failed(_) => None,
        })
    }

    /// Select rows; an execution failure yields no rows
    ///
    /// # Errors
    ///
    /// Builder errors, `Error::Connect` or `Error::Prepare`.
    pub async fn select(
        &mut self,
        table: &str,
        criteria: Option<Criteria>,
        options: &SelectOptions,
    ) -> Result<Vec<Row>> {
        let statement = self.builder.select(table, criteria.as_ref(), options)?;
        Ok(self.query(&statement.sql, &statement.values).await?.rows)
    }

    /// Select the first matching row
    ///
    /// # Errors
    ///
    /// See [`Connection::select`].
    pub async fn select_one(
        &mut self,
        table: &str,
        criteria: Option<Criteria>,
        options: &SelectOptions,
    ) -> Result<Option<Row>> {
        let options = options.clone().limit(1);
        Ok(self.select(table, criteria, &options).await?.into_iter().next())
    }

    /// Insert one row
    ///
    /// With `load` set to a column name (usually the auto-increment key) the
    /// inserted row is selected back by the last insert id.
    ///
    /// # Errors
    ///
    /// Builder errors, `Error::Connect` or `Error::Prepare`.
    pub async fn insert(&mut self, table: &str, data: &Row, load: Option<&str>) -> Result<Written> {
        let statement = self.builder.insert(table, data)?;
        let Some(affected) = self.run_statement(&statement).await? else {
            return Ok(Written::Failed);
        };

        let Some(column) = load else {
            return Ok(Written::Affected(affected));
        };

        let Some(id) = self.last_insert_id().await else {
            return Ok(Written::Loaded(None));
        };

        let criteria = Criteria::new(format!("{} = ?", self.quote(column))).bind(id);
        let row = self
            .select_one(table, Some(criteria), &SelectOptions::new())
            .await?;
        Ok(Written::Loaded(row))
    }

    /// Update rows; with `reload` the first row matching `criteria` is returned
    ///
    /// # Errors
    ///
    /// Builder errors, `Error::Connect` or `Error::Prepare`.
    pub async fn update(
        &mut self,
        table: &str,
        data: &Row,
        criteria: Option<Criteria>,
        reload: bool,
    ) -> Result<Written> {
        let statement = self.builder.update(table, data, criteria.as_ref())?;
        let Some(affected) = self.run_statement(&statement).await? else {
            return Ok(Written::Failed);
        };

        if !reload {
            return Ok(Written::Affected(affected));
        }

        let row = self
            .select_one(table, criteria, &SelectOptions::new())
            .await?;
        Ok(Written::Loaded(row))
    }

    /// Delete rows
    ///
    /// # Errors
    ///
    /// `Error::Connect` or `Error::Prepare`.
    pub async fn delete(&mut self, table: &str, criteria: Option<Criteria>) -> Result<Written> {
        let statement = self.builder.delete(table, criteria.as_ref());
        Ok(match self.run_statement(&statement).await? {
            Some(affected) => Written::Affected(affected),
            None => Written::Failed,
        })
    }

    /// Insert several rows in one statement; with `reload` the rows matching it are returned
    ///
    /// # Errors
    ///
    /// `Error::EmptyBatch`, `Error::InvalidBatchRow`, `Error::Connect` or `Error::Prepare`.
    pub async fn insert_batch(
        &mut self,
        table: &str,
        rows: &[Row],
        reload: Option<Criteria>,
    ) -> Result<Written> {
        let statement = self.builder.insert_batch(table, rows)?;
        let Some(affected) = self.run_statement(&statement).await? else {
            return Ok(Written::Failed);
        };

        match reload {
            Some(criteria) => {
                let rows = self
                    .select(table, Some(criteria), &SelectOptions::new())
                    .await?;
                Ok(Written::LoadedMany(rows))
            }
            None => Ok(Written::Affected(affected)),
        }
    }

    /// Count matching rows
    ///
    /// # Errors
    ///
    /// See [`Connection::select`].
    pub async fn count(
        &mut self,
        table: &str,
        criteria: Option<Criteria>,
        options: &SelectOptions,
    ) -> Result<u64> {
        let statement = self.builder.count(table, criteria.as_ref(), options)?;
        let fetched = self.query(&statement.sql, &statement.values).await?;

        Ok(fetched
            .rows
            .first()
            .and_then(|row| row.values().next())
            .and_then(|value| match value {
                DbValue::Int(n) => u64::try_from(*n).ok(),
                DbValue::String(s) => s.parse().ok(),
                _ => None,
            })
            .unwrap_or(0))
    }

    /// Page of rows with totals
    ///
    /// The page size is `options.limit`, or the configured pagination size
    /// when that is `0`.
    ///
    /// # Errors
    ///
    /// See [`Connection::select`].
    pub async fn paginate(
        &mut self,
        table: &str,
        page: u64,
        criteria: Option<Criteria>,
        options: &SelectOptions,
    ) -> Result<Page> {
        let current_page = page.max(1);
        let limit = self.page_size(options);

        let mut counting = options.clone();
        counting.limit = 0;
        counting.offset = 0;
        let total = self.count(table, criteria.clone(), &counting).await?;
        let last_page = (total + limit - 1) / limit;

        let offset = (current_page - 1) * limit;
        let subset = if total > 0 {
            let options = options.clone().limit(limit).offset(offset);
            self.select(table, criteria, &options).await?
        } else {
            Vec::new()
        };

        let count = subset.len() as u64;
        let first = offset + 1;

        Ok(Page {
            subset,
            count,
            current_page,
            next_page: (current_page + 1).min(last_page),
            prev_page: current_page - 1,
            last_page,
            total,
            first,
            last: first.max(offset + count),
            per_page: limit,
        })
    }

    /// Page of rows without totals
    ///
    /// # Errors
    ///
    /// See [`Connection::select`].
    pub async fn simple_paginate(
        &mut self,
        table: &str,
        page: u64,
        criteria: Option<Criteria>,
        options: &SelectOptions,
    ) -> Result<SimplePage> {
        let current_page = page.max(1);
        let limit = self.page_size(options);
        let offset = (current_page - 1) * limit;

        let options = options.clone().limit(limit).offset(offset);
        let subset = self.select(table, criteria, &options).await?;

        Ok(SimplePage {
            count: subset.len() as u64,
            subset,
            current_page,
            next_page: current_page + 1,
            prev_page: current_page - 1,
            per_page: limit,
        })
    }

    fn page_size(&self, options: &SelectOptions) -> u64 {
        if options.limit > 0 {
            options.limit
        } else {
            self.config.pagination_size.max(1)
        }
    }

    /// Run `f` inside a transaction
    ///
    /// ```ignore
    /// let inserted = db
    ///     .transact(|db| Box::pin(async move { db.exec("INSERT INTO demo (name) VALUES ('foo')", &[]).await }))
    ///     .await?;
    /// ```
    ///
    /// The outermost call rolls back when any statement inside it failed to
    /// prepare or execute, and commits otherwise.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connect` if the handle cannot be opened and
    /// `Error::Transaction` if `BEGIN` or `COMMIT`/`ROLLBACK` fails. Errors
    /// from `f` are part of `T`.
    pub async fn transact<T, F>(&mut self, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut Connection) -> BoxFuture<'c, T>,
    {
        if self.in_transaction {
            return Ok(f(self).await);
        }

        self.raw("BEGIN").await?;
        self.in_transaction = true;
        self.failed = false;

        let result = f(self).await;

        self.in_transaction = false;
        if self.failed {
            debug!("rolling back transaction");
            self.raw("ROLLBACK").await?;
        } else {
            debug!("committing transaction");
            if let Err(e) = self.raw("COMMIT").await {
                if self.raw("ROLLBACK").await.is_err() {
                    warn!("rollback after failed commit failed");
                }
                return Err(e);
            }
        }

        Ok(result)
    }

    /// Run a transaction control statement
    async fn raw(&mut self, statement: &'static str) -> Result<()> {
        let result = match self.handle().await? {
            Handle::Sqlite(conn) => conn.execute(statement).await.map(|_| ()),
            Handle::Postgres(conn) => conn.execute(statement).await.map(|_| ()),
        };

        result.map_err(|source| {
            warn!(error = %source, statement, "transaction statement failed");
            Error::Transaction { statement, source }
        })
    }
}

async fn open_handle(config: &ConnectionConfig, driver: Driver) -> Result<Handle> {
    let connect = |source| Error::Connect { source };

    let handle = match driver {
        Driver::Postgres => {
            let mut options = PgConnectOptions::from_str(&config.dsn).map_err(connect)?;
            if let Some(username) = &config.username {
                options = options.username(username);
            }
            if let Some(password) = &config.password {
                options = options.password(password);
            }

            let mut conn = options.connect().await.map_err(connect)?;
            for script in &config.scripts {
                conn.execute(script.as_str()).await.map_err(connect)?;
            }
            Handle::Postgres(conn)
        }
        _ => {
            let options = SqliteConnectOptions::from_str(&config.dsn).map_err(connect)?;
            let mut conn = options.connect().await.map_err(connect)?;
            for script in &config.scripts {
                conn.execute(script.as_str()).await.map_err(connect)?;
            }
            Handle::Sqlite(conn)
        }
    };

    info!(driver = %driver, "database handle opened");
    Ok(handle)
}

async fn run_sqlite(
    conn: &mut SqliteConnection,
    sql: &str,
    values: &[DbValue],
    fetch: bool,
) -> Result<Outcome> {
    (&mut *conn)
        .prepare(sql)
        .await
        .map_err(|source| Error::Prepare {
            sql: sql.to_string(),
            source,
        })?;

    let query = bind_sqlite(sqlx::query(sql), values);
    Ok(if fetch {
        match query.fetch_all(&mut *conn).await {
            Ok(rows) => Outcome::Rows(rows.iter().map(sqlite_row_to_map).collect()),
            Err(e) => Outcome::Failed(e),
        }
    } else {
        match query.execute(&mut *conn).await {
            Ok(done) => Outcome::Done {
                affected: done.rows_affected(),
                last_id: Some(done.last_insert_rowid()),
            },
            Err(e) => Outcome::Failed(e),
        }
    })
}

async fn run_postgres(
    conn: &mut PgConnection,
    sql: &str,
    values: &[DbValue],
    fetch: bool,
) -> Result<Outcome> {
    (&mut *conn)
        .prepare(sql)
        .await
        .map_err(|source| Error::Prepare {
            sql: sql.to_string(),
            source,
        })?;

    let query = bind_postgres(sqlx::query(sql), values);
    Ok(if fetch {
        match query.fetch_all(&mut *conn).await {
            Ok(rows) => match rows.iter().map(pg_row_to_map).collect() {
                Ok(rows) => Outcome::Rows(rows),
                Err(e) => Outcome::Failed(e),
            },
            Err(e) => Outcome::Failed(e),
        }
    } else {
        match query.execute(&mut *conn).await {
            Ok(done) => Outcome::Done {
                affected: done.rows_affected(),
                last_id: None,
            },
            Err(e) => Outcome::Failed(e),
        }
    })
}

fn bind_sqlite<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &'q [DbValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    values.iter().fold(query, |q, value| match value {
        DbValue::Null => q.bind(None::<String>),
        DbValue::Int(i) => q.bind(*i),
        DbValue::Float(x) => q.bind(*x),
        DbValue::String(s) => q.bind(s.as_str()),
        DbValue::Bool(b) => q.bind(*b),
        DbValue::Bytes(b) => q.bind(b.as_slice()),
    })
}

fn bind_postgres<'q>(
    query: Query<'q, Postgres, PgArguments>,
    values: &'q [DbValue],
) -> Query<'q, Postgres, PgArguments> {
    values.iter().fold(query, |q, value| match value {
        DbValue::Null => q.bind(None::<String>),
        DbValue::Int(i) => q.bind(*i),
        DbValue::Float(x) => q.bind(*x),
        DbValue::String(s) => q.bind(s.as_str()),
        DbValue::Bool(b) => q.bind(*b),
        DbValue::Bytes(b) => q.bind(b.as_slice()),
    })
}

/// Rewrite `?` placeholders as `$1, $2, ...`, leaving quoted text alone
#[must_use]
pub fn numbered_placeholders(sql: &str) -> Cow<'_, str> {
    if !sql.contains('?') {
        return Cow::Borrowed(sql);
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut n = 0;

    for c in sql.chars() {
        match (quote, c) {
            (None, '\'' | '"') => {
                quote = Some(c);
                out.push(c);
            }
            (Some(q), _) if c == q => {
                quote = None;
                out.push(c);
            }
            (None, '?') => {
                n += 1;
                out.push_str(&format!("${n}"));
            }
            _ => out.push(c),
        }
    }

    Cow::Owned(out)
}

/// Convert SQLite row to an ordered map
fn sqlite_row_to_map(row: &SqliteRow) -> Row {
    let mut map = Row::with_capacity(row.columns().len());

    for (i, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();
        let Ok(raw) = row.try_get_raw(i) else {
            map.insert(name, DbValue::Null);
            continue;
        };
        if raw.is_null() {
            map.insert(name, DbValue::Null);
            continue;
        }

        let type_name = raw.type_info().name().to_string();
        let value = match type_name.as_str() {
            "INTEGER" | "INT8" => row
                .try_get::<i64, _>(i)
                .map(DbValue::Int)
                .unwrap_or(DbValue::Null),
            "REAL" => row
                .try_get::<f64, _>(i)
                .map(DbValue::Float)
                .unwrap_or(DbValue::Null),
            "BOOLEAN" => row
                .try_get::<bool, _>(i)
                .map(DbValue::Bool)
                .unwrap_or(DbValue::Null),
            "BLOB" => row
                .try_get::<Vec<u8>, _>(i)
                .map(DbValue::Bytes)
                .unwrap_or(DbValue::Null),
            _ => row
                .try_get::<String, _>(i)
                .map(DbValue::String)
                .unwrap_or(DbValue::Null),
        };

        map.insert(name, value);
    }

    map
}

/// Convert PostgreSQL row to an ordered map
///
/// Date/time, numeric, UUID and JSON columns come back as their text form
/// so the mapper casts can read them. A column that does not decode fails
/// the whole row.
fn pg_row_to_map(row: &PgRow) -> std::result::Result<Row, sqlx::Error> {
    let mut map = Row::with_capacity(row.columns().len());

    for (i, column) in row.columns().iter().enumerate() {
        let value: DbValue = match column.type_info().name() {
            "INT2" => row.try_get::<Option<i16>, _>(i)?.map(i64::from).into(),
            "INT4" => row.try_get::<Option<i32>, _>(i)?.map(i64::from).into(),
            "INT8" => row.try_get::<Option<i64>, _>(i)?.into(),
            "FLOAT4" => row.try_get::<Option<f32>, _>(i)?.map(f64::from).into(),
            "FLOAT8" => row.try_get::<Option<f64>, _>(i)?.into(),
            "BOOL" => row.try_get::<Option<bool>, _>(i)?.into(),
            "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(i)?.into(),
            "DATE" => row
                .try_get::<Option<NaiveDate>, _>(i)?
                .map(|d| d.to_string())
                .into(),
            "TIME" => row
                .try_get::<Option<NaiveTime>, _>(i)?
                .map(|t| t.to_string())
                .into(),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(i)?
                .map(|d| d.to_string())
                .into(),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(i)?
                .map(|d| d.to_rfc3339())
                .into(),
            "NUMERIC" => row
                .try_get::<Option<Decimal>, _>(i)?
                .map(|n| n.to_string())
                .into(),
            "UUID" => row
                .try_get::<Option<Uuid>, _>(i)?
                .map(|u| u.to_string())
                .into(),
            "JSON" | "JSONB" => row
                .try_get::<Option<JsonValue>, _>(i)?
                .map(|v| v.to_string())
                .into(),
            _ => row.try_get::<Option<String>, _>(i)?.into(),
        };

        map.insert(column.name().to_string(), value);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = r#"CREATE TABLE "demo" (
    "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    "name" VARCHAR(64) NOT NULL,
    "hint" VARCHAR(255) NULL
)"#;

    fn demo() -> Connection {
        Connection::new(ConnectionConfig::new("sqlite::memory:").script(DEMO)).unwrap()
    }

    fn row(pairs: &[(&str, DbValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn names(names: &[&str]) -> Vec<Row> {
        names.iter().map(|n| row(&[("name", (*n).into())])).collect()
    }

    #[test]
    fn test_unsupported_driver() {
        let result = Connection::open("oracle://localhost/app");
        assert!(matches!(result, Err(Error::UnsupportedDriver { .. })));
    }

    #[test]
    fn test_name_from_dsn() {
        assert_eq!(Connection::open("sqlite::memory:").unwrap().name(), None);
        assert_eq!(
            Connection::open("pgsql:host=localhost;dbname=app")
                .unwrap()
                .name()
                .as_deref(),
            Some("app")
        );
        assert_eq!(
            Connection::open("postgres://user@localhost:5432/shop?sslmode=disable")
                .unwrap()
                .name()
                .as_deref(),
            Some("shop")
        );

        let spaced = Connection::open("sqlite:file.db?database=my\\ app").unwrap();
        assert_eq!(spaced.name().as_deref(), Some("my app"));
        assert_eq!(spaced.name().as_deref(), Some("my app"));
    }

    #[test]
    fn test_numbered_placeholders() {
        assert_eq!(
            numbered_placeholders("SELECT * FROM t WHERE a = ? AND b = '?' AND c = ?"),
            "SELECT * FROM t WHERE a = $1 AND b = '?' AND c = $2"
        );
        assert!(matches!(numbered_placeholders("SELECT 1"), Cow::Borrowed(_)));
    }

    #[tokio::test]
    async fn test_db_info() {
        let mut db = demo();
        assert!(!db.exists("unknown").await);
        assert!(db.exists("demo").await);
        assert!(db.version().await.unwrap().is_some());
        assert_eq!(db.driver().name(), "sqlite");
        assert_eq!(db.builder().driver(), Driver::Sqlite);
    }

    #[tokio::test]
    async fn test_db_manipulation() {
        let mut db = demo();
        let none = SelectOptions::new();

        assert!(db.select("demo", None, &none).await.unwrap().is_empty());
        assert_eq!(db.count("demo", None, &none).await.unwrap(), 0);
        assert!(db.select_one("demo", None, &none).await.unwrap().is_none());

        let data = row(&[("name", "foo".into()), ("hint", "bar".into())]);
        assert_eq!(db.insert("demo", &data, None).await.unwrap(), Written::Affected(1));
        assert_eq!(
            db.insert_batch("demo", &names(&["qux", "quux"]), None).await.unwrap(),
            Written::Affected(2)
        );

        let loaded = db
            .insert("demo", &row(&[("name", "load1".into())]), Some("id"))
            .await
            .unwrap();
        assert_eq!(
            loaded.row(),
            Some(&row(&[("id", 4.into()), ("name", "load1".into()), ("hint", DbValue::Null)]))
        );

        let batch = db
            .insert_batch(
                "demo",
                &names(&["batch1", "batch2"]),
                Some("id > 4".into()),
            )
            .await
            .unwrap();
        assert_eq!(
            batch.rows().map(<[Row]>::len),
            Some(2)
        );

        assert_eq!(db.select("demo", None, &none).await.unwrap().len(), 6);
        assert_eq!(db.count("demo", None, &none).await.unwrap(), 6);
        assert_eq!(
            db.select_one("demo", None, &none).await.unwrap(),
            Some(row(&[("id", 1.into()), ("name", "foo".into()), ("hint", "bar".into())]))
        );

        let updated = db
            .update(
                "demo",
                &row(&[("name", "qux update".into())]),
                Some(Criteria::new("name = ?").bind("qux")),
                false,
            )
            .await
            .unwrap();
        assert_eq!(updated, Written::Affected(1));

        let reloaded = db
            .update(
                "demo",
                &row(&[("name", "qux update2".into())]),
                Some("id = 2".into()),
                true,
            )
            .await
            .unwrap();
        assert_eq!(
            reloaded.row(),
            Some(&row(&[("id", 2.into()), ("name", "qux update2".into()), ("hint", DbValue::Null)]))
        );

        assert_eq!(
            db.delete("demo", Some("id > 3".into())).await.unwrap(),
            Written::Affected(3)
        );
        assert_eq!(db.count("demo", None, &none).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let broken = r#"CREATE TABLE "demo" ("id" INTEGER NOT NULL AUTOINCREMENT)"#;
        let mut db =
            Connection::new(ConnectionConfig::new("sqlite::memory:").script(broken)).unwrap();

        let err = db.connect().await.unwrap_err();
        assert_eq!(err.to_string(), "Unable to connect database");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_invalid_query_fails_to_prepare() {
        let mut db = demo();
        let result = db
            .insert("demo", &row(&[("foo", "bar".into())]), None)
            .await;
        assert!(matches!(result, Err(Error::Prepare { .. })));
    }

    #[tokio::test]
    async fn test_execution_failure_is_not_an_error() {
        let mut db = demo();
        let failed = db
            .insert("demo", &row(&[("name", DbValue::Null)]), None)
            .await
            .unwrap();
        assert!(failed.is_failed());

        let affected = db
            .exec("INSERT INTO demo (name) VALUES (?)", &[DbValue::Null])
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_transaction_commits() {
        let mut db = demo();
        let actual = db
            .transact(|db| {
                Box::pin(async move {
                    db.exec("insert into demo (name) values ('foo')", &[]).await
                })
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(actual, 1);
        assert!(!db.in_transaction());
        assert_eq!(db.count("demo", None, &SelectOptions::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_failure() {
        let mut db = demo();
        db.transact(|db| {
            Box::pin(async move {
                db.exec("insert into demo (name) values ('foo')", &[]).await?;
                db.exec("insert into demo (name) values (?)", &[DbValue::Null]).await
            })
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(db.count("demo", None, &SelectOptions::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_prepare_failure() {
        let mut db = demo();
        let inner = db
            .transact(|db| {
                Box::pin(async move {
                    db.exec("insert into demo (name) values ('foo')", &[]).await?;
                    db.exec("insert into nosuch (name) values ('bar')", &[]).await
                })
            })
            .await
            .unwrap();

        assert!(matches!(inner, Err(Error::Prepare { .. })));
        assert!(!db.in_transaction());
        assert_eq!(db.count("demo", None, &SelectOptions::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transaction_begin_failure() {
        let mut db = demo();
        db.exec("BEGIN", &[]).await.unwrap();

        let result = db
            .transact(|db| Box::pin(async move { db.exec("insert into demo (name) values ('foo')", &[]).await }))
            .await;

        assert!(matches!(
            result,
            Err(Error::Transaction {
                statement: "BEGIN",
                ..
            })
        ));
        assert!(!db.in_transaction());
    }

    #[tokio::test]
    async fn test_nested_transaction_is_pass_through() {
        let mut db = demo();
        db.transact(|db| {
            Box::pin(async move {
                db.exec("insert into demo (name) values ('outer')", &[]).await?;
                db.transact(|db| {
                    Box::pin(async move {
                        assert!(db.in_transaction());
                        db.exec("insert into demo (name) values ('inner')", &[]).await
                    })
                })
                .await?
            })
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(db.count("demo", None, &SelectOptions::new()).await.unwrap(), 2);
    }

    async fn seeded() -> Connection {
        let mut db = demo();
        let written = db
            .insert_batch("demo", &names(&["row1", "row2", "row3", "row4", "row5"]), None)
            .await
            .unwrap();
        assert_eq!(written, Written::Affected(5));
        db
    }

    #[tokio::test]
    async fn test_simple_paginate() {
        let cases: [(u64, Option<&str>, u64, [u64; 5]); 5] = [
            // page, filter, limit, [count, current, next, prev, per_page]
            (1, None, 0, [5, 1, 2, 0, 20]),
            (1, Some("name = 'row1'"), 0, [1, 1, 2, 0, 20]),
            (2, None, 0, [0, 2, 3, 1, 20]),
            (1, None, 2, [2, 1, 2, 0, 2]),
            (3, None, 2, [1, 3, 4, 2, 2]),
        ];

        for (page, filter, limit, expected) in cases {
            let mut db = seeded().await;
            let options = SelectOptions::new().limit(limit);
            let actual = db
                .simple_paginate("demo", page, filter.map(Criteria::new), &options)
                .await
                .unwrap();

            assert_eq!(
                [
                    actual.count,
                    actual.current_page,
                    actual.next_page,
                    actual.prev_page,
                    actual.per_page
                ],
                expected
            );
            assert_eq!(actual.subset.len() as u64, expected[0]);
        }
    }

    #[tokio::test]
    async fn test_paginate() {
        let cases: [(u64, Option<&str>, u64, [u64; 9]); 5] = [
            // page, filter, limit, [count, current, next, prev, last_page, total, first, last, per_page]
            (1, None, 0, [5, 1, 1, 0, 1, 5, 1, 5, 20]),
            (1, Some("name = 'row1'"), 0, [1, 1, 1, 0, 1, 1, 1, 1, 20]),
            (2, None, 0, [0, 2, 1, 1, 1, 5, 21, 21, 20]),
            (1, None, 2, [2, 1, 2, 0, 3, 5, 1, 2, 2]),
            (3, None, 2, [1, 3, 3, 2, 3, 5, 5, 5, 2]),
        ];

        for (page, filter, limit, expected) in cases {
            let mut db = seeded().await;
            let options = SelectOptions::new().limit(limit);
            let actual = db
                .paginate("demo", page, filter.map(Criteria::new), &options)
                .await
                .unwrap();

            assert_eq!(
                [
                    actual.count,
                    actual.current_page,
                    actual.next_page,
                    actual.prev_page,
                    actual.last_page,
                    actual.total,
                    actual.first,
                    actual.last,
                    actual.per_page
                ],
                expected
            );
            assert_eq!(actual.subset.len() as u64, expected[0]);
        }
    }
}
