//! # SQL Statement Builder
//!
//! Pure functions of `(table, criteria, options)` producing SQL text and a
//! flat, ordered list of bound values. No I/O.
//!
//! ## Identifiers
//!
//! Identifiers are quoted per dot-separated segment (`foo.bar` becomes
//! `"foo"."bar"`). Expressions starting with the raw marker (default
//! `` ``` ``) are emitted verbatim, e.g. `` ```COUNT(*) ``.
//!
//! ## Pagination dialects
//!
//! - default: `LIMIT n OFFSET m` appended
//! - SQL Server: `TOP n` before the column list without an offset, else
//!   `OFFSET m ROWS FETCH NEXT n ROWS ONLY`; both need an ORDER BY

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::types::{DbValue, Row};
use std::fmt;

/// SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Driver {
    /// SQLite
    #[default]
    Sqlite,
    /// PostgreSQL
    Postgres,
    /// MySQL / MariaDB
    MySql,
    /// Microsoft SQL Server
    SqlServer,
}

impl Driver {
    /// Parse a driver name or DSN scheme
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "pgsql" | "postgres" | "postgresql" => Some(Self::Postgres),
            "mysql" | "mariadb" => Some(Self::MySql),
            "sqlsrv" | "mssql" | "sqlserver" => Some(Self::SqlServer),
            _ => None,
        }
    }

    /// Driver name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "pgsql",
            Self::MySql => "mysql",
            Self::SqlServer => "sqlsrv",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Filter expression with its bound values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    /// SQL expression, `?` placeholders
    pub expr: String,
    /// Values for the placeholders, in order
    pub values: Vec<DbValue>,
}

impl Criteria {
    /// Expression without bound values
    #[must_use]
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            values: Vec::new(),
        }
    }

    /// Expression with bound values
    #[must_use]
    pub fn with(expr: impl Into<String>, values: Vec<DbValue>) -> Self {
        Self {
            expr: expr.into(),
            values,
        }
    }

    /// Bind one more value
    #[must_use]
    pub fn bind(mut self, value: impl Into<DbValue>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Whether the expression is blank
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expr.trim().is_empty()
    }
}

impl From<&str> for Criteria {
    fn from(expr: &str) -> Self {
        Self::new(expr)
    }
}

impl From<String> for Criteria {
    fn from(expr: String) -> Self {
        Self::new(expr)
    }
}

/// Selected column, optionally aliased
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column expression
    pub expr: String,
    /// `AS` alias
    pub alias: Option<String>,
}

impl Column {
    /// Aliased column
    #[must_use]
    pub fn aliased(expr: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: Some(alias.into()),
        }
    }
}

impl From<&str> for Column {
    fn from(expr: &str) -> Self {
        Self {
            expr: expr.to_string(),
            alias: None,
        }
    }
}

impl From<String> for Column {
    fn from(expr: String) -> Self {
        Self { expr, alias: None }
    }
}

/// ORDER BY / GROUP BY entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Column expression
    pub expr: String,
    /// Direction (`asc`, `desc`); emitted upper-cased
    pub direction: Option<String>,
}

impl Order {
    /// Entry with an explicit direction
    #[must_use]
    pub fn new(expr: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            direction: Some(direction.into()),
        }
    }
}

impl From<&str> for Order {
    fn from(expr: &str) -> Self {
        Self {
            expr: expr.to_string(),
            direction: None,
        }
    }
}

/// Options of a select statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    /// Column list (`*` when empty)
    pub columns: Vec<Column>,
    /// Join clauses
    pub joins: Vec<String>,
    /// GROUP BY entries
    pub groups: Vec<Order>,
    /// HAVING filter
    pub having: Option<Criteria>,
    /// ORDER BY entries
    pub orders: Vec<Order>,
    /// Row limit (0 means none)
    pub limit: u64,
    /// Row offset (0 means none)
    pub offset: u64,
    /// Table alias
    pub alias: Option<String>,
    /// Treat the table argument as a sub-query
    pub sub: bool,
}

impl SelectOptions {
    /// Empty options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column
    #[must_use]
    pub fn column(mut self, column: impl Into<Column>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Add an aliased column
    #[must_use]
    pub fn column_as(mut self, expr: impl Into<String>, alias: impl Into<String>) -> Self {
        self.columns.push(Column::aliased(expr, alias));
        self
    }

    /// Add a join clause
    #[must_use]
    pub fn join(mut self, join: impl Into<String>) -> Self {
        self.joins.push(join.into());
        self
    }

    /// Add a GROUP BY entry
    #[must_use]
    pub fn group(mut self, group: impl Into<Order>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Set the HAVING filter
    #[must_use]
    pub fn having(mut self, having: impl Into<Criteria>) -> Self {
        self.having = Some(having.into());
        self
    }

    /// Add an ORDER BY entry
    #[must_use]
    pub fn order(mut self, order: impl Into<Order>) -> Self {
        self.orders.push(order.into());
        self
    }

    /// Add an ORDER BY entry with direction
    #[must_use]
    pub fn order_by(mut self, expr: impl Into<String>, direction: impl Into<String>) -> Self {
        self.orders.push(Order::new(expr, direction));
        self
    }

    /// Set the limit
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Set the offset
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Set the table alias
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Treat the table argument as a sub-query
    #[must_use]
    pub fn sub(mut self) -> Self {
        self.sub = true;
        self
    }
}

/// SQL text and its bound values
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text, `?` placeholders
    pub sql: String,
    /// Bound values in placeholder order
    pub values: Vec<DbValue>,
}

/// SQL statement builder
#[derive(Debug, Clone)]
pub struct Builder {
    driver: Driver,
    quotes: (String, String),
    raw_identifier: String,
    delimiter: &'static str,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new(Driver::default())
    }
}

impl Builder {
    /// Builder with default quoting (`"`), raw marker and single-line output
    #[must_use]
    pub fn new(driver: Driver) -> Self {
        Self {
            driver,
            quotes: ("\"".to_string(), "\"".to_string()),
            raw_identifier: "```".to_string(),
            delimiter: " ",
        }
    }

    /// Builder taking quoting, raw marker and formatting from a connection config
    #[must_use]
    pub fn from_config(driver: Driver, config: &ConnectionConfig) -> Self {
        Self::new(driver)
            .with_quotes(&config.quotes.0, &config.quotes.1)
            .with_raw_identifier(&config.raw_identifier)
            .with_format(config.format_query)
    }

    /// Set the identifier quote pair; an empty closing quote reuses the opening one
    #[must_use]
    pub fn with_quotes(mut self, open: &str, close: &str) -> Self {
        if !open.is_empty() {
            let close = if close.is_empty() { open } else { close };
            self.quotes = (open.to_string(), close.to_string());
        }
        self
    }

    /// Set the raw expression marker
    #[must_use]
    pub fn with_raw_identifier(mut self, marker: &str) -> Self {
        if !marker.is_empty() {
            self.raw_identifier = marker.to_string();
        }
        self
    }

    /// Join clauses with newlines instead of spaces
    #[must_use]
    pub fn with_format(mut self, format: bool) -> Self {
        self.delimiter = if format { "\n" } else { " " };
        self
    }

    /// SQL dialect
    #[must_use]
    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Quote an identifier, segment by segment
    #[must_use]
    pub fn quote(&self, expr: &str) -> String {
        let (open, close) = &self.quotes;
        format!(
            "{open}{}{close}",
            expr.replace('.', &format!("{close}.{open}"))
        )
    }

    /// Mark an expression as raw
    #[must_use]
    pub fn raw(&self, expr: &str) -> String {
        format!("{}{expr}", self.raw_identifier)
    }

    /// Whether an expression carries the raw marker
    #[must_use]
    pub fn is_raw(&self, expr: &str) -> bool {
        expr.starts_with(&self.raw_identifier)
    }

    /// Raw expression body, without the marker
    #[must_use]
    pub fn strip_raw<'e>(&self, expr: &'e str) -> Option<&'e str> {
        expr.strip_prefix(self.raw_identifier.as_str())
    }

    /// Quote an expression, prefixing unqualified names with `prefix`
    #[must_use]
    pub fn expr(&self, expr: &str, prefix: Option<&str>) -> String {
        if let Some(raw) = self.strip_raw(expr) {
            return raw.to_string();
        }

        match prefix {
            Some(prefix) if !expr.contains('.') => self.quote(&format!("{prefix}.{expr}")),
            _ => self.quote(expr),
        }
    }

    /// Column list
    #[must_use]
    pub fn columns(&self, columns: &[Column], prefix: Option<&str>, separator: &str) -> String {
        columns
            .iter()
            .map(|c| match &c.alias {
                Some(alias) => format!("{} AS {}", self.expr(&c.expr, prefix), self.quote(alias)),
                None => self.expr(&c.expr, prefix),
            })
            .collect::<Vec<_>>()
            .join(&format!(",{separator}"))
    }

    /// Join clauses; entries without a `JOIN` keyword get `JOIN ` prepended
    #[must_use]
    pub fn joins(&self, joins: &[String], separator: &str) -> String {
        joins
            .iter()
            .map(|join| {
                if join.to_ascii_uppercase().contains("JOIN ") {
                    join.clone()
                } else {
                    format!("JOIN {join}")
                }
            })
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// ORDER BY / GROUP BY list
    #[must_use]
    pub fn orders(&self, orders: &[Order], prefix: Option<&str>, separator: &str) -> String {
        orders
            .iter()
            .map(|o| match &o.direction {
                Some(direction) => format!(
                    "{} {}",
                    self.expr(&o.expr, prefix),
                    direction.to_uppercase()
                ),
                None => self.expr(&o.expr, prefix),
            })
            .collect::<Vec<_>>()
            .join(&format!(",{separator}"))
    }

    /// Pagination clause for `sql`; the flag is true when it goes before the column list
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingOrder` for SQL Server without an ORDER BY.
    pub fn offset(&self, limit: u64, offset: u64, sql: &str) -> Result<Option<(String, bool)>> {
        if limit == 0 && offset == 0 {
            return Ok(None);
        }

        if self.driver == Driver::SqlServer {
            if !sql.to_ascii_lowercase().contains("order by") {
                return Err(Error::MissingOrder);
            }

            if offset == 0 {
                return Ok(Some((format!("TOP {limit}"), true)));
            }

            return Ok(Some((
                format!("OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY"),
                false,
            )));
        }

        let limit = if limit > 0 {
            format!("LIMIT {limit}")
        } else {
            String::new()
        };
        let offset = if offset > 0 {
            format!("OFFSET {offset}")
        } else {
            String::new()
        };

        Ok(Some((format!("{limit} {offset}").trim().to_string(), false)))
    }

    /// SELECT statement
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingSubQueryAlias` for an unaliased sub-query and
    /// `Error::MissingOrder` for SQL Server pagination without ORDER BY.
    pub fn select(
        &self,
        table: &str,
        criteria: Option<&Criteria>,
        options: &SelectOptions,
    ) -> Result<Statement> {
        if options.sub && options.alias.is_none() {
            return Err(Error::MissingSubQueryAlias);
        }

        let lf = self.delimiter;
        let prefix = options
            .alias
            .as_deref()
            .or(if options.sub { None } else { Some(table) });
        let mut sql = String::new();
        let mut values = Vec::new();

        sql.push_str(lf);
        if options.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns(&options.columns, prefix, lf));
        }

        sql.push_str(lf);
        sql.push_str("FROM ");
        if options.sub {
            sql.push_str(&format!("({table})"));
        } else {
            sql.push_str(&self.quote(table));
        }

        if let Some(alias) = &options.alias {
            sql.push_str(&format!("{lf}AS {}", self.quote(alias)));
        }

        if !options.joins.is_empty() {
            sql.push_str(&format!("{lf}{}", self.joins(&options.joins, lf)));
        }

        if let Some(criteria) = criteria.filter(|c| !c.is_empty()) {
            sql.push_str(&format!("{lf}WHERE {}", criteria.expr));
            values.extend(criteria.values.iter().cloned());
        }

        if !options.groups.is_empty() {
            sql.push_str(&format!(
                "{lf}GROUP BY {}",
                self.orders(&options.groups, prefix, lf)
            ));
        }

        if let Some(having) = options.having.as_ref().filter(|c| !c.is_empty()) {
            sql.push_str(&format!("{lf}HAVING {}", having.expr));
            values.extend(having.values.iter().cloned());
        }

        if !options.orders.is_empty() {
            sql.push_str(&format!(
                "{lf}ORDER BY {}",
                self.orders(&options.orders, prefix, lf)
            ));
        }

        if let Some((line, top)) = self.offset(options.limit, options.offset, &sql)? {
            sql = if top {
                format!("{lf}{line}{sql}")
            } else {
                format!("{sql}{lf}{line}")
            };
        }

        Ok(Statement {
            sql: format!("SELECT{sql}"),
            values,
        })
    }

    /// `SELECT COUNT(*)` over the select, wrapped as a sub-query (orders dropped)
    ///
    /// # Errors
    ///
    /// See [`Builder::select`].
    pub fn count(
        &self,
        table: &str,
        criteria: Option<&Criteria>,
        options: &SelectOptions,
    ) -> Result<Statement> {
        let inner = SelectOptions {
            orders: Vec::new(),
            ..options.clone()
        };
        let inner = self.select(table, criteria, &inner)?;

        let outer = SelectOptions::new()
            .sub()
            .alias("_c")
            .column_as(self.raw("COUNT(*)"), "_d");
        let outer = self.select(&inner.sql, None, &outer)?;

        Ok(Statement {
            sql: outer.sql,
            values: inner.values,
        })
    }

    /// INSERT statement
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyBatch` when `data` has no columns.
    pub fn insert(&self, table: &str, data: &Row) -> Result<Statement> {
        if data.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let lf = self.delimiter;
        let columns = self.plain_columns(data.keys(), lf);

        Ok(Statement {
            sql: format!(
                "INSERT INTO {}{lf}({columns}){lf}VALUES{lf}({})",
                self.quote(table),
                placeholders(data.len())
            ),
            values: data.values().cloned().collect(),
        })
    }

    /// UPDATE statement; values are the new values followed by the criteria values
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` when `data` has no columns.
    pub fn update(&self, table: &str, data: &Row, criteria: Option<&Criteria>) -> Result<Statement> {
        if data.is_empty() {
            return Err(Error::InvalidArgument {
                message: "No data to be updated".to_string(),
            });
        }

        let lf = self.delimiter;
        let set = data
            .keys()
            .map(|column| self.quote(column))
            .collect::<Vec<_>>()
            .join(&format!(" = ?,{lf}"));

        let mut sql = format!("UPDATE {}{lf}SET {set} = ?", self.quote(table));
        let mut values: Vec<DbValue> = data.values().cloned().collect();

        if let Some(criteria) = criteria.filter(|c| !c.is_empty()) {
            sql.push_str(&format!("{lf}WHERE {}", criteria.expr));
            values.extend(criteria.values.iter().cloned());
        }

        Ok(Statement { sql, values })
    }

    /// DELETE statement
    #[must_use]
    pub fn delete(&self, table: &str, criteria: Option<&Criteria>) -> Statement {
        let mut sql = format!("DELETE FROM {}", self.quote(table));
        let mut values = Vec::new();

        if let Some(criteria) = criteria.filter(|c| !c.is_empty()) {
            sql.push_str(&format!("{}WHERE {}", self.delimiter, criteria.expr));
            values.extend(criteria.values.iter().cloned());
        }

        Statement { sql, values }
    }

    /// Multi-row INSERT statement; every row must have the first row's columns
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyBatch` without rows (or with an empty first row)
    /// and `Error::InvalidBatchRow` for the first row whose columns differ.
    pub fn insert_batch(&self, table: &str, rows: &[Row]) -> Result<Statement> {
        let Some(first) = rows.first().filter(|r| !r.is_empty()) else {
            return Err(Error::EmptyBatch);
        };

        let lf = self.delimiter;
        let line = format!("({})", placeholders(first.len()));
        let mut sql = format!(
            "INSERT INTO {}{lf}({}){lf}VALUES {line}",
            self.quote(table),
            self.plain_columns(first.keys(), " ")
        );
        let mut values = Vec::with_capacity(rows.len() * first.len());

        for (position, row) in rows.iter().enumerate() {
            if row.len() != first.len() || !first.keys().all(|k| row.contains_key(k)) {
                return Err(Error::InvalidBatchRow { position });
            }

            if position > 0 {
                sql.push_str(&format!(",{lf}{line}"));
            }

            values.extend(first.keys().map(|k| row[k].clone()));
        }

        Ok(Statement { sql, values })
    }

    fn plain_columns<'k>(&self, keys: impl Iterator<Item = &'k String>, separator: &str) -> String {
        keys.map(|k| self.expr(k, None))
            .collect::<Vec<_>>()
            .join(&format!(",{separator}"))
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, DbValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_quote() {
        let builder = Builder::default();
        assert_eq!(builder.quote("foo"), "\"foo\"");
        assert_eq!(builder.quote("foo.bar"), "\"foo\".\"bar\"");

        let builder = Builder::new(Driver::MySql).with_quotes("`", "");
        assert_eq!(builder.quote("foo.bar"), "`foo`.`bar`");

        let builder = Builder::new(Driver::SqlServer).with_quotes("[", "]");
        assert_eq!(builder.quote("dbo.users"), "[dbo].[users]");
    }

    #[test]
    fn test_raw_expressions() {
        let builder = Builder::default();
        let raw = builder.raw("COUNT(*)");
        assert!(builder.is_raw(&raw));
        assert!(!builder.is_raw("COUNT(*)"));
        assert_eq!(builder.expr(&raw, Some("foo")), "COUNT(*)");
        assert_eq!(builder.expr("id", Some("foo")), "\"foo\".\"id\"");
        assert_eq!(builder.expr("bar.id", Some("foo")), "\"bar\".\"id\"");
    }

    #[test]
    fn test_select_plain() {
        let builder = Builder::default();
        let stmt = builder.select("demo", None, &SelectOptions::new()).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM \"demo\"");
        assert!(stmt.values.is_empty());
    }

    #[test]
    fn test_select_full() {
        let builder = Builder::default();
        let options = SelectOptions::new()
            .column("id")
            .column_as("name", "label")
            .join("LEFT JOIN tags t ON t.demo_id = d.id")
            .join("owners o ON o.id = d.owner_id")
            .group("id")
            .having(Criteria::new("COUNT(t.id) > ?").bind(1))
            .order_by("name", "desc")
            .limit(5)
            .offset(10)
            .alias("d");

        let criteria = Criteria::new("d.active = ?").bind(true);
        let stmt = builder.select("demo", Some(&criteria), &options).unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT \"d\".\"id\", \"d\".\"name\" AS \"label\" FROM \"demo\" AS \"d\" \
             LEFT JOIN tags t ON t.demo_id = d.id JOIN owners o ON o.id = d.owner_id \
             WHERE d.active = ? GROUP BY \"d\".\"id\" HAVING COUNT(t.id) > ? \
             ORDER BY \"d\".\"name\" DESC LIMIT 5 OFFSET 10"
        );
        assert_eq!(stmt.values, vec![DbValue::Bool(true), DbValue::Int(1)]);
    }

    #[test]
    fn test_select_formatted() {
        let builder = Builder::default().with_format(true);
        let options = SelectOptions::new().column("id").column("name");
        let stmt = builder.select("demo", Some(&Criteria::new("id > 1")), &options).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT\n\"demo\".\"id\",\n\"demo\".\"name\"\nFROM \"demo\"\nWHERE id > 1"
        );
    }

    #[test]
    fn test_limit_only_and_offset_only() {
        let builder = Builder::default();
        let stmt = builder
            .select("demo", None, &SelectOptions::new().limit(3))
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM \"demo\" LIMIT 3");

        let stmt = builder
            .select("demo", None, &SelectOptions::new().offset(3))
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM \"demo\" OFFSET 3");
    }

    #[test]
    fn test_sub_query_needs_alias() {
        let builder = Builder::default();
        let result = builder.select("SELECT 1", None, &SelectOptions::new().sub());
        assert!(matches!(result, Err(Error::MissingSubQueryAlias)));
    }

    #[test]
    fn test_sub_query() {
        let builder = Builder::default();
        let options = SelectOptions::new().sub().alias("s").column("n");
        let stmt = builder.select("SELECT 1 AS n", None, &options).unwrap();
        assert_eq!(stmt.sql, "SELECT \"s\".\"n\" FROM (SELECT 1 AS n) AS \"s\"");
    }

    #[test]
    fn test_sql_server_pagination() {
        let builder = Builder::new(Driver::SqlServer);

        let result = builder.select("demo", None, &SelectOptions::new().limit(5));
        assert!(matches!(result, Err(Error::MissingOrder)));

        let stmt = builder
            .select("demo", None, &SelectOptions::new().order("id").limit(5))
            .unwrap();
        assert_eq!(stmt.sql, "SELECT TOP 5 * FROM \"demo\" ORDER BY \"demo\".\"id\"");

        let stmt = builder
            .select(
                "demo",
                None,
                &SelectOptions::new().order("id").limit(5).offset(10),
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"demo\" ORDER BY \"demo\".\"id\" OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn test_count() {
        let builder = Builder::default();
        let options = SelectOptions::new().order("id").limit(2);
        let stmt = builder
            .count("demo", Some(&Criteria::new("id > ?").bind(1)), &options)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS \"_d\" FROM (SELECT * FROM \"demo\" WHERE id > ? LIMIT 2) AS \"_c\""
        );
        assert_eq!(stmt.values, vec![DbValue::Int(1)]);
    }

    #[test]
    fn test_insert() {
        let builder = Builder::default();
        let data = row(&[("name", "foo".into()), ("hint", DbValue::Null)]);
        let stmt = builder.insert("demo", &data).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"demo\" (\"name\", \"hint\") VALUES (?, ?)"
        );
        assert_eq!(stmt.values, vec!["foo".into(), DbValue::Null]);

        assert!(matches!(builder.insert("demo", &Row::new()), Err(Error::EmptyBatch)));
    }

    #[test]
    fn test_update() {
        let builder = Builder::default();
        let data = row(&[("name", "bar".into()), ("hint", "baz".into())]);
        let criteria = Criteria::new("id = ?").bind(1);
        let stmt = builder.update("demo", &data, Some(&criteria)).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"demo\" SET \"name\" = ?, \"hint\" = ? WHERE id = ?"
        );
        assert_eq!(stmt.values, vec!["bar".into(), "baz".into(), DbValue::Int(1)]);
    }

    #[test]
    fn test_delete() {
        let builder = Builder::default();
        let stmt = builder.delete("demo", Some(&Criteria::new("id = ?").bind(3)));
        assert_eq!(stmt.sql, "DELETE FROM \"demo\" WHERE id = ?");
        assert_eq!(stmt.values, vec![DbValue::Int(3)]);

        let stmt = builder.delete("demo", None);
        assert_eq!(stmt.sql, "DELETE FROM \"demo\"");
    }

    #[test]
    fn test_insert_batch() {
        let builder = Builder::default();
        let rows = vec![
            row(&[("name", "a".into()), ("hint", "x".into())]),
            row(&[("hint", "y".into()), ("name", "b".into())]),
        ];
        let stmt = builder.insert_batch("demo", &rows).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"demo\" (\"name\", \"hint\") VALUES (?, ?), (?, ?)"
        );
        assert_eq!(
            stmt.values,
            vec!["a".into(), "x".into(), "b".into(), "y".into()]
        );
    }

    #[test]
    fn test_insert_batch_validation() {
        let builder = Builder::default();
        assert!(matches!(builder.insert_batch("demo", &[]), Err(Error::EmptyBatch)));

        let rows = vec![
            row(&[("name", "a".into())]),
            row(&[("name", "b".into())]),
            row(&[("title", "c".into())]),
        ];
        let err = builder.insert_batch("demo", &rows).unwrap_err();
        assert_eq!(err.to_string(), "Invalid data at position: 2");
    }

    #[test]
    fn test_driver_names() {
        assert_eq!(Driver::from_name("pgsql"), Some(Driver::Postgres));
        assert_eq!(Driver::from_name("SQLITE"), Some(Driver::Sqlite));
        assert_eq!(Driver::from_name("oracle"), None);
        assert_eq!(Driver::SqlServer.to_string(), "sqlsrv");
    }
}
