//! # Mapper
//!
//! A dirty-tracking row cursor bound to one table.
//!
//! ```ignore
//! let mut users = Mapper::new(&mut db, "users").auto_key("id").cast("id", Cast::Int);
//!
//! users.find([42]).await?;
//! users.set("name", "Ada")?;
//! users.save().await?;
//! ```
//!
//! Loaded rows are kept as read from the database. Writes go to a change
//! buffer keyed by cursor position (the invalid position included, which is
//! where a new row collects its values), so `dry`/`dirty`/`changes` only
//! ever describe what has not been saved yet.
//!
//! Column access is checked first against the ignore-list
//! (`Error::ForbiddenColumn`), then against the load-list when one is set
//! (`Error::UnknownColumn`).

use crate::builder::{Criteria, SelectOptions};
use crate::database::{Connection, Page, SimplePage, Written};
use crate::error::{Error, Result};
use crate::json::to_json;
use crate::types::{cast_in, cast_out, Cast, DbValue, Row, Value};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

/// A row as seen through the mapper's casts
pub type Record = IndexMap<String, Value>;

/// Outcome of [`Mapper::save`]
#[derive(Debug, Clone, PartialEq)]
pub enum SaveResult {
    /// The statement failed to execute
    Failed,
    /// Saved, but no reload criteria was available (or the reload found nothing)
    Affected(u64),
    /// Saved and reloaded; the cursor points at this row
    Reloaded(Row),
}

impl SaveResult {
    /// Returns false for `Failed`
    #[must_use]
    pub fn is_saved(&self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Row cursor over one table
pub struct Mapper<'c> {
    db: &'c mut Connection,
    table: String,
    keys: Vec<(String, bool)>,
    casts: HashMap<String, Cast>,
    load: Vec<String>,
    ignore: Vec<String>,
    rows: Vec<Row>,
    ptr: Option<usize>,
    updates: HashMap<Option<usize>, Record>,
}

impl<'c> Mapper<'c> {
    /// Create a mapper over `table`
    pub fn new(db: &'c mut Connection, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            keys: Vec::new(),
            casts: HashMap::new(),
            load: Vec::new(),
            ignore: Vec::new(),
            rows: Vec::new(),
            ptr: None,
            updates: HashMap::new(),
        }
    }

    /// Add a key column
    #[must_use]
    pub fn key(mut self, column: impl Into<String>) -> Self {
        self.keys.push((column.into(), false));
        self
    }

    /// Add a key column generated by the database on insert
    #[must_use]
    pub fn auto_key(mut self, column: impl Into<String>) -> Self {
        self.keys.push((column.into(), true));
        self
    }

    /// Set the cast directive of a column
    #[must_use]
    pub fn cast(mut self, column: impl Into<String>, cast: Cast) -> Self {
        self.casts.insert(column.into(), cast);
        self
    }

    /// Restrict access to these columns; also the default select list
    #[must_use]
    pub fn load_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Forbid access to these columns
    #[must_use]
    pub fn ignore_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Table name
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Key columns with their auto-increment flag
    #[must_use]
    pub fn keys(&self) -> &[(String, bool)] {
        &self.keys
    }

    /// Underlying connection
    pub fn connection(&mut self) -> &mut Connection {
        self.db
    }

    fn check(&self, column: &str) -> Result<()> {
        if self.ignore.iter().any(|c| c == column) {
            return Err(Error::ForbiddenColumn {
                column: column.to_string(),
            });
        }

        if !self.load.is_empty() && !self.load.iter().any(|c| c == column) {
            return Err(Error::UnknownColumn {
                column: column.to_string(),
            });
        }

        Ok(())
    }

    fn cast_of(&self, column: &str) -> Option<Cast> {
        self.casts.get(column).copied()
    }

    fn select_options(&self, options: &SelectOptions) -> SelectOptions {
        let mut options = options.clone();
        if options.columns.is_empty() {
            options.columns = self.load.iter().map(|c| c.as_str().into()).collect();
        }
        options
    }

    fn key_criteria(&self, values: &[DbValue]) -> Criteria {
        let expr = self
            .keys
            .iter()
            .map(|(column, _)| format!("{} = ?", self.db.quote(column)))
            .collect::<Vec<_>>()
            .join(" AND ");

        Criteria::with(expr, values.to_vec())
    }

    /// Load every matching row and point at the first one
    ///
    /// # Errors
    ///
    /// See [`Connection::select`].
    pub async fn find_all(
        &mut self,
        criteria: Option<Criteria>,
        options: &SelectOptions,
    ) -> Result<&mut Self> {
        let options = self.select_options(options);
        let rows = self.db.select(&self.table, criteria, &options).await?;
        debug!(table = %self.table, rows = rows.len(), "mapper loaded");

        self.ptr = if rows.is_empty() { None } else { Some(0) };
        self.rows = rows;
        self.updates.clear();
        Ok(self)
    }

    /// Load the first matching row
    ///
    /// # Errors
    ///
    /// See [`Connection::select`].
    pub async fn find_one(
        &mut self,
        criteria: Option<Criteria>,
        options: &SelectOptions,
    ) -> Result<&mut Self> {
        let options = options.clone().limit(1);
        self.find_all(criteria, &options).await
    }

    /// Load a row by its key values, in key order
    ///
    /// # Errors
    ///
    /// Returns `Error::InsufficientKeys` when fewer values than keys are
    /// given, otherwise see [`Connection::select`].
    pub async fn find<I, V>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<DbValue>,
    {
        let values: Vec<DbValue> = values.into_iter().map(Into::into).collect();
        if values.len() < self.keys.len() {
            return Err(Error::InsufficientKeys {
                expected: self.keys.len(),
                given: values.len(),
            });
        }

        let criteria = self.key_criteria(&values[..self.keys.len()]);
        self.find_one(Some(criteria), &SelectOptions::new()).await
    }

    /// Number of matching rows in the table
    ///
    /// # Errors
    ///
    /// See [`Connection::count`].
    pub async fn count_rows(
        &mut self,
        criteria: Option<Criteria>,
        options: &SelectOptions,
    ) -> Result<u64> {
        self.db.count(&self.table, criteria, options).await
    }

    /// Cursor points at a loaded row
    #[must_use]
    pub fn valid(&self) -> bool {
        self.ptr.is_some_and(|i| i < self.rows.len())
    }

    /// Opposite of [`Mapper::valid`]
    #[must_use]
    pub fn invalid(&self) -> bool {
        !self.valid()
    }

    /// Cursor position
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        self.ptr.filter(|&i| i < self.rows.len())
    }

    /// Move to the first row
    pub fn rewind(&mut self) -> &mut Self {
        self.ptr = if self.rows.is_empty() { None } else { Some(0) };
        self
    }

    /// Move to the next row; past the end the cursor becomes invalid
    pub fn advance(&mut self) -> &mut Self {
        self.ptr = self.ptr.map(|i| i + 1).filter(|&i| i < self.rows.len());
        self
    }

    /// Current row with casts and pending changes applied
    #[must_use]
    pub fn current(&self) -> Option<Record> {
        self.position().map(|i| self.record_at(Some(i)))
    }

    /// Number of loaded rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// No rows loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Clear rows, cursor and pending changes
    pub fn reset(&mut self) -> &mut Self {
        self.rows.clear();
        self.ptr = None;
        self.updates.clear();
        self
    }

    fn slot(&self) -> Option<usize> {
        self.position()
    }

    fn record_at(&self, slot: Option<usize>) -> Record {
        let mut record: Record = slot
            .and_then(|i| self.rows.get(i))
            .map(|row| {
                row.iter()
                    .map(|(column, value)| (column.clone(), cast_out(value, self.cast_of(column))))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(changes) = self.updates.get(&slot) {
            for (column, value) in changes {
                record.insert(column.clone(), value.clone());
            }
        }

        record
    }

    /// Read a column of the current row
    ///
    /// # Errors
    ///
    /// `Error::ForbiddenColumn` or `Error::UnknownColumn`.
    pub fn get(&self, column: &str) -> Result<Value> {
        self.check(column)?;

        let slot = self.slot();
        if let Some(value) = self.updates.get(&slot).and_then(|c| c.get(column)) {
            return Ok(value.clone());
        }

        Ok(slot
            .and_then(|i| self.rows[i].get(column))
            .map_or(Value::Null, |value| cast_out(value, self.cast_of(column))))
    }

    /// Whether the current row (or its pending changes) has the column
    #[must_use]
    pub fn has(&self, column: &str) -> bool {
        if self.check(column).is_err() {
            return false;
        }

        let slot = self.slot();
        self.updates
            .get(&slot)
            .is_some_and(|c| c.contains_key(column))
            || slot.is_some_and(|i| self.rows[i].contains_key(column))
    }

    /// Stage a new value for a column of the current row
    ///
    /// # Errors
    ///
    /// `Error::ForbiddenColumn` or `Error::UnknownColumn`.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.check(column)?;

        let slot = self.slot();
        self.updates
            .entry(slot)
            .or_default()
            .insert(column.to_string(), value.into());
        Ok(self)
    }

    /// Drop the staged change of a column; loaded values are untouched
    ///
    /// # Errors
    ///
    /// `Error::ForbiddenColumn` or `Error::UnknownColumn`.
    pub fn unset(&mut self, column: &str) -> Result<&mut Self> {
        self.check(column)?;

        let slot = self.slot();
        if let Some(changes) = self.updates.get_mut(&slot) {
            changes.shift_remove(column);
            if changes.is_empty() {
                self.updates.remove(&slot);
            }
        }
        Ok(self)
    }

    /// Stage several columns at once
    ///
    /// # Errors
    ///
    /// See [`Mapper::set`].
    pub fn fill<I, K, V>(&mut self, data: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (column, value) in data {
            self.set(column.as_ref(), value)?;
        }
        Ok(self)
    }

    /// No pending changes at the cursor
    #[must_use]
    pub fn dry(&self) -> bool {
        !self.updates.get(&self.slot()).is_some_and(|c| !c.is_empty())
    }

    /// Pending changes at the cursor
    #[must_use]
    pub fn dirty(&self) -> bool {
        !self.dry()
    }

    /// Staged values at the cursor
    #[must_use]
    pub fn changes(&self) -> Record {
        self.updates.get(&self.slot()).cloned().unwrap_or_default()
    }

    /// Current row as a record; pending values only when the cursor is invalid
    #[must_use]
    pub fn to_array(&self) -> Record {
        self.record_at(self.slot())
    }

    /// Every loaded row as a record
    pub fn iter(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.rows.len()).map(|i| self.record_at(Some(i)))
    }

    /// Every loaded row as a record
    #[must_use]
    pub fn all(&self) -> Vec<Record> {
        self.iter().collect()
    }

    /// Every loaded row as a JSON array
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if a value cannot be encoded.
    pub fn to_json(&self) -> Result<String> {
        to_json(&self.all())
    }

    /// Persist pending changes of the current row
    ///
    /// A valid cursor updates the row matched by its persisted key values;
    /// an invalid cursor inserts. Either way the row is then reloaded by key
    /// when the key values are known.
    ///
    /// # Errors
    ///
    /// `Error::NothingToSave` without pending changes, `Error::MissingKeys`
    /// when updating without keys, otherwise see [`Connection::update`] and
    /// [`Connection::insert`].
    pub async fn save(&mut self) -> Result<SaveResult> {
        let slot = self.slot();
        let changes = match self.updates.get(&slot) {
            Some(changes) if !changes.is_empty() => changes.clone(),
            _ => return Err(Error::NothingToSave),
        };

        let data: Row = changes
            .iter()
            .map(|(column, value)| (column.clone(), cast_in(value, self.cast_of(column))))
            .collect();

        let (written, reload) = match slot {
            Some(i) => {
                if self.keys.is_empty() {
                    return Err(Error::MissingKeys {
                        table: self.table.clone(),
                    });
                }

                let row = &self.rows[i];
                let persisted: Vec<DbValue> = self
                    .keys
                    .iter()
                    .map(|(column, _)| row.get(column).cloned().unwrap_or(DbValue::Null))
                    .collect();
                let current: Vec<DbValue> = self
                    .keys
                    .iter()
                    .zip(&persisted)
                    .map(|((column, _), value)| data.get(column).unwrap_or(value).clone())
                    .collect();

                let criteria = self.key_criteria(&persisted);
                let written = self.db.update(&self.table, &data, Some(criteria), false).await?;
                (written, Some(self.key_criteria(&current)))
            }
            None => {
                let written = self.db.insert(&self.table, &data, None).await?;
                let reload = if written.is_failed() || self.keys.is_empty() {
                    None
                } else {
                    self.inserted_keys(&data).await
                };
                (written, reload.map(|values| self.key_criteria(&values)))
            }
        };

        let affected = match written {
            Written::Affected(n) => n,
            Written::Failed => return Ok(SaveResult::Failed),
            _ => 0,
        };
        debug!(table = %self.table, affected, "mapper saved");

        self.updates.remove(&slot);
        if let (Some(i), None) = (slot, &reload) {
            self.rows[i].extend(data);
        }

        let Some(criteria) = reload else {
            return Ok(SaveResult::Affected(affected));
        };

        self.find_one(Some(criteria), &SelectOptions::new()).await?;
        Ok(match self.slot() {
            Some(i) => SaveResult::Reloaded(self.rows[i].clone()),
            None => SaveResult::Affected(affected),
        })
    }

    async fn inserted_keys(&mut self, data: &Row) -> Option<Vec<DbValue>> {
        let mut values = Vec::with_capacity(self.keys.len());

        for i in 0..self.keys.len() {
            let (column, auto) = &self.keys[i];
            let value = if *auto {
                self.db.last_insert_id().await.map(DbValue::Int)
            } else {
                data.get(column).cloned()
            };
            values.push(value?);
        }

        Some(values)
    }

    /// Select rows from the table
    ///
    /// # Errors
    ///
    /// See [`Connection::select`].
    pub async fn select(
        &mut self,
        criteria: Option<Criteria>,
        options: &SelectOptions,
    ) -> Result<Vec<Row>> {
        let options = self.select_options(options);
        self.db.select(&self.table, criteria, &options).await
    }

    /// Select the first matching row from the table
    ///
    /// # Errors
    ///
    /// See [`Connection::select_one`].
    pub async fn select_one(
        &mut self,
        criteria: Option<Criteria>,
        options: &SelectOptions,
    ) -> Result<Option<Row>> {
        let options = self.select_options(options);
        self.db.select_one(&self.table, criteria, &options).await
    }

    /// Insert a row into the table
    ///
    /// # Errors
    ///
    /// See [`Connection::insert`].
    pub async fn insert(&mut self, data: &Row, load: Option<&str>) -> Result<Written> {
        self.db.insert(&self.table, data, load).await
    }

    /// Update rows of the table
    ///
    /// # Errors
    ///
    /// See [`Connection::update`].
    pub async fn update(
        &mut self,
        data: &Row,
        criteria: Option<Criteria>,
        reload: bool,
    ) -> Result<Written> {
        self.db.update(&self.table, data, criteria, reload).await
    }

    /// Delete rows of the table
    ///
    /// # Errors
    ///
    /// See [`Connection::delete`].
    pub async fn delete(&mut self, criteria: Option<Criteria>) -> Result<Written> {
        self.db.delete(&self.table, criteria).await
    }

    /// Insert several rows into the table
    ///
    /// # Errors
    ///
    /// See [`Connection::insert_batch`].
    pub async fn insert_batch(&mut self, rows: &[Row], reload: Option<Criteria>) -> Result<Written> {
        self.db.insert_batch(&self.table, rows, reload).await
    }

    /// Page of the table with totals
    ///
    /// # Errors
    ///
    /// See [`Connection::paginate`].
    pub async fn paginate(
        &mut self,
        page: u64,
        criteria: Option<Criteria>,
        options: &SelectOptions,
    ) -> Result<Page> {
        let options = self.select_options(options);
        self.db.paginate(&self.table, page, criteria, &options).await
    }

    /// Page of the table without totals
    ///
    /// # Errors
    ///
    /// See [`Connection::simple_paginate`].
    pub async fn simple_paginate(
        &mut self,
        page: u64,
        criteria: Option<Criteria>,
        options: &SelectOptions,
    ) -> Result<SimplePage> {
        let options = self.select_options(options);
        self.db
            .simple_paginate(&self.table, page, criteria, &options)
            .await
    }
}
