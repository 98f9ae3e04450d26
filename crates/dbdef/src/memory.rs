//! In-memory driver.
//!
//! Keeps table definitions and rows in a map. Useful as a test double and
//! for predicting what a plan does without a database.

use std::collections::BTreeMap;
use std::future::{self, Future};
use std::sync::{Mutex, MutexGuard};

use crate::column::Value;
use crate::diff::ChangePlan;
use crate::driver::{Driver, Row};
use crate::table::{TableDef, TableOptions};

/// Errors returned by [`MemoryDriver`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryDriverError {
    /// The table does not exist.
    #[error("no such table '{0}'")]
    NoSuchTable(String),

    /// The table already exists.
    #[error("table '{0}' already exists")]
    TableExists(String),

    /// A column referenced by a plan or row does not exist.
    #[error("no such column '{column}' in table '{table}'")]
    NoSuchColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A plan adds a column that already exists.
    #[error("column '{column}' already exists in table '{table}'")]
    ColumnExists {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A plan drops an index that does not exist.
    #[error("no such index {index} on table '{table}'")]
    NoSuchIndex {
        /// Table name.
        table: String,
        /// Index signature.
        index: String,
    },

    /// A NOT NULL column received no value.
    #[error("column '{column}' in table '{table}' may not be null")]
    NotNull {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// The resulting definition is not valid.
    #[error("invalid definition: {0}")]
    Invalid(String),

    /// A previous holder of the lock panicked.
    #[error("memory driver state is poisoned")]
    Poisoned,
}

type Result<T> = std::result::Result<T, MemoryDriverError>;

#[derive(Debug, Clone)]
struct MemoryTable {
    def: TableDef,
    rows: Vec<Row>,
}

/// A [`Driver`] holding everything in memory.
///
/// Table names are case-insensitive.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    tables: Mutex<BTreeMap<String, MemoryTable>>,
    alters: Mutex<usize>,
}

impl MemoryDriver {
    /// Creates an empty driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the driver with an existing table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table already exists or is invalid.
    pub fn with_table(self, def: TableDef) -> Result<Self> {
        self.create(&def)?;
        Ok(self)
    }

    /// Returns the table names in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryDriverError::Poisoned`] if the state lock is poisoned.
    pub fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.values().map(|t| t.def.name.clone()).collect())
    }

    /// Returns a copy of the rows stored in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryDriverError::NoSuchTable`] if the table does not exist.
    pub fn rows(&self, table: &str) -> Result<Vec<Row>> {
        let tables = self.lock()?;
        let stored = tables
            .get(&key(table))
            .ok_or_else(|| MemoryDriverError::NoSuchTable(table.to_string()))?;
        Ok(stored.rows.clone())
    }

    /// Returns how many alter operations have been applied.
    #[must_use]
    pub fn alter_count(&self) -> usize {
        self.alters.lock().map_or(0, |count| *count)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, MemoryTable>>> {
        self.tables.lock().map_err(|_| MemoryDriverError::Poisoned)
    }

    fn table_def(&self, name: &str) -> Result<Option<TableDef>> {
        let tables = self.lock()?;
        Ok(tables.get(&key(name)).map(|stored| TableDef {
            // Engines do not report options back.
            options: TableOptions::new(),
            ..stored.def.clone()
        }))
    }

    fn create(&self, def: &TableDef) -> Result<()> {
        def.validate()
            .map_err(|err| MemoryDriverError::Invalid(err.to_string()))?;
        let mut tables = self.lock()?;
        let k = key(&def.name);
        if tables.contains_key(&k) {
            return Err(MemoryDriverError::TableExists(def.name.clone()));
        }
        tables.insert(
            k,
            MemoryTable {
                def: def.clone(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    fn alter(&self, name: &str, plan: &ChangePlan) -> Result<()> {
        let mut tables = self.lock()?;
        let stored = tables
            .get_mut(&key(name))
            .ok_or_else(|| MemoryDriverError::NoSuchTable(name.to_string()))?;

        check_plan(&stored.def, plan)?;

        let next = stored.def.apply_plan(plan);
        next.validate()
            .map_err(|err| MemoryDriverError::Invalid(err.to_string()))?;

        for row in &mut stored.rows {
            row.retain(|column, _| next.column(column).is_some());
        }
        stored.def = next;
        drop(tables);

        if let Ok(mut count) = self.alters.lock() {
            *count += 1;
        }
        Ok(())
    }

    fn drop_named(&self, name: &str) -> Result<()> {
        self.lock()?
            .remove(&key(name))
            .map(|_| ())
            .ok_or_else(|| MemoryDriverError::NoSuchTable(name.to_string()))
    }

    fn insert_row(&self, table: &str, row: &Row) -> Result<()> {
        let mut tables = self.lock()?;
        let stored = tables
            .get_mut(&key(table))
            .ok_or_else(|| MemoryDriverError::NoSuchTable(table.to_string()))?;

        if let Some(unknown) = row.keys().find(|c| stored.def.column(c).is_none()) {
            return Err(MemoryDriverError::NoSuchColumn {
                table: table.to_string(),
                column: unknown.clone(),
            });
        }

        let mut full = Row::new();
        for column in &stored.def.columns {
            let given = row
                .iter()
                .find(|(name, _)| column.is_named(name))
                .map(|(_, value)| value.clone());
            let value = match given {
                Some(value) => Some(value),
                None if column.auto_increment => Some(next_id(&stored.rows, &column.name)),
                None => column.default.clone(),
            };
            match value {
                Some(value) => {
                    full.insert(column.name.clone(), value);
                }
                None if !column.nullable => {
                    return Err(MemoryDriverError::NotNull {
                        table: table.to_string(),
                        column: column.name.clone(),
                    });
                }
                None => {}
            }
        }
        stored.rows.push(full);
        Ok(())
    }
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

fn next_id(rows: &[Row], column: &str) -> Value {
    let max = rows
        .iter()
        .filter_map(|row| match row.get(column) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    Value::Integer(max + 1)
}

/// Rejects plans computed against a different version of the table.
fn check_plan(def: &TableDef, plan: &ChangePlan) -> Result<()> {
    let missing_column = |column: &str| MemoryDriverError::NoSuchColumn {
        table: def.name.clone(),
        column: column.to_string(),
    };

    if let Some(column) = plan.column_adds.iter().find(|c| def.column(&c.name).is_some()) {
        return Err(MemoryDriverError::ColumnExists {
            table: def.name.clone(),
            column: column.name.clone(),
        });
    }
    if let Some(change) = plan
        .column_modifies
        .iter()
        .find(|c| def.column(&c.name).is_none())
    {
        return Err(missing_column(&change.name));
    }
    if let Some(name) = plan.column_drops.iter().find(|c| def.column(c).is_none()) {
        return Err(missing_column(name));
    }

    let replaced = plan.primary_key_replace.as_ref().map(|r| &r.old);
    let dropped = plan.index_drops.iter().chain(replaced);
    for index in dropped {
        if !def.indexes.contains(index) {
            return Err(MemoryDriverError::NoSuchIndex {
                table: def.name.clone(),
                index: index.signature(),
            });
        }
    }
    Ok(())
}

impl Driver for MemoryDriver {
    type Error = MemoryDriverError;

    fn get_all_tables(&self) -> impl Future<Output = Result<Vec<String>>> + Send {
        future::ready(self.table_names())
    }

    fn get_table_def(&self, name: &str) -> impl Future<Output = Result<Option<TableDef>>> + Send {
        future::ready(self.table_def(name))
    }

    fn create_table(&self, def: &TableDef) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.create(def))
    }

    fn alter_table(
        &self,
        name: &str,
        plan: &ChangePlan,
    ) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.alter(name, plan))
    }

    fn drop_table(&self, name: &str) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.drop_named(name))
    }

    fn insert(&self, table: &str, row: &Row) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.insert_row(table, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnDef;
    use crate::diff::diff_table;
    use crate::driver::row;
    use crate::index::IndexDef;
    use crate::table::DROP;

    fn user() -> TableDef {
        let mut def = TableDef::new("user");
        def.set_column(ColumnDef::new("userID", "int").not_null().auto_increment());
        def.set_column(ColumnDef::new("name", "varchar(50)").not_null());
        def.set_column(ColumnDef::new("karma", "int").default(0));
        def.add_index(IndexDef::primary_key("userID"));
        def
    }

    #[tokio::test]
    async fn create_and_read_back_without_options() {
        let driver = MemoryDriver::new();
        let mut def = user();
        def.options.set(DROP, true);
        driver.create_table(&def).await.unwrap();

        let read = driver.get_table_def("USER").await.unwrap().unwrap();
        assert_eq!(read.shape(), def.shape());
        assert!(!read.options.allows_drop());
        assert_eq!(driver.get_all_tables().await.unwrap(), vec!["user"]);
    }

    #[tokio::test]
    async fn create_twice_fails() {
        let driver = MemoryDriver::new().with_table(user()).unwrap();
        let err = driver.create_table(&user()).await.unwrap_err();
        assert_eq!(err, MemoryDriverError::TableExists("user".into()));
    }

    #[tokio::test]
    async fn insert_fills_defaults_and_ids() {
        let driver = MemoryDriver::new().with_table(user()).unwrap();
        driver.insert("user", &row([("name", "todd")])).await.unwrap();
        driver
            .insert("user", &row([("userID", Value::from(10)), ("name", "ann".into())]))
            .await
            .unwrap();
        driver.insert("user", &row([("name", "bo")])).await.unwrap();

        let rows = driver.rows("user").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["userID"], Value::Integer(1));
        assert_eq!(rows[0]["karma"], Value::Integer(0));
        assert_eq!(rows[2]["userID"], Value::Integer(11));
    }

    #[tokio::test]
    async fn insert_rejects_bad_rows() {
        let driver = MemoryDriver::new().with_table(user()).unwrap();

        let err = driver.insert("user", &row([("nope", 1)])).await.unwrap_err();
        assert!(matches!(err, MemoryDriverError::NoSuchColumn { .. }));

        let err = driver.insert("user", &row([("karma", 3)])).await.unwrap_err();
        assert!(matches!(err, MemoryDriverError::NotNull { ref column, .. } if column == "name"));

        let err = driver.insert("ghost", &Row::new()).await.unwrap_err();
        assert_eq!(err, MemoryDriverError::NoSuchTable("ghost".into()));
    }

    #[tokio::test]
    async fn alter_drops_row_values_of_dropped_columns() {
        let driver = MemoryDriver::new().with_table(user()).unwrap();
        driver.insert("user", &row([("name", "todd")])).await.unwrap();

        let mut desired = user();
        desired.remove_column("karma");
        desired.options.set(DROP, true);
        let actual = driver.get_table_def("user").await.unwrap();
        let plan = diff_table(&desired, actual.as_ref());
        driver.alter_table("user", &plan).await.unwrap();

        let rows = driver.rows("user").unwrap();
        assert!(!rows[0].contains_key("karma"));
        assert_eq!(driver.alter_count(), 1);
    }

    #[tokio::test]
    async fn alter_rejects_stale_plans() {
        let driver = MemoryDriver::new().with_table(user()).unwrap();
        let mut stale = user();
        stale.set_column(ColumnDef::new("gone", "int"));
        let mut desired = user();
        desired.options.set(DROP, true);

        let plan = diff_table(&desired, Some(&stale));
        let err = driver.alter_table("user", &plan).await.unwrap_err();
        assert!(matches!(
            err,
            MemoryDriverError::NoSuchColumn { ref column, .. } if column == "gone"
        ));
        assert_eq!(driver.alter_count(), 0);
    }

    #[tokio::test]
    async fn drop_table_removes_it() {
        let driver = MemoryDriver::new().with_table(user()).unwrap();
        driver.drop_table("user").await.unwrap();
        assert!(driver.get_table_def("user").await.unwrap().is_none());
        assert!(driver.drop_table("user").await.is_err());
    }
}
