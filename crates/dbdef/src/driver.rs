//! Driver capability.
//!
//! Driver crates (dbdef-sqlite, etc.) implement [`Driver`] to introspect
//! and change a physical database. The engine only ever talks to this
//! trait, so it stays engine-agnostic.

use std::collections::BTreeMap;
use std::future::Future;

use tracing::info;

use crate::column::Value;
use crate::diff::ChangePlan;
use crate::error::{DbDefError, Result};
use crate::table::TableDef;

/// A row to insert, keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// Physical schema introspection and DDL execution for one engine.
///
/// Implementations must apply an [`alter_table`](Driver::alter_table) plan
/// with column changes first and index changes second, so that indexes are
/// always created against final column types.
pub trait Driver {
    /// Error type for driver failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists the names of all tables.
    fn get_all_tables(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send;

    /// Reads the current definition of `name`, or `None` if the table
    /// does not exist.
    fn get_table_def(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<TableDef>, Self::Error>> + Send;

    /// Creates a table.
    fn create_table(&self, def: &TableDef) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Applies a change plan to an existing table as one batched operation.
    fn alter_table(
        &self,
        name: &str,
        plan: &ChangePlan,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Drops a table.
    fn drop_table(&self, name: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Inserts one row.
    fn insert(
        &self,
        table: &str,
        row: &Row,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Drops every table the driver reports.
///
/// # Errors
///
/// Returns [`DbDefError::Driver`] if listing or dropping fails.
pub async fn reset_schema<D: Driver>(driver: &D) -> Result<Vec<String>> {
    let tables = driver.get_all_tables().await.map_err(DbDefError::driver)?;
    for table in &tables {
        driver.drop_table(table).await.map_err(DbDefError::driver)?;
        info!(table = %table, "Dropped table");
    }
    Ok(tables)
}

/// Builds a [`Row`] from `(column, value)` pairs.
#[must_use]
pub fn row<K, V, I>(values: I) -> Row
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    values
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
