//! SQLite implementation of the dbdef [`Driver`].

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use dbdef::column::Value;
use dbdef::diff::ChangePlan;
use dbdef::driver::{Driver, Row};
use dbdef::index::{IndexDef, IndexKind};
use dbdef::table::TableDef;

use crate::ddl;
use crate::error::{Result, SqliteDriverError};
use crate::introspect;

/// Reconciles tables in a SQLite database.
///
/// The pool is expected to hold a single connection so that DDL runs
/// serially and `sqlite::memory:` databases keep their contents.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens `url`, creating the database file if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteDriverError::Database`] if the URL is invalid or the
    /// database cannot be opened.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn alter(&self, name: &str, plan: &ChangePlan) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let current = introspect::read_table(&mut tx, name)
            .await?
            .ok_or_else(|| SqliteDriverError::NoSuchTable(name.to_string()))?;

        let target = current.apply_plan(plan);
        ddl::check_auto_increment(&target)?;

        if needs_rebuild(plan) {
            debug!(table = %current.name, "Rebuilding table");
            for sql in ddl::rebuild_sql(&current, &target)? {
                execute(&mut tx, &sql).await?;
            }
        } else {
            let table = current.name.as_str();
            for column in &plan.column_adds {
                execute(&mut tx, &ddl::add_column_sql(table, column)).await?;
            }
            if !plan.index_drops.is_empty() {
                let named = introspect::read_named_indexes(&mut tx, table).await?;
                for index in &plan.index_drops {
                    let sql = ddl::drop_index_sql(resolve_index_name(table, &named, index)?);
                    execute(&mut tx, &sql).await?;
                }
            }
            for index in &plan.index_adds {
                execute(&mut tx, &ddl::create_index_sql(table, index)?).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Returns `true` if SQLite cannot apply `plan` with `ALTER TABLE` and
/// index statements alone.
fn needs_rebuild(plan: &ChangePlan) -> bool {
    !plan.column_modifies.is_empty()
        || !plan.column_drops.is_empty()
        || plan.primary_key_replace.is_some()
        || !plan.column_adds.iter().all(ddl::is_addable)
        || plan
            .index_adds
            .iter()
            .chain(&plan.index_drops)
            .any(IndexDef::is_primary)
}

fn resolve_index_name<'a>(
    table: &str,
    named: &'a [(String, IndexDef)],
    index: &IndexDef,
) -> Result<&'a str> {
    named
        .iter()
        .find(|(_, candidate)| candidate == index)
        .map(|(name, _)| name.as_str())
        .ok_or_else(|| SqliteDriverError::NoSuchIndex {
            table: table.to_string(),
            index: index.signature(),
        })
}

async fn execute(conn: &mut SqliteConnection, sql: &str) -> Result<()> {
    debug!(sql = %sql, "Executing SQL");
    sqlx::query(sql).execute(&mut *conn).await?;
    Ok(())
}

impl Driver for SqliteDriver {
    type Error = SqliteDriverError;

    async fn get_all_tables(&self) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        introspect::table_names(&mut conn).await
    }

    async fn get_table_def(&self, name: &str) -> Result<Option<TableDef>> {
        let mut conn = self.pool.acquire().await?;
        introspect::read_table(&mut conn, name).await
    }

    async fn create_table(&self, def: &TableDef) -> Result<()> {
        if let Some(index) = def.indexes.iter().find(|i| i.kind == IndexKind::Fulltext) {
            return Err(SqliteDriverError::Unsupported(format!(
                "fulltext index {}",
                index.signature()
            )));
        }
        ddl::check_auto_increment(def)?;

        let mut tx = self.pool.begin().await?;
        execute(&mut tx, &ddl::create_table_sql(&def.name, def)).await?;
        for index in def.secondary_indexes() {
            execute(&mut tx, &ddl::create_index_sql(&def.name, index)?).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn alter_table(&self, name: &str, plan: &ChangePlan) -> Result<()> {
        self.alter(name, plan).await
    }

    async fn drop_table(&self, name: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        execute(&mut conn, &ddl::drop_table_sql(name)).await
    }

    async fn insert(&self, table: &str, row: &Row) -> Result<()> {
        let sql = if row.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", ddl::quote_identifier(table))
        } else {
            let columns: Vec<String> = row.keys().map(|c| ddl::quote_identifier(c)).collect();
            let params: Vec<String> = (1..=row.len()).map(|i| format!("?{i}")).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                ddl::quote_identifier(table),
                columns.join(", "),
                params.join(", ")
            )
        };
        debug!(sql = %sql, "Executing SQL");

        let mut query = sqlx::query(&sql);
        for value in row.values() {
            query = match value {
                Value::Bool(b) => query.bind(*b),
                Value::Integer(n) => query.bind(*n),
                Value::Float(x) => query.bind(*x),
                Value::String(s) => query.bind(s.as_str()),
            };
        }
        query.execute(&self.pool).await?;
        Ok(())
    }
}
