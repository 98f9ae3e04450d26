//! Fluent table definition builder.
//!
//! [`DbDef`] owns a driver and hands out [`TableBuilder`]s. Each call to
//! [`DbDef::table`] starts from an empty definition; to keep building on a
//! previous definition, pass it back through [`DbDef::resume`].
//!
//! ```rust
//! use dbdef::prelude::*;
//!
//! # tokio_test(async {
//! let def = DbDef::new(MemoryDriver::new());
//!
//! let created = def
//!     .table("user")
//!     .primary_key("userID")
//!     .column("name", "varchar(50)")
//!     .index("name", IndexKind::Index)
//!     .exec()
//!     .await?;
//!
//! assert!(created.plan().creates);
//! assert_eq!(created.serialize().columns.len(), 2);
//! # Ok::<(), DbDefError>(())
//! # });
//! # fn tokio_test<F: std::future::Future<Output = Result<(), DbDefError>>>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f).unwrap();
//! # }
//! ```

use tracing::{debug, warn};

use crate::column::{ColumnDef, Value};
use crate::diff::{ChangePlan, diff_table};
use crate::driver::Driver;
use crate::error::{DbDefError, Result};
use crate::executor::Executor;
use crate::index::{IndexColumns, IndexDef, IndexKind};
use crate::shape::TableShape;
use crate::table::TableDef;

/// Type used by [`TableBuilder::primary_key`].
pub const DEFAULT_PRIMARY_KEY_TYPE: &str = "int";

/// What to do with drops that `DROP` did not allow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropMode {
    /// Leave the columns and indexes in place and log them.
    #[default]
    Skip,
    /// Fail with [`DbDefError::UnsafeDrop`] before changing anything.
    Strict,
}

/// Entry point for defining tables against a driver.
#[derive(Debug)]
pub struct DbDef<D> {
    driver: D,
    drop_mode: DropMode,
}

impl<D: Driver> DbDef<D> {
    /// Creates a builder over `driver`.
    #[must_use]
    pub const fn new(driver: D) -> Self {
        Self {
            driver,
            drop_mode: DropMode::Skip,
        }
    }

    /// Sets how withheld drops are handled.
    #[must_use]
    pub fn drop_mode(mut self, mode: DropMode) -> Self {
        self.drop_mode = mode;
        self
    }

    /// Returns the driver.
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Starts a fresh definition of `name`.
    pub fn table(&self, name: impl Into<String>) -> TableBuilder<'_, D> {
        self.resume(TableDef::new(name))
    }

    /// Continues building on an existing definition.
    pub const fn resume(&self, def: TableDef) -> TableBuilder<'_, D> {
        TableBuilder { db: self, def }
    }

    /// Reconciles the table against `desired`.
    ///
    /// With `apply` set, the plan is executed and the table is read back;
    /// otherwise the resulting definition is predicted without any DDL.
    ///
    /// # Errors
    ///
    /// Returns [`DbDefError::InvalidDefinition`] for an unusable definition,
    /// [`DbDefError::UnsafeDrop`] in strict mode when drops were withheld,
    /// and [`DbDefError::Driver`] when the driver fails.
    pub async fn reconcile(&self, desired: TableDef, apply: bool) -> Result<Executed> {
        desired.validate()?;

        let actual = self
            .driver
            .get_table_def(&desired.name)
            .await
            .map_err(DbDefError::driver)?;
        let plan = diff_table(&desired, actual.as_ref());
        debug!(table = %desired.name, apply, plan = %plan, "Computed change plan");

        if !plan.skipped.is_empty() {
            let drops: Vec<String> = plan.skipped.iter().map(ToString::to_string).collect();
            if self.drop_mode == DropMode::Strict {
                return Err(DbDefError::UnsafeDrop {
                    table: desired.name,
                    drops,
                });
            }
            warn!(
                table = %desired.name,
                kept = %drops.join(", "),
                "Keeping undeclared columns and indexes; set the drop option to remove them"
            );
        }

        let executor = Executor::new(&self.driver);
        let result = if apply {
            executor.apply(&desired, &plan).await?
        } else {
            executor.plan(&desired, actual.as_ref(), &plan)
        };

        Ok(Executed {
            definition: desired,
            plan,
            result,
            applied: apply,
        })
    }
}

/// Accumulates one table definition.
#[derive(Debug)]
#[must_use = "a table definition does nothing until exec() or dry_run() is awaited"]
pub struct TableBuilder<'a, D> {
    db: &'a DbDef<D>,
    def: TableDef,
}

impl<D: Driver> TableBuilder<'_, D> {
    /// Declares an auto-increment `int` primary key column.
    pub fn primary_key(self, name: &str) -> Self {
        self.primary_key_typed(name, DEFAULT_PRIMARY_KEY_TYPE)
    }

    /// Declares an auto-increment primary key column of type `data_type`.
    pub fn primary_key_typed(mut self, name: &str, data_type: &str) -> Self {
        self.def
            .set_column(ColumnDef::new(name, data_type).not_null().auto_increment());
        self.def.add_index(IndexDef::primary_key(name));
        self
    }

    /// Declares a nullable column without a default.
    pub fn column(self, name: &str, data_type: &str) -> Self {
        self.column_def(ColumnDef::new(name, data_type))
    }

    /// Declares a nullable column with a default.
    pub fn column_default(self, name: &str, data_type: &str, default: impl Into<Value>) -> Self {
        self.column_def(ColumnDef::new(name, data_type).default(default))
    }

    /// Declares a fully specified column.
    ///
    /// A column with the same name is replaced in place.
    pub fn column_def(mut self, column: ColumnDef) -> Self {
        self.def.set_column(column);
        self
    }

    /// Declares an index over one column or an ordered list of columns.
    pub fn index(mut self, columns: impl Into<IndexColumns>, kind: IndexKind) -> Self {
        self.def.add_index(IndexDef::new(columns, kind));
        self
    }

    /// Sets an engine option such as [`DROP`](crate::table::DROP).
    pub fn option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.def.options.set(key, value);
        self
    }

    /// Returns the definition built so far.
    #[must_use]
    pub const fn definition(&self) -> &TableDef {
        &self.def
    }

    /// Returns the definition, discarding the builder.
    #[must_use]
    pub fn into_definition(self) -> TableDef {
        self.def
    }

    /// Brings the table in line with the definition.
    ///
    /// # Errors
    ///
    /// See [`DbDef::reconcile`].
    pub async fn exec(self) -> Result<Executed> {
        self.db.reconcile(self.def, true).await
    }

    /// Computes what [`exec`](Self::exec) would produce without changing
    /// the database.
    ///
    /// # Errors
    ///
    /// See [`DbDef::reconcile`].
    pub async fn dry_run(self) -> Result<Executed> {
        self.db.reconcile(self.def, false).await
    }
}

/// Outcome of reconciling one table.
#[derive(Debug, Clone)]
pub struct Executed {
    definition: TableDef,
    plan: ChangePlan,
    result: TableDef,
    applied: bool,
}

impl Executed {
    /// Returns the canonical shape of the resulting table.
    #[must_use]
    pub fn serialize(&self) -> TableShape {
        self.result.shape()
    }

    /// Returns the plan that was computed.
    #[must_use]
    pub const fn plan(&self) -> &ChangePlan {
        &self.plan
    }

    /// Returns the resulting table definition: as read back from the
    /// driver when applied, as predicted otherwise.
    #[must_use]
    pub const fn result(&self) -> &TableDef {
        &self.result
    }

    /// Returns the desired definition that was reconciled.
    #[must_use]
    pub const fn definition(&self) -> &TableDef {
        &self.definition
    }

    /// Returns the desired definition, e.g. to pass to [`DbDef::resume`].
    #[must_use]
    pub fn into_definition(self) -> TableDef {
        self.definition
    }

    /// Returns `true` if the plan was executed.
    #[must_use]
    pub const fn applied(&self) -> bool {
        self.applied
    }
}
