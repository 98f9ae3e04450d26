//! Declarative table definitions for Rust.
//!
//! `dbdef` lets you state what a table should look like and brings the live
//! table in line with it:
//! - A table that does not exist is created
//! - Missing columns and indexes are added, changed columns are modified
//! - Columns and indexes absent from the definition are only dropped when
//!   the table's `DROP` option is set
//!
//! # Architecture
//!
//! - **Definitions** - [`TableDef`], [`ColumnDef`] and [`IndexDef`] describe a table
//! - **Builder** - [`DbDef`] and [`TableBuilder`] assemble definitions fluently
//! - **Diff** - [`diff_table`] computes a [`ChangePlan`] from desired vs. actual
//! - **Executor** - Applies a plan through a [`Driver`] or predicts its result
//! - **Drivers** - Engine crates implement [`Driver`]; [`MemoryDriver`] ships here
//!
//! # Example
//!
//! ```rust
//! use dbdef::prelude::*;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let def = DbDef::new(MemoryDriver::new());
//!
//! def.table("moop")
//!     .column("col1", "int")
//!     .column_default("col2", "int", 0)
//!     .index("col1", IndexKind::Index)
//!     .exec()
//!     .await?;
//!
//! // col2 is no longer declared, but survives because DROP is not set.
//! let altered = def
//!     .table("moop")
//!     .column("col1", "int")
//!     .column("col3", "varchar(20)")
//!     .exec()
//!     .await?;
//!
//! let shape = altered.serialize();
//! assert!(shape.columns.contains_key("col2"));
//! assert!(shape.columns.contains_key("col3"));
//! # Ok::<(), DbDefError>(())
//! # }).unwrap();
//! ```
//!
//! [`TableDef`]: table::TableDef
//! [`ColumnDef`]: column::ColumnDef
//! [`IndexDef`]: index::IndexDef
//! [`DbDef`]: builder::DbDef
//! [`TableBuilder`]: builder::TableBuilder
//! [`diff_table`]: diff::diff_table
//! [`ChangePlan`]: diff::ChangePlan
//! [`Driver`]: driver::Driver
//! [`MemoryDriver`]: memory::MemoryDriver

pub mod builder;
pub mod column;
pub mod diff;
pub mod driver;
pub mod error;
pub mod executor;
pub mod index;
pub mod memory;
pub mod shape;
pub mod table;

pub use builder::{DbDef, DropMode, Executed, TableBuilder};
pub use driver::{Driver, reset_schema};
pub use error::{DbDefError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::builder::{DbDef, DropMode, Executed, TableBuilder};
    pub use crate::column::{ColumnDef, Value};
    pub use crate::diff::{ChangePlan, ColumnChange, PrimaryKeyReplace, SkippedDrop, diff_table};
    pub use crate::driver::{Driver, Row, reset_schema, row};
    pub use crate::error::{DbDefError, Result};
    pub use crate::executor::Executor;
    pub use crate::index::{IndexDef, IndexKind};
    pub use crate::memory::{MemoryDriver, MemoryDriverError};
    pub use crate::shape::{ColumnShape, IndexShape, TableShape};
    pub use crate::table::{DROP, TableDef, TableOptions};
}
