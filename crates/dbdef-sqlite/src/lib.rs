//! SQLite driver for dbdef.
//!
//! `dbdef-sqlite` implements [`dbdef::driver::Driver`] on top of an sqlx
//! SQLite pool:
//! - Tables are introspected through `sqlite_master` and the `pragma_*`
//!   table-valued functions
//! - Additive changes use `ALTER TABLE ADD COLUMN` and index statements
//! - Anything else rebuilds the table inside a transaction
//!
//! # Example
//!
//! ```rust,ignore
//! use dbdef::prelude::*;
//! use dbdef_sqlite::SqliteDriver;
//!
//! let driver = SqliteDriver::connect("sqlite:app.db").await?;
//! let def = DbDef::new(driver);
//!
//! def.table("user")
//!     .primary_key("userID")
//!     .column("name", "varchar(50)")
//!     .index("name", IndexKind::Index)
//!     .exec()
//!     .await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show what a definition file would change
//! dbdef --database sqlite:app.db plan user.json
//!
//! # Apply it, allowing drops
//! dbdef --database sqlite:app.db apply user.json --drop
//!
//! # Print the live shape of a table
//! dbdef --database sqlite:app.db show user
//! ```

pub mod ddl;
pub mod driver;
pub mod error;
mod introspect;

pub use driver::SqliteDriver;
pub use error::{Result, SqliteDriverError};
