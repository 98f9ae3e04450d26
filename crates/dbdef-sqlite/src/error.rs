//! Error types for the SQLite driver.

/// Errors that can occur while introspecting or changing a SQLite database.
#[derive(Debug, thiserror::Error)]
pub enum SqliteDriverError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The definition uses something SQLite cannot express.
    #[error("Unsupported by SQLite: {0}")]
    Unsupported(String),

    /// The table does not exist.
    #[error("Table '{0}' does not exist")]
    NoSuchTable(String),

    /// An index to drop was not found on the table.
    #[error("Index {index} not found on table '{table}'")]
    NoSuchIndex {
        /// Table name.
        table: String,
        /// Index signature, e.g. `unique(email)`.
        index: String,
    },
}

/// Result type for SQLite driver operations.
pub type Result<T> = std::result::Result<T, SqliteDriverError>;
