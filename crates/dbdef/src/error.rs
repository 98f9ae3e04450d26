//! Error types for table reconciliation.

/// Errors that can occur while reconciling a table definition.
#[derive(Debug, thiserror::Error)]
pub enum DbDefError {
    /// The desired definition cannot be executed as declared.
    #[error("Invalid definition for table '{table}': {reason}")]
    InvalidDefinition {
        /// Table being defined.
        table: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The driver failed. The original error is kept as the source.
    #[error("Driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Strict mode refused to leave drops unapplied.
    #[error("Table '{table}' needs drops that were not allowed: {}", .drops.join(", "))]
    UnsafeDrop {
        /// Table being reconciled.
        table: String,
        /// The withheld drops, e.g. `column col1` or `index(col1)`.
        drops: Vec<String>,
    },

    /// The driver reported no table right after applying changes to it.
    #[error("Table '{0}' does not exist after applying changes")]
    TableMissing(String),
}

impl DbDefError {
    /// Wraps a driver error without interpreting it.
    pub fn driver<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Driver(Box::new(err))
    }

    pub(crate) fn invalid(table: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T, E = DbDefError> = std::result::Result<T, E>;
