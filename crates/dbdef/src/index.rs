//! Index definitions.
//!
//! Indexes are identified by value: their kind plus the ordered list of
//! member columns. Names an engine assigns to an index are never part of
//! its identity.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Kind of index.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Plain index.
    #[default]
    Index,
    /// Unique index.
    Unique,
    /// The table's primary key.
    #[serde(rename = "primary")]
    PrimaryKey,
    /// Full-text index.
    Fulltext,
}

impl IndexKind {
    /// Returns the serialized name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Unique => "unique",
            Self::PrimaryKey => "primary",
            Self::Fulltext => "fulltext",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered column list accepted by [`IndexDef::new`].
///
/// Converts from a single column name or any ordered list of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumns(Vec<String>);

impl IndexColumns {
    /// Returns the column names.
    #[must_use]
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for IndexColumns {
    fn from(column: &str) -> Self {
        Self(vec![column.to_string()])
    }
}

impl From<String> for IndexColumns {
    fn from(column: String) -> Self {
        Self(vec![column])
    }
}

impl From<Vec<String>> for IndexColumns {
    fn from(columns: Vec<String>) -> Self {
        Self(columns)
    }
}

impl From<Vec<&str>> for IndexColumns {
    fn from(columns: Vec<&str>) -> Self {
        Self(columns.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for IndexColumns {
    fn from(columns: &[&str]) -> Self {
        Self(columns.iter().map(|c| (*c).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for IndexColumns {
    fn from(columns: [&str; N]) -> Self {
        Self(columns.iter().map(|c| (*c).to_string()).collect())
    }
}

/// Definition of an index.
///
/// Equality and hashing use the kind and the ordered column list,
/// comparing column names case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDef {
    /// Member columns, in index order.
    pub columns: Vec<String>,
    /// Index kind.
    #[serde(rename = "type", default)]
    pub kind: IndexKind,
}

impl IndexDef {
    /// Creates an index definition.
    #[must_use]
    pub fn new(columns: impl Into<IndexColumns>, kind: IndexKind) -> Self {
        Self {
            columns: columns.into().into_inner(),
            kind,
        }
    }

    /// Creates a primary key over `columns`.
    #[must_use]
    pub fn primary_key(columns: impl Into<IndexColumns>) -> Self {
        Self::new(columns, IndexKind::PrimaryKey)
    }

    /// Returns `true` if this is the primary key.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.kind == IndexKind::PrimaryKey
    }

    /// Returns `true` if `column` is one of the member columns.
    #[must_use]
    pub fn covers(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    /// Returns a readable signature such as `primary(col1, col2)`.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}({})", self.kind, self.columns.join(", "))
    }

    fn normalized_columns(&self) -> impl Iterator<Item = String> + '_ {
        self.columns.iter().map(|c| c.to_ascii_lowercase())
    }
}

impl PartialEq for IndexDef {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for IndexDef {}

impl Hash for IndexDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        for column in self.normalized_columns() {
            column.hash(state);
        }
    }
}

impl fmt::Display for IndexDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}
