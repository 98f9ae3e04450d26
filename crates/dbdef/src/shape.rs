//! Canonical, comparable form of a table definition.
//!
//! A [`TableShape`] is what reconciliation results are compared on:
//!
//! ```json
//! {
//!   "columns": { "<name>": {"type": "<string>", "nullable": true, "default": null} },
//!   "indexes": [ {"columns": ["<name>"], "type": "index|unique|primary|fulltext"} ]
//! }
//! ```
//!
//! Column keys, index column names and types are lower-cased, and indexes
//! are sorted, so derived equality is structural equality.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::column::{ColumnDef, Value};
use crate::index::{IndexDef, IndexKind};
use crate::table::TableDef;

/// Shape of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnShape {
    /// Lower-cased type.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Default value.
    pub default: Option<Value>,
}

impl From<&ColumnDef> for ColumnShape {
    fn from(column: &ColumnDef) -> Self {
        Self {
            data_type: column.data_type.to_ascii_lowercase(),
            nullable: column.nullable,
            default: column.default.clone(),
        }
    }
}

/// Shape of one index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct IndexShape {
    /// Lower-cased member columns in index order.
    pub columns: Vec<String>,
    /// Index kind.
    #[serde(rename = "type")]
    pub kind: IndexKind,
}

impl From<&IndexDef> for IndexShape {
    fn from(index: &IndexDef) -> Self {
        Self {
            columns: index.columns.iter().map(|c| c.to_ascii_lowercase()).collect(),
            kind: index.kind,
        }
    }
}

impl IndexShape {
    fn signature(&self) -> String {
        format!("{}({})", self.kind, self.columns.join(", "))
    }
}

/// Canonical structure of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableShape {
    /// Columns keyed by lower-cased name.
    pub columns: BTreeMap<String, ColumnShape>,
    /// Indexes, sorted and deduplicated.
    pub indexes: Vec<IndexShape>,
}

impl From<&TableDef> for TableShape {
    fn from(def: &TableDef) -> Self {
        let columns = def
            .columns
            .iter()
            .map(|c| (c.name.to_ascii_lowercase(), ColumnShape::from(c)))
            .collect();
        let mut indexes: Vec<IndexShape> = def.indexes.iter().map(IndexShape::from).collect();
        indexes.sort();
        indexes.dedup();
        Self { columns, indexes }
    }
}

impl TableShape {
    /// Returns `true` if `expected` is a subset of this shape.
    ///
    /// Every expected column must exist here with an identical shape, and
    /// every expected index must exist here. Extra columns and indexes on
    /// this side are ignored.
    #[must_use]
    pub fn contains(&self, expected: &Self) -> bool {
        self.mismatches(expected).is_empty()
    }

    /// Describes every way in which `expected` is not a subset of this shape.
    #[must_use]
    pub fn mismatches(&self, expected: &Self) -> Vec<String> {
        let mut out = Vec::new();
        for (name, want) in &expected.columns {
            match self.columns.get(name) {
                None => out.push(format!("missing column '{name}'")),
                Some(have) if have != want => out.push(format!(
                    "column '{name}' is {} but expected {}",
                    describe(have),
                    describe(want)
                )),
                Some(_) => {}
            }
        }
        for index in &expected.indexes {
            if !self.indexes.contains(index) {
                out.push(format!("missing index {}", index.signature()));
            }
        }
        out
    }
}

fn describe(column: &ColumnShape) -> String {
    let null = if column.nullable { "null" } else { "not null" };
    match &column.default {
        Some(default) => format!("{} {null} default {default}", column.data_type),
        None => format!("{} {null}", column.data_type),
    }
}
