//! Table definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::column::{ColumnDef, Value};
use crate::diff::ChangePlan;
use crate::error::{DbDefError, Result};
use crate::index::IndexDef;
use crate::shape::TableShape;

/// Option key that permits destructive reconciliation.
///
/// When set, columns and non-primary indexes present in the database but
/// absent from the desired definition are dropped.
pub const DROP: &str = "drop";

/// Engine options attached to a table definition.
///
/// Keys are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableOptions(BTreeMap<String, Value>);

impl TableOptions {
    /// Creates an empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_ascii_lowercase(), value.into());
    }

    /// Returns an option's value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(&key.to_ascii_lowercase())
    }

    /// Returns whether destructive drops are allowed. Defaults to `false`.
    #[must_use]
    pub fn allows_drop(&self) -> bool {
        self.get(DROP).is_some_and(Value::is_truthy)
    }

    /// Iterates over all options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Definition of a table: ordered columns, a set of indexes and options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    /// Indexes. Duplicates by value are not kept.
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
    /// Engine options.
    #[serde(default, skip_serializing_if = "is_empty_options")]
    pub options: TableOptions,
}

fn is_empty_options(options: &TableOptions) -> bool {
    options.0.is_empty()
}

impl TableDef {
    /// Creates an empty table definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            options: TableOptions::new(),
        }
    }

    /// Looks up a column by name, ignoring ASCII case.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.is_named(name))
    }

    /// Adds a column, or replaces the same-named column in place.
    pub fn set_column(&mut self, column: ColumnDef) {
        match self.columns.iter_mut().find(|c| c.is_named(&column.name)) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    /// Removes a column by name. Returns the removed column.
    pub fn remove_column(&mut self, name: &str) -> Option<ColumnDef> {
        let pos = self.columns.iter().position(|c| c.is_named(name))?;
        Some(self.columns.remove(pos))
    }

    /// Adds an index. Returns `false` if an equal index is already present.
    pub fn add_index(&mut self, index: IndexDef) -> bool {
        if self.indexes.contains(&index) {
            return false;
        }
        self.indexes.push(index);
        true
    }

    /// Removes an index by value. Returns `false` if it was not present.
    pub fn remove_index(&mut self, index: &IndexDef) -> bool {
        let before = self.indexes.len();
        self.indexes.retain(|i| i != index);
        self.indexes.len() != before
    }

    /// Returns the primary key, if any.
    #[must_use]
    pub fn primary_key(&self) -> Option<&IndexDef> {
        self.indexes.iter().find(|i| i.is_primary())
    }

    /// Returns every index except the primary key.
    pub fn secondary_indexes(&self) -> impl Iterator<Item = &IndexDef> {
        self.indexes.iter().filter(|i| !i.is_primary())
    }

    /// Returns the canonical shape used for comparisons.
    #[must_use]
    pub fn shape(&self) -> TableShape {
        TableShape::from(self)
    }

    /// Checks that the definition can be executed.
    ///
    /// # Errors
    ///
    /// Returns [`DbDefError::InvalidDefinition`] when the table has no
    /// columns, declares more than one primary key, or has an index that is
    /// empty or references an undeclared column.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(DbDefError::invalid(&self.name, "no columns defined"));
        }

        let primary_keys: Vec<&IndexDef> = self.indexes.iter().filter(|i| i.is_primary()).collect();
        if primary_keys.len() > 1 {
            let declared: Vec<String> = primary_keys.iter().map(|i| i.signature()).collect();
            return Err(DbDefError::invalid(
                &self.name,
                format!("more than one primary key: {}", declared.join(", ")),
            ));
        }

        for index in &self.indexes {
            if index.columns.is_empty() {
                return Err(DbDefError::invalid(
                    &self.name,
                    format!("{} index has no columns", index.kind),
                ));
            }
            if let Some(missing) = index.columns.iter().find(|c| self.column(c).is_none()) {
                return Err(DbDefError::invalid(
                    &self.name,
                    format!("{index} references undeclared column '{missing}'"),
                ));
            }
        }

        Ok(())
    }

    /// Returns the definition this table would have once `plan` is applied.
    ///
    /// Existing columns keep their position; added columns are appended.
    #[must_use]
    pub fn apply_plan(&self, plan: &ChangePlan) -> Self {
        if plan.creates {
            let mut created = Self::new(self.name.clone());
            for column in &plan.column_adds {
                created.set_column(column.clone());
            }
            for index in &plan.index_adds {
                created.add_index(index.clone());
            }
            return created;
        }

        let mut next = self.clone();
        for name in &plan.column_drops {
            next.remove_column(name);
        }
        for change in &plan.column_modifies {
            next.set_column(change.to.clone());
        }
        for column in &plan.column_adds {
            next.set_column(column.clone());
        }
        for index in &plan.index_drops {
            next.remove_index(index);
        }
        if let Some(replace) = &plan.primary_key_replace {
            next.remove_index(&replace.old);
            next.add_index(replace.new.clone());
        }
        for index in &plan.index_adds {
            next.add_index(index.clone());
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_table;
    use crate::index::IndexKind;

    fn moop() -> TableDef {
        let mut def = TableDef::new("moop");
        def.set_column(ColumnDef::new("col1", "int"));
        def.set_column(ColumnDef::new("col2", "int").default(0));
        def.add_index(IndexDef::new("col1", IndexKind::Index));
        def
    }

    #[test]
    fn set_column_keeps_position() {
        let mut def = moop();
        def.set_column(ColumnDef::new("COL1", "bigint"));
        assert_eq!(def.columns.len(), 2);
        assert_eq!(def.columns[0].name, "COL1");
        assert_eq!(def.columns[0].data_type, "bigint");
    }

    #[test]
    fn duplicate_indexes_collapse() {
        let mut def = moop();
        assert!(!def.add_index(IndexDef::new("COL1", IndexKind::Index)));
        assert_eq!(def.indexes.len(), 1);
    }

    #[test]
    fn options_are_case_insensitive() {
        let mut options = TableOptions::new();
        assert!(!options.allows_drop());
        options.set("DROP", true);
        assert!(options.allows_drop());
        assert_eq!(options.get("drop"), Some(&Value::Bool(true)));
    }

    #[test]
    fn validate_rejects_empty_table() {
        let err = TableDef::new("empty").validate().unwrap_err();
        assert!(matches!(err, DbDefError::InvalidDefinition { .. }));
    }

    #[test]
    fn validate_rejects_two_primary_keys() {
        let mut def = moop();
        def.add_index(IndexDef::primary_key("col1"));
        def.add_index(IndexDef::primary_key("col2"));
        let err = def.validate().unwrap_err();
        assert!(err.to_string().contains("more than one primary key"));
    }

    #[test]
    fn validate_rejects_unknown_index_column() {
        let mut def = moop();
        def.add_index(IndexDef::new("nope", IndexKind::Unique));
        let err = def.validate().unwrap_err();
        assert!(err.to_string().contains("'nope'"));
    }

    #[test]
    fn validate_rejects_empty_index() {
        let mut def = moop();
        def.add_index(IndexDef::new(Vec::<String>::new(), IndexKind::Index));
        assert!(def.validate().is_err());
    }

    #[test]
    fn apply_plan_appends_new_columns() {
        let actual = moop();
        let mut desired = TableDef::new("moop");
        desired.set_column(ColumnDef::new("cola", "int"));
        desired.set_column(ColumnDef::new("col2", "int"));

        let plan = diff_table(&desired, Some(&actual));
        let next = actual.apply_plan(&plan);

        let names: Vec<&str> = next.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["col1", "col2", "cola"]);
        assert_eq!(next.column("col2").unwrap().default, None);
        assert_eq!(next.indexes.len(), 1);
    }
}
