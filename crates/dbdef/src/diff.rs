//! Schema differ.
//!
//! Compares a desired [`TableDef`] against the definition currently in the
//! database (or its absence) and produces a [`ChangePlan`]: the operations
//! needed to move the table from what it is to what it should be.
//!
//! Columns are matched by name only; a rename shows up as a drop plus an
//! add. Indexes are matched by kind and ordered column list. Drops are
//! only planned when the desired table carries the [`DROP`] option; the
//! primary key is the exception and is always brought in line.
//!
//! [`DROP`]: crate::table::DROP

use std::fmt;

use serde::Serialize;

use crate::column::ColumnDef;
use crate::index::IndexDef;
use crate::table::TableDef;

/// A column present on both sides whose shape differs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnChange {
    /// Column name.
    pub name: String,
    /// Definition currently in the database.
    pub from: ColumnDef,
    /// Desired definition.
    pub to: ColumnDef,
}

/// Replacement of the table's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimaryKeyReplace {
    /// Primary key currently in the database.
    pub old: IndexDef,
    /// Desired primary key.
    pub new: IndexDef,
}

/// A drop the differ found but withheld because `DROP` was not set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "lowercase")]
pub enum SkippedDrop {
    /// A column only present in the database.
    Column(String),
    /// An index only present in the database.
    Index(IndexDef),
}

impl fmt::Display for SkippedDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => write!(f, "column {name}"),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Operations needed to bring one table to its desired shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangePlan {
    /// Table name.
    pub table: String,
    /// Whether the table must be created.
    pub creates: bool,
    /// Columns to add, in declaration order. For a new table, every column.
    pub column_adds: Vec<ColumnDef>,
    /// Columns whose type, nullability or default changes.
    pub column_modifies: Vec<ColumnChange>,
    /// Columns to drop.
    pub column_drops: Vec<String>,
    /// Indexes to add. For a new table, every index.
    pub index_adds: Vec<IndexDef>,
    /// Indexes to drop.
    pub index_drops: Vec<IndexDef>,
    /// Primary key replacement, planned regardless of `DROP`.
    pub primary_key_replace: Option<PrimaryKeyReplace>,
    /// Drops withheld because `DROP` was not set.
    pub skipped: Vec<SkippedDrop>,
}

impl ChangePlan {
    fn new(table: &str, creates: bool) -> Self {
        Self {
            table: table.to_string(),
            creates,
            column_adds: Vec::new(),
            column_modifies: Vec::new(),
            column_drops: Vec::new(),
            index_adds: Vec::new(),
            index_drops: Vec::new(),
            primary_key_replace: None,
            skipped: Vec::new(),
        }
    }

    /// Returns `true` if nothing needs to be executed.
    ///
    /// Withheld drops do not count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.creates
            && self.column_adds.is_empty()
            && self.column_modifies.is_empty()
            && self.column_drops.is_empty()
            && self.index_adds.is_empty()
            && self.index_drops.is_empty()
            && self.primary_key_replace.is_none()
    }

    /// Returns `true` if the plan removes columns or indexes.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        !self.column_drops.is_empty() || !self.index_drops.is_empty()
    }
}

impl fmt::Display for ChangePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() && self.skipped.is_empty() {
            return writeln!(f, "{}: up to date", self.table);
        }
        if self.creates {
            writeln!(f, "create table {}", self.table)?;
        }
        for column in &self.column_adds {
            writeln!(f, "  + column {} {}", column.name, column.data_type)?;
        }
        for change in &self.column_modifies {
            writeln!(
                f,
                "  ~ column {} {} -> {}",
                change.name, change.from.data_type, change.to.data_type
            )?;
        }
        for name in &self.column_drops {
            writeln!(f, "  - column {name}")?;
        }
        for index in &self.index_drops {
            writeln!(f, "  - {index}")?;
        }
        if let Some(replace) = &self.primary_key_replace {
            writeln!(f, "  ~ {} -> {}", replace.old, replace.new)?;
        }
        for index in &self.index_adds {
            writeln!(f, "  + {index}")?;
        }
        for skipped in &self.skipped {
            writeln!(f, "  ! kept {skipped} (set drop to remove)")?;
        }
        Ok(())
    }
}

/// Computes the changes needed to move `actual` to `desired`.
///
/// `actual` is `None` when the table does not exist yet.
#[must_use]
pub fn diff_table(desired: &TableDef, actual: Option<&TableDef>) -> ChangePlan {
    let Some(actual) = actual else {
        let mut plan = ChangePlan::new(&desired.name, true);
        plan.column_adds = desired.columns.clone();
        plan.index_adds = desired.indexes.clone();
        return plan;
    };

    let allow_drop = desired.options.allows_drop();
    let mut plan = ChangePlan::new(&desired.name, false);

    diff_columns(desired, actual, allow_drop, &mut plan);
    diff_indexes(desired, actual, allow_drop, &mut plan);

    plan
}

fn diff_columns(desired: &TableDef, actual: &TableDef, allow_drop: bool, plan: &mut ChangePlan) {
    for want in &desired.columns {
        match actual.column(&want.name) {
            None => plan.column_adds.push(want.clone()),
            Some(have) if !have.same_shape(want) => plan.column_modifies.push(ColumnChange {
                name: have.name.clone(),
                from: have.clone(),
                to: want.clone(),
            }),
            Some(_) => {}
        }
    }

    for have in &actual.columns {
        if desired.column(&have.name).is_some() {
            continue;
        }
        if allow_drop {
            plan.column_drops.push(have.name.clone());
        } else {
            plan.skipped.push(SkippedDrop::Column(have.name.clone()));
        }
    }
}

fn diff_indexes(desired: &TableDef, actual: &TableDef, allow_drop: bool, plan: &mut ChangePlan) {
    match (actual.primary_key(), desired.primary_key()) {
        (Some(old), Some(new)) if old != new => {
            plan.primary_key_replace = Some(PrimaryKeyReplace {
                old: old.clone(),
                new: new.clone(),
            });
        }
        (None, Some(new)) => plan.index_adds.push(new.clone()),
        (Some(old), None) => {
            if allow_drop {
                plan.index_drops.push(old.clone());
            } else {
                plan.skipped.push(SkippedDrop::Index(old.clone()));
            }
        }
        _ => {}
    }

    for have in actual.secondary_indexes() {
        if desired.indexes.contains(have) {
            continue;
        }
        if allow_drop {
            plan.index_drops.push(have.clone());
        } else {
            plan.skipped.push(SkippedDrop::Index(have.clone()));
        }
    }

    for want in desired.secondary_indexes() {
        if !actual.indexes.contains(want) {
            plan.index_adds.push(want.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexKind;
    use crate::table::DROP;

    fn table(name: &str, columns: &[(&str, &str)]) -> TableDef {
        let mut def = TableDef::new(name);
        for (column, ty) in columns {
            def.set_column(ColumnDef::new(*column, *ty));
        }
        def
    }

    #[test]
    fn absent_table_is_created() {
        let mut desired = table("user", &[("userID", "int"), ("name", "varchar(50)")]);
        desired.add_index(IndexDef::primary_key("userID"));
        desired.add_index(IndexDef::new("name", IndexKind::Index));

        let plan = diff_table(&desired, None);
        assert!(plan.creates);
        assert_eq!(plan.column_adds, desired.columns);
        assert_eq!(plan.index_adds, desired.indexes);
        assert!(!plan.is_destructive());
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn identical_tables_produce_empty_plan() {
        let mut def = table("t", &[("id", "int"), ("name", "text")]);
        def.add_index(IndexDef::primary_key("id"));
        let plan = diff_table(&def, Some(&def));
        assert!(plan.is_empty());
        assert_eq!(plan.to_string(), "t: up to date\n");
    }

    #[test]
    fn columns_match_by_name_without_renames() {
        let actual = table("moop", &[("col1", "int"), ("col2", "int")]);
        let desired = table("moop", &[("cola", "int"), ("colb", "int"), ("col2", "int")]);

        let plan = diff_table(&desired, Some(&actual));
        let added: Vec<&str> = plan.column_adds.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(added, vec!["cola", "colb"]);
        assert!(plan.column_modifies.is_empty());
        assert!(plan.column_drops.is_empty());
        assert_eq!(plan.skipped, vec![SkippedDrop::Column("col1".into())]);
    }

    #[test]
    fn drop_option_allows_column_drops() {
        let actual = table("moop", &[("col1", "int"), ("col2", "int")]);
        let mut desired = table("moop", &[("col2", "int")]);
        desired.options.set(DROP, true);

        let plan = diff_table(&desired, Some(&actual));
        assert_eq!(plan.column_drops, vec!["col1".to_string()]);
        assert!(plan.skipped.is_empty());
        assert!(plan.is_destructive());
    }

    #[test]
    fn modified_columns_are_detected() {
        let mut actual = table("t", &[("a", "int")]);
        actual.set_column(ColumnDef::new("b", "int").default(0));
        let mut desired = table("t", &[("a", "bigint")]);
        desired.set_column(ColumnDef::new("b", "int"));

        let plan = diff_table(&desired, Some(&actual));
        let modified: Vec<&str> = plan.column_modifies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(modified, vec!["a", "b"]);
        assert_eq!(plan.column_modifies[1].from.default, Some(0.into()));
        assert_eq!(plan.column_modifies[1].to.default, None);
    }

    #[test]
    fn column_names_compare_case_insensitively() {
        let actual = table("t", &[("UserID", "INT")]);
        let desired = table("t", &[("userid", "int")]);
        assert!(diff_table(&desired, Some(&actual)).is_empty());
    }

    #[test]
    fn stale_indexes_kept_without_drop() {
        let mut actual = table("t", &[("a", "int"), ("b", "int")]);
        actual.add_index(IndexDef::new("a", IndexKind::Index));
        let mut desired = actual.clone();
        desired.indexes.clear();
        desired.add_index(IndexDef::new("b", IndexKind::Unique));

        let plan = diff_table(&desired, Some(&actual));
        assert_eq!(plan.index_adds, vec![IndexDef::new("b", IndexKind::Unique)]);
        assert!(plan.index_drops.is_empty());
        assert_eq!(
            plan.skipped,
            vec![SkippedDrop::Index(IndexDef::new("a", IndexKind::Index))]
        );

        desired.options.set(DROP, 1);
        let plan = diff_table(&desired, Some(&actual));
        assert_eq!(plan.index_drops, vec![IndexDef::new("a", IndexKind::Index)]);
    }

    #[test]
    fn index_kind_change_is_drop_and_add() {
        let mut actual = table("t", &[("a", "int")]);
        actual.add_index(IndexDef::new("a", IndexKind::Index));
        let mut desired = table("t", &[("a", "int")]);
        desired.add_index(IndexDef::new("a", IndexKind::Unique));
        desired.options.set(DROP, true);

        let plan = diff_table(&desired, Some(&actual));
        assert_eq!(plan.index_drops, vec![IndexDef::new("a", IndexKind::Index)]);
        assert_eq!(plan.index_adds, vec![IndexDef::new("a", IndexKind::Unique)]);
    }

    #[test]
    fn primary_key_reorder_is_replaced_without_drop() {
        let mut actual = table("t", &[("col1", "int"), ("col2", "int")]);
        actual.add_index(IndexDef::primary_key(["col1", "col2"]));
        let mut desired = table("t", &[("col1", "int"), ("col2", "int")]);
        desired.add_index(IndexDef::primary_key(["col2", "col1"]));

        let plan = diff_table(&desired, Some(&actual));
        assert_eq!(
            plan.primary_key_replace,
            Some(PrimaryKeyReplace {
                old: IndexDef::primary_key(["col1", "col2"]),
                new: IndexDef::primary_key(["col2", "col1"]),
            })
        );
        assert!(plan.index_adds.is_empty());
        assert!(plan.index_drops.is_empty());
        assert!(!plan.is_empty());
    }

    #[test]
    fn new_primary_key_is_an_add() {
        let actual = table("t", &[("id", "int")]);
        let mut desired = actual.clone();
        desired.add_index(IndexDef::primary_key("id"));

        let plan = diff_table(&desired, Some(&actual));
        assert_eq!(plan.index_adds, vec![IndexDef::primary_key("id")]);
        assert!(plan.primary_key_replace.is_none());
    }

    #[test]
    fn undeclared_primary_key_is_gated() {
        let mut actual = table("t", &[("id", "int")]);
        actual.add_index(IndexDef::primary_key("id"));
        let mut desired = table("t", &[("id", "int")]);

        let plan = diff_table(&desired, Some(&actual));
        assert!(plan.is_empty());
        assert_eq!(
            plan.skipped,
            vec![SkippedDrop::Index(IndexDef::primary_key("id"))]
        );

        desired.options.set(DROP, true);
        let plan = diff_table(&desired, Some(&actual));
        assert_eq!(plan.index_drops, vec![IndexDef::primary_key("id")]);
    }

    #[test]
    fn summary_lists_operations() {
        let mut actual = table("t", &[("col1", "int"), ("col2", "int")]);
        actual.add_index(IndexDef::primary_key(["col1", "col2"]));
        let mut desired = table("t", &[("col2", "bigint"), ("col3", "text")]);
        desired.add_index(IndexDef::primary_key(["col2"]));

        let summary = diff_table(&desired, Some(&actual)).to_string();
        assert_eq!(
            summary,
            "  + column col3 text\n\
             \x20 ~ column col2 int -> bigint\n\
             \x20 ~ primary(col1, col2) -> primary(col2)\n\
             \x20 ! kept column col1 (set drop to remove)\n"
        );
    }
}
