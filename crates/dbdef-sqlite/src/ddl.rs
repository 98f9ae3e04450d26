//! SQL generation for SQLite.
//!
//! SQLite cannot modify or drop constrained columns in place, so the driver
//! rebuilds tables for anything beyond adding columns and indexes. The
//! statements for both paths are generated here.

use dbdef::column::{ColumnDef, Value};
use dbdef::index::{IndexDef, IndexKind};
use dbdef::table::TableDef;

use crate::error::{Result, SqliteDriverError};

/// Prefix of the scratch table used while rebuilding.
pub const REBUILD_PREFIX: &str = "_dbdef_new_";

/// Opens the comment that records the declared type of an auto-increment
/// key, which SQLite only generates values for when it is typed `INTEGER`.
const DECLARED_TYPE_OPEN: &str = "/* dbdef type: ";
const DECLARED_TYPE_CLOSE: &str = " */";

/// Quotes an identifier, doubling embedded quotes.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Renders a default value as a SQL literal.
#[must_use]
pub fn literal(value: &Value) -> String {
    match value {
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Float(x) => format!("{x:?}"),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// Parses a `dflt_value` as reported by `PRAGMA table_info`.
///
/// Anything that is not a recognisable literal is kept as its raw text.
#[must_use]
pub fn parse_default(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("null") {
        return None;
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Some(Value::String(raw[1..raw.len() - 1].replace("''", "'")));
    }
    if raw.eq_ignore_ascii_case("true") {
        return Some(Value::Bool(true));
    }
    if raw.eq_ignore_ascii_case("false") {
        return Some(Value::Bool(false));
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Value::Integer(n));
    }
    if let Ok(x) = raw.parse::<f64>() {
        return Some(Value::Float(x));
    }
    Some(Value::String(raw.to_string()))
}

/// Reads the declared type recorded in a `CREATE TABLE` statement by
/// [`create_table_sql`].
#[must_use]
pub fn declared_type(create_sql: &str) -> Option<&str> {
    let start = create_sql.find(DECLARED_TYPE_OPEN)? + DECLARED_TYPE_OPEN.len();
    let len = create_sql[start..].find(DECLARED_TYPE_CLOSE)?;
    Some(&create_sql[start..start + len])
}

/// Returns `true` for types SQLite gives integer affinity.
fn is_integer_type(data_type: &str) -> bool {
    data_type.to_ascii_lowercase().contains("int") && !data_type.contains("*/")
}

/// Returns the primary key column if it can be declared inline as
/// `INTEGER PRIMARY KEY AUTOINCREMENT`.
fn inline_primary_key(def: &TableDef) -> Option<&ColumnDef> {
    let primary = def.primary_key()?;
    let [name] = primary.columns.as_slice() else {
        return None;
    };
    def.column(name)
        .filter(|c| c.auto_increment && is_integer_type(&c.data_type))
}

/// Checks that every auto-increment column can be generated by SQLite.
///
/// # Errors
///
/// Returns [`SqliteDriverError::Unsupported`] unless the column is the
/// table's only primary key column and has an integer type.
pub fn check_auto_increment(def: &TableDef) -> Result<()> {
    let inline = inline_primary_key(def).map(|c| c.name.as_str());
    def.columns
        .iter()
        .find(|c| c.auto_increment && inline != Some(c.name.as_str()))
        .map_or(Ok(()), |column| {
            Err(SqliteDriverError::Unsupported(format!(
                "auto-increment column {} of type {} that is not the sole integer primary key",
                column.name, column.data_type
            )))
        })
}

/// Generates a column definition clause.
#[must_use]
pub fn column_definition(column: &ColumnDef) -> String {
    column_clause(column, &column.data_type)
}

/// Generates the clause of an inline `INTEGER PRIMARY KEY AUTOINCREMENT`.
fn inline_key_definition(column: &ColumnDef) -> String {
    let data_type = if column.data_type.eq_ignore_ascii_case("integer") {
        column.data_type.clone()
    } else {
        format!(
            "INTEGER {DECLARED_TYPE_OPEN}{}{DECLARED_TYPE_CLOSE}",
            column.data_type
        )
    };
    format!("{} PRIMARY KEY AUTOINCREMENT", column_clause(column, &data_type))
}

fn column_clause(column: &ColumnDef, data_type: &str) -> String {
    let mut parts = vec![quote_identifier(&column.name), data_type.to_string()];
    if !column.nullable {
        parts.push("NOT NULL".to_string());
    }
    if let Some(default) = &column.default {
        parts.push(format!("DEFAULT {}", literal(default)));
    }
    parts.join(" ")
}

/// Generates `CREATE TABLE` for `def` under the name `table`.
///
/// Only the primary key is part of the statement; secondary indexes come
/// from [`create_index_sql`]. An auto-increment key of another integer type
/// is written as `INTEGER` with its declared type kept in a comment, see
/// [`declared_type`].
#[must_use]
pub fn create_table_sql(table: &str, def: &TableDef) -> String {
    let inline = inline_primary_key(def).map(|c| c.name.as_str());

    let mut clauses: Vec<String> = def
        .columns
        .iter()
        .map(|column| {
            if inline == Some(column.name.as_str()) {
                inline_key_definition(column)
            } else {
                column_definition(column)
            }
        })
        .collect();

    if inline.is_none() {
        if let Some(primary) = def.primary_key() {
            clauses.push(format!("PRIMARY KEY ({})", quoted_list(&primary.columns)));
        }
    }

    format!(
        "CREATE TABLE {} (\n  {}\n)",
        quote_identifier(table),
        clauses.join(",\n  ")
    )
}

/// Generates the name used for a secondary index.
///
/// Index names are global to the database. Each segment carries its byte
/// length, so different tables or column lists never produce the same name.
#[must_use]
pub fn index_name(table: &str, index: &IndexDef) -> String {
    let prefix = if index.kind == IndexKind::Unique {
        "ux"
    } else {
        "ix"
    };
    let segments: Vec<String> = std::iter::once(table)
        .chain(index.columns.iter().map(String::as_str))
        .map(|segment| format!("{}_{segment}", segment.len()))
        .collect();
    format!("{prefix}_{}", segments.join("_"))
}

/// Generates `CREATE [UNIQUE] INDEX` for a secondary index.
///
/// # Errors
///
/// Returns [`SqliteDriverError::Unsupported`] for primary keys, which are
/// part of the table, and for fulltext indexes.
pub fn create_index_sql(table: &str, index: &IndexDef) -> Result<String> {
    let unique = match index.kind {
        IndexKind::Index => "",
        IndexKind::Unique => "UNIQUE ",
        IndexKind::PrimaryKey => {
            return Err(SqliteDriverError::Unsupported(format!(
                "adding {} to an existing table without a rebuild",
                index.signature()
            )))
        }
        IndexKind::Fulltext => {
            return Err(SqliteDriverError::Unsupported(format!(
                "fulltext index {}",
                index.signature()
            )))
        }
    };
    Ok(format!(
        "CREATE {unique}INDEX {} ON {} ({})",
        quote_identifier(&index_name(table, index)),
        quote_identifier(table),
        quoted_list(&index.columns)
    ))
}

/// Generates `DROP INDEX`.
#[must_use]
pub fn drop_index_sql(name: &str) -> String {
    format!("DROP INDEX {}", quote_identifier(name))
}

/// Generates `ALTER TABLE ... ADD COLUMN`.
#[must_use]
pub fn add_column_sql(table: &str, column: &ColumnDef) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_identifier(table),
        column_definition(column)
    )
}

/// Generates `DROP TABLE IF EXISTS`.
#[must_use]
pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(table))
}

/// Generates the statements that rebuild `current` into `target`.
///
/// Columns present in both are copied; the rest take their defaults.
///
/// # Errors
///
/// Returns [`SqliteDriverError::Unsupported`] if `target` has an index
/// or an auto-increment column SQLite cannot create.
pub fn rebuild_sql(current: &TableDef, target: &TableDef) -> Result<Vec<String>> {
    check_auto_increment(target)?;
    let table = &target.name;
    let scratch = format!("{REBUILD_PREFIX}{table}");

    let (into, from): (Vec<&str>, Vec<&str>) = target
        .columns
        .iter()
        .filter_map(|column| {
            current
                .column(&column.name)
                .map(|old| (column.name.as_str(), old.name.as_str()))
        })
        .unzip();

    let mut statements = vec![create_table_sql(&scratch, target)];
    if !into.is_empty() {
        statements.push(format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            quote_identifier(&scratch),
            quoted_list(&into),
            quoted_list(&from),
            quote_identifier(&current.name)
        ));
    }
    statements.push(format!("DROP TABLE {}", quote_identifier(&current.name)));
    statements.push(format!(
        "ALTER TABLE {} RENAME TO {}",
        quote_identifier(&scratch),
        quote_identifier(table)
    ));
    for index in target.secondary_indexes() {
        statements.push(create_index_sql(table, index)?);
    }
    Ok(statements)
}

/// Returns `true` if `ALTER TABLE ADD COLUMN` accepts `column`.
#[must_use]
pub const fn is_addable(column: &ColumnDef) -> bool {
    column.nullable || column.default.is_some()
}

fn quoted_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| quote_identifier(n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}
