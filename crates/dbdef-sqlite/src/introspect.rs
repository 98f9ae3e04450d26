//! Reads table definitions back from SQLite.

use sqlx::sqlite::SqliteConnection;

use dbdef::column::ColumnDef;
use dbdef::index::{IndexDef, IndexKind};
use dbdef::table::TableDef;

use crate::ddl::{REBUILD_PREFIX, declared_type, parse_default};
use crate::error::Result;

/// One row of `PRAGMA table_info`.
type ColumnInfo = (String, String, i64, Option<String>, i64);

/// One row of `PRAGMA index_list`.
type IndexInfo = (String, i64, String);

/// Lists user tables in name order.
///
/// SQLite's internal tables and leftover rebuild scratch tables are skipped.
pub async fn table_names(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
         ORDER BY name",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(names
        .into_iter()
        .filter(|name| !name.starts_with(REBUILD_PREFIX))
        .collect())
}

/// Reads the definition of `name`, or `None` if there is no such table.
pub async fn read_table(conn: &mut SqliteConnection, name: &str) -> Result<Option<TableDef>> {
    let master: Option<(String, Option<String>)> = sqlx::query_as(
        "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    let Some((stored_name, create_sql)) = master else {
        return Ok(None);
    };

    let columns: Vec<ColumnInfo> = sqlx::query_as(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
    )
    .bind(&stored_name)
    .fetch_all(&mut *conn)
    .await?;

    let mut def = TableDef::new(stored_name.clone());
    let mut primary: Vec<(i64, String)> = Vec::new();
    for (column, data_type, not_null, default, pk) in columns {
        let mut col = ColumnDef::new(column.clone(), data_type);
        col.nullable = not_null == 0;
        col.default = default.as_deref().and_then(parse_default);
        def.set_column(col);
        if pk > 0 {
            primary.push((pk, column));
        }
    }
    primary.sort();

    let autoincrement = create_sql
        .as_deref()
        .is_some_and(|sql| sql.to_ascii_uppercase().contains("AUTOINCREMENT"));
    if let [(_, only)] = primary.as_slice() {
        if autoincrement {
            let column = def.column(only).cloned();
            if let Some(mut column) =
                column.filter(|c| c.data_type.eq_ignore_ascii_case("integer"))
            {
                if let Some(declared) = create_sql.as_deref().and_then(declared_type) {
                    column.data_type = declared.to_string();
                }
                def.set_column(column.auto_increment());
            }
        }
    }
    if !primary.is_empty() {
        let columns: Vec<String> = primary.into_iter().map(|(_, name)| name).collect();
        def.add_index(IndexDef::primary_key(columns));
    }

    for index in read_indexes(conn, &stored_name).await? {
        def.add_index(index);
    }

    Ok(Some(def))
}

/// Reads secondary indexes, paired with their SQLite names.
///
/// The automatic index behind a primary key is skipped, as are indexes on
/// expressions.
pub async fn read_named_indexes(
    conn: &mut SqliteConnection,
    table: &str,
) -> Result<Vec<(String, IndexDef)>> {
    let mut list: Vec<IndexInfo> =
        sqlx::query_as("SELECT name, \"unique\", origin FROM pragma_index_list(?1)")
            .bind(table)
            .fetch_all(&mut *conn)
            .await?;
    list.sort();

    let mut indexes = Vec::with_capacity(list.len());
    for (name, unique, origin) in list {
        if origin == "pk" {
            continue;
        }
        let columns: Vec<Option<String>> =
            sqlx::query_scalar("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")
                .bind(&name)
                .fetch_all(&mut *conn)
                .await?;
        let Some(columns) = columns.into_iter().collect::<Option<Vec<String>>>() else {
            continue;
        };
        let kind = if unique != 0 {
            IndexKind::Unique
        } else {
            IndexKind::Index
        };
        indexes.push((name, IndexDef::new(columns, kind)));
    }
    Ok(indexes)
}

async fn read_indexes(conn: &mut SqliteConnection, table: &str) -> Result<Vec<IndexDef>> {
    Ok(read_named_indexes(conn, table)
        .await?
        .into_iter()
        .map(|(_, index)| index)
        .collect())
}
