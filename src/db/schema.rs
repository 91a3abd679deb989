use rusqlite::Connection;
use tracing::debug;

use crate::error::{BrowserError, Result};
use crate::models::{ColumnDescriptor, TableSchema};

/// Names SQLite answers to for the rowid, tried in order. A declared column
/// with the same name shadows the alias.
const IDENTITY_ALIASES: [&str; 3] = ["rowid", "_rowid_", "oid"];

/// Quote an identifier for interpolation into SQL text.
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// List user tables in catalog order. Everything under the reserved `sqlite_`
/// prefix (sequence and statistics bookkeeping) is left out.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'",
        )
        .map_err(|err| BrowserError::schema("failed to prepare table list query").with_source(err))?;

    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|err| BrowserError::schema("failed to list tables").with_source(err))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| BrowserError::schema("failed to read table names").with_source(err))?;

    debug!(count = tables.len(), "listed tables");
    Ok(tables)
}

/// Return the columns of `table` in declaration order, generated columns
/// included so they line up with `SELECT *`.
///
/// `pragma_table_xinfo` silently yields nothing for unknown tables, so the
/// catalog is checked first to tell "missing" apart from "no columns". Hidden
/// 1 marks virtual-table hidden columns; 2 and 3 are generated columns.
pub fn list_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnDescriptor>> {
    ensure_table_exists(conn, table)?;

    let mut stmt = conn
        .prepare(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk, hidden
             FROM pragma_table_xinfo(?1)
             WHERE hidden IN (0, 2, 3)
             ORDER BY cid",
        )
        .map_err(|err| {
            BrowserError::schema(format!("failed to prepare column query for `{table}`"))
                .with_source(err)
        })?;

    let columns = stmt
        .query_map([table], |row| {
            let ordinal: i64 = row.get(0)?;
            let declared_type: Option<String> = row.get(2)?;
            let not_null: i64 = row.get(3)?;
            let primary_key: i64 = row.get(5)?;
            let hidden: i64 = row.get(6)?;
            Ok(ColumnDescriptor {
                name: row.get(1)?,
                ordinal: usize::try_from(ordinal).unwrap_or_default(),
                declared_type: declared_type.unwrap_or_default(),
                not_null: not_null != 0,
                default_value: row.get(4)?,
                primary_key: u32::try_from(primary_key).unwrap_or_default(),
                generated: hidden != 0,
            })
        })
        .map_err(|err| {
            BrowserError::schema(format!("failed to read columns of `{table}`")).with_source(err)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| {
            BrowserError::schema(format!("failed to collect columns of `{table}`"))
                .with_source(err)
        })?;

    debug!(table, count = columns.len(), "listed columns");
    Ok(columns)
}

/// Find a name that reaches the rowid of `table`, or `None` when the table has
/// no usable rowid (`WITHOUT ROWID`, or every alias shadowed by a column).
pub fn row_identity(
    conn: &Connection,
    table: &str,
    columns: &[ColumnDescriptor],
) -> Option<&'static str> {
    let alias = IDENTITY_ALIASES.into_iter().find(|alias| {
        !columns
            .iter()
            .any(|column| column.name.eq_ignore_ascii_case(alias))
    })?;

    let probe = format!("SELECT {alias} FROM {} LIMIT 0", quote_identifier(table));
    match conn.prepare(&probe) {
        Ok(_) => Some(alias),
        Err(err) => {
            debug!(table, error = %err, "table has no usable rowid");
            None
        }
    }
}

/// Columns plus identity for one table.
pub fn describe(conn: &Connection, table: &str) -> Result<TableSchema> {
    let columns = list_columns(conn, table)?;
    let identity_alias = row_identity(conn, table, &columns);
    Ok(TableSchema {
        name: table.to_string(),
        columns,
        identity_alias,
    })
}

fn ensure_table_exists(conn: &Connection, table: &str) -> Result<()> {
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table],
            |row| row.get(0),
        )
        .map_err(|err| {
            BrowserError::schema(format!("failed to look up table `{table}`")).with_source(err)
        })?;

    if exists {
        Ok(())
    } else {
        Err(BrowserError::schema(format!("table `{table}` does not exist")))
    }
}
