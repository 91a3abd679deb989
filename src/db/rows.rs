use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::{debug, info};

use super::schema::quote_identifier;
use super::statement::WriteCommand;
use crate::error::{BrowserError, Result};
use crate::models::{CellValue, FieldValues, Row, RowIdentity, RowSet, TableSchema};

/// Maximum number of rows loaded into one view.
pub const ROW_LIMIT: usize = 500;

/// Load at most [`ROW_LIMIT`] rows in storage order.
///
/// Columns are selected by name from `schema.columns`, so the values line up
/// with the descriptors. When the table has a rowid it is selected first and
/// lifted out of the value list into [`Row::identity`]. One extra row is
/// requested so the caller can tell the view was capped.
pub fn fetch_rows(conn: &Connection, schema: &TableSchema) -> Result<RowSet> {
    let table = quote_identifier(&schema.name);
    let mut selected: Vec<String> = schema.identity_alias.map(str::to_string).into_iter().collect();
    if schema.columns.is_empty() {
        selected.push("*".to_string());
    } else {
        selected.extend(schema.columns.iter().map(|column| quote_identifier(&column.name)));
    }
    let sql = format!(
        "SELECT {} FROM {table} LIMIT {}",
        selected.join(", "),
        ROW_LIMIT + 1
    );

    let mut stmt = conn.prepare(&sql).map_err(|err| {
        BrowserError::query(format!("failed to prepare select on `{}`", schema.name))
            .with_source(err)
    })?;
    let column_count = stmt.column_count();
    let has_identity = schema.identity_alias.is_some();

    let mut rows = stmt
        .query_map([], |row| {
            let mut values = Vec::with_capacity(column_count);
            let mut identity = None;
            for index in 0..column_count {
                let value = CellValue::from(row.get_ref(index)?);
                if has_identity && index == 0 {
                    if let CellValue::Integer(rowid) = value {
                        identity = Some(RowIdentity(rowid));
                    }
                } else {
                    values.push(value);
                }
            }
            Ok(Row { identity, values })
        })
        .map_err(|err| {
            BrowserError::query(format!("failed to select from `{}`", schema.name))
                .with_source(err)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| {
            BrowserError::query(format!("failed to read rows of `{}`", schema.name))
                .with_source(err)
        })?;

    let truncated = rows.len() > ROW_LIMIT;
    rows.truncate(ROW_LIMIT);
    debug!(table = %schema.name, count = rows.len(), truncated, "fetched rows");

    Ok(RowSet {
        table: schema.name.clone(),
        rows,
        truncated,
    })
}

/// Insert one row. Every field is bound as text exactly as given and converted
/// by the column's type affinity. A blank `INTEGER PRIMARY KEY` field is left
/// out so SQLite assigns the rowid.
pub fn insert_row(conn: &Connection, schema: &TableSchema, fields: &FieldValues) -> Result<()> {
    let rowid_column = schema.rowid_column().map(|column| column.name.as_str());
    let assignments = fields
        .iter()
        .filter(|(name, value)| !(Some(*name) == rowid_column && value.trim().is_empty()))
        .map(|(name, value)| (name.to_string(), Value::Text(value.to_string())))
        .collect();

    WriteCommand::insert(&schema.name, assignments).execute(conn, schema)?;
    info!(table = %schema.name, rowid = conn.last_insert_rowid(), "row inserted");
    Ok(())
}

/// Overwrite the given fields of the row with `identity`, each bound as text
/// exactly as given. Columns missing from `fields` keep their values.
pub fn update_row(
    conn: &Connection,
    schema: &TableSchema,
    identity: RowIdentity,
    fields: &FieldValues,
) -> Result<()> {
    let assignments = fields
        .iter()
        .map(|(name, value)| (name.to_string(), Value::Text(value.to_string())))
        .collect();

    let updated = WriteCommand::update(&schema.name, identity, assignments).execute(conn, schema)?;
    if updated == 0 {
        return Err(missing_row(schema, identity));
    }
    info!(table = %schema.name, %identity, "row updated");
    Ok(())
}

/// Delete the row with `identity`. Asking the user first is the caller's job.
pub fn delete_row(conn: &Connection, schema: &TableSchema, identity: RowIdentity) -> Result<()> {
    let deleted = WriteCommand::delete(&schema.name, identity).execute(conn, schema)?;
    if deleted == 0 {
        return Err(missing_row(schema, identity));
    }
    info!(table = %schema.name, %identity, "row deleted");
    Ok(())
}

fn missing_row(schema: &TableSchema, identity: RowIdentity) -> BrowserError {
    BrowserError::write(format!(
        "row {identity} of `{}` no longer exists",
        schema.name
    ))
}
