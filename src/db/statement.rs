//! Typed INSERT/UPDATE/DELETE commands for tables discovered at runtime.
//!
//! Column and table names come from schema introspection and are quoted into
//! the SQL text. Values never are: every value, including the row identity, is
//! bound as a numbered parameter.

use std::collections::HashSet;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use super::schema::quote_identifier;
use crate::error::{BrowserError, Result};
use crate::models::{RowIdentity, TableSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Insert,
    Update,
    Delete,
}

impl CommandKind {
    fn verb(self) -> &'static str {
        match self {
            CommandKind::Insert => "insert into",
            CommandKind::Update => "update",
            CommandKind::Delete => "delete from",
        }
    }
}

/// A write against one table, checked by [`WriteCommand::validate`] before it
/// is rendered or executed.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteCommand {
    pub kind: CommandKind,
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Value>,
    pub identity: Option<RowIdentity>,
}

impl WriteCommand {
    pub fn insert(table: &str, assignments: Vec<(String, Value)>) -> Self {
        let (columns, values) = assignments.into_iter().unzip();
        Self {
            kind: CommandKind::Insert,
            table: table.to_string(),
            columns,
            values,
            identity: None,
        }
    }

    pub fn update(table: &str, identity: RowIdentity, assignments: Vec<(String, Value)>) -> Self {
        let (columns, values) = assignments.into_iter().unzip();
        Self {
            kind: CommandKind::Update,
            table: table.to_string(),
            columns,
            values,
            identity: Some(identity),
        }
    }

    pub fn delete(table: &str, identity: RowIdentity) -> Self {
        Self {
            kind: CommandKind::Delete,
            table: table.to_string(),
            columns: Vec::new(),
            values: Vec::new(),
            identity: Some(identity),
        }
    }

    /// Check the command against the table it targets.
    pub fn validate(&self, schema: &TableSchema) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(BrowserError::write("table name cannot be empty"));
        }
        if self.table != schema.name {
            return Err(BrowserError::write(format!(
                "command targets `{}` but schema describes `{}`",
                self.table, schema.name
            )));
        }
        if self.columns.len() != self.values.len() {
            return Err(BrowserError::write(format!(
                "{} columns but {} values",
                self.columns.len(),
                self.values.len()
            )));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            match schema.column(column) {
                None => {
                    return Err(BrowserError::write(format!(
                        "table `{}` has no column `{column}`",
                        self.table
                    )));
                }
                Some(descriptor) if descriptor.generated => {
                    return Err(BrowserError::write(format!(
                        "column `{column}` is generated and cannot be written"
                    )));
                }
                Some(_) => {}
            }
            if !seen.insert(column.as_str()) {
                return Err(BrowserError::write(format!(
                    "column `{column}` is assigned twice"
                )));
            }
        }

        match self.kind {
            CommandKind::Insert => Ok(()),
            CommandKind::Update | CommandKind::Delete => {
                if self.kind == CommandKind::Update && self.columns.is_empty() {
                    return Err(BrowserError::write("nothing to update"));
                }
                if self.identity.is_none() {
                    return Err(BrowserError::write("no row identity to target"));
                }
                if !schema.has_identity() {
                    return Err(BrowserError::write(format!(
                        "table `{}` has no row identity; rows cannot be targeted",
                        self.table
                    )));
                }
                Ok(())
            }
        }
    }

    /// Render the statement text. `identity_alias` is the rowid name from the
    /// table schema and is only used by UPDATE and DELETE.
    pub fn to_sql(&self, identity_alias: &str) -> String {
        let table = quote_identifier(&self.table);
        match self.kind {
            CommandKind::Insert if self.columns.is_empty() => {
                format!("INSERT INTO {table} DEFAULT VALUES")
            }
            CommandKind::Insert => {
                let columns = self
                    .columns
                    .iter()
                    .map(|column| quote_identifier(column))
                    .collect::<Vec<_>>()
                    .join(", ");
                let placeholders = (1..=self.columns.len())
                    .map(|index| format!("?{index}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})")
            }
            CommandKind::Update => {
                let assignments = self
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(index, column)| format!("{} = ?{}", quote_identifier(column), index + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "UPDATE {table} SET {assignments} WHERE {identity_alias} = ?{}",
                    self.columns.len() + 1
                )
            }
            CommandKind::Delete => {
                format!("DELETE FROM {table} WHERE {identity_alias} = ?1")
            }
        }
    }

    /// Bound parameters in placeholder order; the identity always comes last.
    pub fn parameters(&self) -> Vec<Value> {
        let mut parameters = self.values.clone();
        if let Some(identity) = self.identity {
            if self.kind != CommandKind::Insert {
                parameters.push(Value::Integer(identity.0));
            }
        }
        parameters
    }

    /// Validate, then run the statement. Each call commits on its own.
    /// Returns the number of affected rows.
    pub fn execute(&self, conn: &Connection, schema: &TableSchema) -> Result<usize> {
        self.validate(schema)?;
        let sql = self.to_sql(schema.identity_alias.unwrap_or("rowid"));
        debug!(kind = ?self.kind, table = %self.table, %sql, "executing write");

        conn.execute(&sql, params_from_iter(self.parameters()))
            .map_err(|err| {
                BrowserError::write(format!("failed to {} `{}`", self.kind.verb(), self.table))
                    .with_source(err)
            })
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::types::Value;

    use super::{CommandKind, WriteCommand};
    use crate::error::BrowserError;
    use crate::models::{ColumnDescriptor, RowIdentity, TableSchema};

    fn column(name: &str, ordinal: usize) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.to_string(),
            ordinal,
            declared_type: String::new(),
            not_null: false,
            default_value: None,
            primary_key: 0,
            generated: false,
        }
    }

    fn users(identity_alias: Option<&'static str>) -> TableSchema {
        TableSchema {
            name: "users".to_string(),
            columns: vec![column("id", 0), column("name", 1)],
            identity_alias,
        }
    }

    fn text(value: &str) -> Value {
        Value::Text(value.to_string())
    }

    #[test]
    fn renders_insert_with_numbered_placeholders() {
        let command = WriteCommand::insert(
            "users",
            vec![("id".into(), text("4")), ("name".into(), text("Dee"))],
        );
        command.validate(&users(Some("rowid"))).expect("valid insert");
        assert_eq!(
            command.to_sql("rowid"),
            "INSERT INTO \"users\" (\"id\", \"name\") VALUES (?1, ?2)"
        );
        assert_eq!(command.parameters(), vec![text("4"), text("Dee")]);
    }

    #[test]
    fn empty_insert_uses_default_values() {
        let command = WriteCommand::insert("users", Vec::new());
        assert_eq!(command.to_sql("rowid"), "INSERT INTO \"users\" DEFAULT VALUES");
    }

    #[test]
    fn renders_update_with_identity_as_last_parameter() {
        let command = WriteCommand::update(
            "users",
            RowIdentity(2),
            vec![("name".into(), text("Bea"))],
        );
        command.validate(&users(Some("_rowid_"))).expect("valid update");
        assert_eq!(
            command.to_sql("_rowid_"),
            "UPDATE \"users\" SET \"name\" = ?1 WHERE _rowid_ = ?2"
        );
        assert_eq!(command.parameters(), vec![text("Bea"), Value::Integer(2)]);
    }

    #[test]
    fn renders_delete_by_identity() {
        let command = WriteCommand::delete("users", RowIdentity(9));
        assert_eq!(command.kind, CommandKind::Delete);
        assert_eq!(command.to_sql("rowid"), "DELETE FROM \"users\" WHERE rowid = ?1");
        assert_eq!(command.parameters(), vec![Value::Integer(9)]);
    }

    #[test]
    fn quotes_hostile_column_names() {
        let schema = TableSchema {
            name: "odd table".into(),
            columns: vec![column("we\"ird", 0)],
            identity_alias: Some("rowid"),
        };
        let command = WriteCommand::insert("odd table", vec![("we\"ird".into(), text("x"))]);
        command.validate(&schema).expect("valid");
        assert_eq!(
            command.to_sql("rowid"),
            "INSERT INTO \"odd table\" (\"we\"\"ird\") VALUES (?1)"
        );
    }

    #[test]
    fn rejects_unknown_and_repeated_columns() {
        let schema = users(Some("rowid"));

        let unknown = WriteCommand::insert("users", vec![("email".into(), text("a@b"))]);
        assert!(matches!(
            unknown.validate(&schema),
            Err(BrowserError::Write { .. })
        ));

        let repeated = WriteCommand::insert(
            "users",
            vec![("name".into(), text("a")), ("name".into(), text("b"))],
        );
        assert!(repeated.validate(&schema).is_err());
    }

    #[test]
    fn rejects_writes_to_generated_columns() {
        let mut schema = users(Some("rowid"));
        schema.columns[1].generated = true;

        let insert = WriteCommand::insert("users", vec![("name".into(), text("x"))]);
        let update = WriteCommand::update("users", RowIdentity(1), vec![("name".into(), text("x"))]);
        assert!(matches!(insert.validate(&schema), Err(BrowserError::Write { .. })));
        assert!(update.validate(&schema).is_err());
    }

    #[test]
    fn rejects_targeted_writes_without_row_identity() {
        let schema = users(None);
        let update = WriteCommand::update("users", RowIdentity(1), vec![("name".into(), text("x"))]);
        let delete = WriteCommand::delete("users", RowIdentity(1));

        assert!(update.validate(&schema).is_err());
        assert!(delete.validate(&schema).is_err());
        WriteCommand::insert("users", vec![("name".into(), text("x"))])
            .validate(&schema)
            .expect("inserts need no identity");
    }

    #[test]
    fn rejects_empty_update_and_mismatched_table() {
        let schema = users(Some("rowid"));
        let empty = WriteCommand::update("users", RowIdentity(1), Vec::new());
        assert!(empty.validate(&schema).is_err());

        let other = WriteCommand::delete("orders", RowIdentity(1));
        assert!(other.validate(&schema).is_err());
    }
}
