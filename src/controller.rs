//! Orchestrates the connection, schema, row, and filter layers in response to
//! user events, and is the only place where failures become notifications.
//!
//! Forms and confirmations are explicit request/response pairs: a `begin_*`
//! call checks preconditions and returns a request describing what to ask the
//! user, and the matching `finish_*` call takes the user's answer. Requests
//! remember the connection generation they were created under, so an answer
//! that arrives after the database was swapped is refused instead of being
//! written to the wrong file.

use std::path::Path;

use tracing::{info, warn};

use crate::db::{delete_row, describe, fetch_rows, insert_row, list_tables, update_row};
use crate::db::ConnectionManager;
use crate::error::BrowserError;
use crate::filter::{classify, Classification};
use crate::models::{
    CellValue, ColumnDescriptor, FieldValues, Row, RowIdentity, RowSet, TableSchema,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A message for the user: title, body, and how loudly to show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
        }
    }
}

/// Receives user-facing notifications. Calls are fire-and-forget.
pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

impl Notifier for Vec<Notification> {
    fn notify(&mut self, notification: Notification) {
        self.push(notification);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    NoConnection,
    ConnectionReady,
}

/// One input in a form request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub hint: String,
    pub initial: String,
}

/// What the form collaborator should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRequest {
    pub title: String,
    pub fields: Vec<FormField>,
}

impl FormRequest {
    /// One field per writable column. `initial` receives the column's position
    /// in the schema, which is also its position in a fetched row.
    fn new(title: String, schema: &TableSchema, initial: impl Fn(usize) -> String) -> Self {
        let fields = schema
            .writable_columns()
            .map(|(index, column)| FormField {
                name: column.name.clone(),
                hint: column.type_hint(),
                initial: initial(index),
            })
            .collect();
        Self { title, fields }
    }
}

/// The form collaborator's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    Submitted(FieldValues),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub form: FormRequest,
    table: String,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub form: FormRequest,
    pub identity: RowIdentity,
    /// Columns that held NULL when the form was built.
    null_columns: Vec<String>,
    table: String,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub prompt: String,
    pub identity: RowIdentity,
    table: String,
    generation: u64,
}

/// State behind the browser view: the open database, the table list, the
/// active table's schema and rows, and the current search.
#[derive(Default)]
pub struct Controller {
    connections: ConnectionManager,
    tables: Vec<String>,
    schema: Option<TableSchema>,
    rows: RowSet,
    search: String,
    classification: Classification,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ControllerState {
        if self.connections.is_open() {
            ControllerState::ConnectionReady
        } else {
            ControllerState::NoConnection
        }
    }

    pub fn database_path(&self) -> Option<&Path> {
        self.connections.path()
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn active_table(&self) -> Option<&str> {
        self.schema.as_ref().map(|schema| schema.name.as_str())
    }

    pub fn schema(&self) -> Option<&TableSchema> {
        self.schema.as_ref()
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        self.schema
            .as_ref()
            .map(|schema| schema.columns.as_slice())
            .unwrap_or_default()
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn search_term(&self) -> &str {
        &self.search
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Open a database file. On success all table, row, and search state is
    /// reset and the first table (if any) is selected. On failure the previous
    /// database and view are left as they were.
    pub fn open_database(&mut self, path: &Path, notifier: &mut dyn Notifier) -> bool {
        if let Err(err) = self.connections.open(path) {
            self.report(notifier, err);
            return false;
        }

        self.tables.clear();
        self.schema = None;
        self.rows = RowSet::default();
        self.search.clear();
        self.classification = Classification::default();

        notifier.notify(Notification::new(
            "Database opened",
            format!("Connected to database: {}", path.display()),
            Severity::Info,
        ));

        let tables = self.connections.current().and_then(list_tables);
        match tables {
            Ok(tables) => self.tables = tables,
            Err(err) => {
                self.report(notifier, err);
                return true;
            }
        }

        if let Some(first) = self.tables.first().cloned() {
            self.select_table(&first, notifier);
        }
        true
    }

    /// Make `name` the active table, loading its schema and rows. The previous
    /// view stays in place if loading fails.
    pub fn select_table(&mut self, name: &str, notifier: &mut dyn Notifier) -> bool {
        let loaded = self.connections.current().and_then(|conn| {
            let schema = describe(conn, name)?;
            let rows = fetch_rows(conn, &schema)?;
            Ok((schema, rows))
        });

        match loaded {
            Ok((schema, rows)) => {
                info!(table = name, rows = rows.len(), "table selected");
                if rows.truncated {
                    notifier.notify(Notification::new(
                        "Large table",
                        format!("Showing the first {} rows of `{name}`.", rows.len()),
                        Severity::Info,
                    ));
                }
                self.schema = Some(schema);
                self.rows = rows;
                self.reclassify();
                true
            }
            Err(err) => {
                self.report(notifier, err);
                false
            }
        }
    }

    /// Reload the active table's rows.
    pub fn refresh(&mut self, notifier: &mut dyn Notifier) -> bool {
        match self.active_table().map(str::to_string) {
            Some(table) => self.select_table(&table, notifier),
            None => {
                self.warn(notifier, "No table selected", "Choose a table first.");
                false
            }
        }
    }

    /// Replace the search term and reclassify every loaded row.
    pub fn set_search(&mut self, term: &str) -> &Classification {
        self.search = term.to_string();
        self.reclassify();
        &self.classification
    }

    pub fn begin_add(&self, notifier: &mut dyn Notifier) -> Option<AddRequest> {
        let schema = self.require_table(notifier)?;
        Some(AddRequest {
            form: FormRequest::new(
                format!("Add row to {}", schema.name),
                schema,
                |_| String::new(),
            ),
            table: schema.name.clone(),
            generation: self.connections.generation(),
        })
    }

    pub fn finish_add(
        &mut self,
        request: AddRequest,
        outcome: FormOutcome,
        notifier: &mut dyn Notifier,
    ) -> bool {
        let FormOutcome::Submitted(fields) = outcome else {
            return false;
        };

        let result = self.checked_schema(&request.table, request.generation).and_then(
            |(conn, schema)| insert_row(conn, schema, &fields),
        );
        self.finish_write(result, "Row added.", notifier)
    }

    /// Prepare an edit of the row at `selected` in the current view.
    pub fn begin_edit(
        &self,
        selected: Option<usize>,
        notifier: &mut dyn Notifier,
    ) -> Option<EditRequest> {
        let (schema, row, identity) = self.require_targetable_row(selected, "edit", notifier)?;
        let null_columns = schema
            .writable_columns()
            .filter(|(index, _)| row.values.get(*index).is_some_and(CellValue::is_null))
            .map(|(_, column)| column.name.clone())
            .collect();
        Some(EditRequest {
            form: FormRequest::new(format!("Edit row in {}", schema.name), schema, |i| {
                row.values.get(i).map(|value| value.form_text()).unwrap_or_default()
            }),
            identity,
            null_columns,
            table: schema.name.clone(),
            generation: self.connections.generation(),
        })
    }

    pub fn finish_edit(
        &mut self,
        request: EditRequest,
        outcome: FormOutcome,
        notifier: &mut dyn Notifier,
    ) -> bool {
        let FormOutcome::Submitted(fields) = outcome else {
            return false;
        };

        // A NULL cell shows as an empty field; leaving it empty keeps the NULL.
        let fields: FieldValues = fields
            .iter()
            .filter(|(name, value)| {
                !(value.is_empty() && request.null_columns.iter().any(|column| column == name))
            })
            .collect();

        let result = self
            .checked_schema(&request.table, request.generation)
            .and_then(|(conn, schema)| {
                if fields.is_empty() {
                    Ok(())
                } else {
                    update_row(conn, schema, request.identity, &fields)
                }
            });
        self.finish_write(result, "Row updated.", notifier)
    }

    /// Prepare deletion of the row at `selected`. The caller must get a
    /// confirmation before calling [`Controller::finish_delete`].
    pub fn begin_delete(
        &self,
        selected: Option<usize>,
        notifier: &mut dyn Notifier,
    ) -> Option<DeleteRequest> {
        let (schema, _, identity) = self.require_targetable_row(selected, "delete", notifier)?;
        Some(DeleteRequest {
            prompt: format!("Delete row {identity} from {}?", schema.name),
            identity,
            table: schema.name.clone(),
            generation: self.connections.generation(),
        })
    }

    pub fn finish_delete(
        &mut self,
        request: DeleteRequest,
        confirmed: bool,
        notifier: &mut dyn Notifier,
    ) -> bool {
        if !confirmed {
            return false;
        }

        let result = self.checked_schema(&request.table, request.generation).and_then(
            |(conn, schema)| delete_row(conn, schema, request.identity),
        );
        self.finish_write(result, "Row deleted.", notifier)
    }

    fn finish_write(
        &mut self,
        result: crate::error::Result<()>,
        success: &str,
        notifier: &mut dyn Notifier,
    ) -> bool {
        if let Err(err) = result {
            self.report(notifier, err);
            return false;
        }

        self.refresh(notifier);
        notifier.notify(Notification::new("Success", success, Severity::Info));
        true
    }

    /// The live connection and active schema, provided both still match what
    /// the request was built against.
    fn checked_schema(
        &self,
        table: &str,
        generation: u64,
    ) -> crate::error::Result<(&rusqlite::Connection, &TableSchema)> {
        let conn = self.connections.ensure_generation(generation)?;
        match &self.schema {
            Some(schema) if schema.name == table => Ok((conn, schema)),
            _ => Err(BrowserError::connection(format!(
                "table `{table}` is no longer the active table"
            ))),
        }
    }

    fn require_table(&self, notifier: &mut dyn Notifier) -> Option<&TableSchema> {
        if !self.connections.is_open() {
            self.warn(notifier, "No database", "Open a database first.");
            return None;
        }
        if self.schema.is_none() {
            self.warn(notifier, "No table selected", "Choose a table first.");
        }
        self.schema.as_ref()
    }

    fn require_targetable_row(
        &self,
        selected: Option<usize>,
        action: &str,
        notifier: &mut dyn Notifier,
    ) -> Option<(&TableSchema, &Row, RowIdentity)> {
        let schema = self.require_table(notifier)?;
        if !schema.has_identity() {
            self.warn(
                notifier,
                "Read-only table",
                format!(
                    "`{}` has no rowid, so its rows cannot be targeted for {action}.",
                    schema.name
                ),
            );
            return None;
        }

        let Some(row) = selected.and_then(|index| self.rows.get(index)) else {
            self.warn(
                notifier,
                "No row selected",
                format!("Select a row to {action}."),
            );
            return None;
        };
        let Some(identity) = row.identity else {
            self.warn(
                notifier,
                "Read-only row",
                "The selected row has no rowid.",
            );
            return None;
        };
        Some((schema, row, identity))
    }

    fn reclassify(&mut self) {
        self.classification = classify(&self.rows, &self.search);
    }

    fn warn(&self, notifier: &mut dyn Notifier, title: &str, message: impl Into<String>) {
        notifier.notify(Notification::new(title, message, Severity::Warning));
    }

    fn report(&self, notifier: &mut dyn Notifier, err: BrowserError) {
        warn!(kind = err.kind(), error = %err.detail(), "operation failed");
        notifier.notify(Notification::new(err.kind(), err.detail(), Severity::Error));
    }
}
