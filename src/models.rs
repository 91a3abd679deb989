//! Data carried between the database layer, the filter, the controller, and the
//! terminal front-end. Nothing here knows about a particular schema: tables,
//! columns, and values are all discovered at runtime.

use std::fmt;

use rusqlite::types::ValueRef;

/// Storage-level row identity (SQLite's rowid). Updates and deletes target rows
/// by this value rather than by any declared key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowIdentity(pub i64);

impl fmt::Display for RowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Column metadata as reported by `pragma_table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Zero-based declaration order.
    pub ordinal: usize,
    /// Declared type text, empty when the column was declared without one.
    pub declared_type: String,
    pub not_null: bool,
    /// Default expression exactly as written in the schema.
    pub default_value: Option<String>,
    /// One-based position within the primary key, zero when not part of it.
    pub primary_key: u32,
    /// Computed by a `GENERATED ALWAYS AS` expression; never written.
    pub generated: bool,
}

impl ColumnDescriptor {
    /// Short hint shown next to the field in add/edit forms.
    pub fn type_hint(&self) -> String {
        let mut parts = Vec::new();
        if !self.declared_type.is_empty() {
            parts.push(self.declared_type.clone());
        }
        if self.primary_key > 0 {
            parts.push("PK".to_string());
        }
        if self.not_null {
            parts.push("NOT NULL".to_string());
        }
        if let Some(default) = &self.default_value {
            parts.push(format!("DEFAULT {default}"));
        }
        if self.generated {
            parts.push("GENERATED".to_string());
        }
        parts.join(" ")
    }
}

/// Everything the repository needs to know about one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    /// Name used to reach the rowid (`rowid`, `_rowid_` or `oid`), or `None`
    /// for `WITHOUT ROWID` tables.
    pub identity_alias: Option<&'static str>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn has_identity(&self) -> bool {
        self.identity_alias.is_some()
    }

    /// Columns a form may write, in declaration order, with their positions
    /// in `columns`.
    pub fn writable_columns(&self) -> impl Iterator<Item = (usize, &ColumnDescriptor)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, column)| !column.generated)
    }

    /// The `INTEGER PRIMARY KEY` column that aliases the rowid, if any.
    pub fn rowid_column(&self) -> Option<&ColumnDescriptor> {
        if !self.has_identity() {
            return None;
        }
        let mut keys = self.columns.iter().filter(|column| column.primary_key > 0);
        let key = keys.next()?;
        if keys.next().is_some() || !key.declared_type.eq_ignore_ascii_case("INTEGER") {
            return None;
        }
        Some(key)
    }
}

/// A single cell read from SQLite.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl CellValue {
    /// Text used to pre-fill an edit form. NULL becomes an empty field.
    pub fn form_text(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Integer(value) => write!(f, "{value}"),
            // Keep a fractional digit so 2.0 does not read as an integer.
            CellValue::Real(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{value:.1}")
            }
            CellValue::Real(value) => write!(f, "{value}"),
            CellValue::Text(value) => write!(f, "{value}"),
            CellValue::Blob(bytes) => write!(f, "<blob: {} bytes>", bytes.len()),
        }
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(value) => CellValue::Integer(value),
            ValueRef::Real(value) => CellValue::Real(value),
            ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => CellValue::Blob(bytes.to_vec()),
        }
    }
}

/// One displayed row: values aligned with the table's columns plus the rowid
/// captured when the row was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub identity: Option<RowIdentity>,
    pub values: Vec<CellValue>,
}

impl Row {
    /// Stringified values in column order, as shown in the grid.
    pub fn display_values(&self) -> Vec<String> {
        self.values.iter().map(ToString::to_string).collect()
    }
}

/// The bounded snapshot shown for one table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowSet {
    pub table: String,
    pub rows: Vec<Row>,
    /// Set when the table held more rows than the view cap.
    pub truncated: bool,
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn find(&self, identity: RowIdentity) -> Option<&Row> {
        self.rows.iter().find(|row| row.identity == Some(identity))
    }
}

/// Ordered column-name to user-input mapping produced by a form. Insertion
/// order is preserved and follows the column order the form was built from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldValues {
    entries: Vec<(String, String)>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, keeping its original position when it already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(field, _)| *field == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FieldValues::new();
        for (name, value) in iter {
            values.insert(name, value);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::{CellValue, ColumnDescriptor, FieldValues, TableSchema};

    #[test]
    fn field_values_keep_first_insertion_position() {
        let mut values = FieldValues::new();
        values.insert("id", "1");
        values.insert("name", "Ann");
        values.insert("id", "7");

        let collected: Vec<_> = values.iter().collect();
        assert_eq!(collected, vec![("id", "7"), ("name", "Ann")]);
        assert_eq!(values.get("name"), Some("Ann"));
        assert_eq!(values.get("missing"), None);
    }

    #[test]
    fn cells_stringify_for_display_and_forms() {
        assert_eq!(CellValue::Null.to_string(), "NULL");
        assert_eq!(CellValue::Null.form_text(), "");
        assert_eq!(CellValue::Integer(42).to_string(), "42");
        assert_eq!(CellValue::Real(1.5).to_string(), "1.5");
        assert_eq!(CellValue::Real(2.0).to_string(), "2.0");
        assert_eq!(CellValue::Real(-3.0).form_text(), "-3.0");
        assert_eq!(CellValue::Text("Ann".into()).form_text(), "Ann");
        assert_eq!(CellValue::Blob(vec![0, 1, 2]).to_string(), "<blob: 3 bytes>");
    }

    #[test]
    fn type_hint_lists_constraints() {
        let column = ColumnDescriptor {
            name: "id".into(),
            ordinal: 0,
            declared_type: "INTEGER".into(),
            not_null: true,
            default_value: Some("0".into()),
            primary_key: 1,
            generated: false,
        };
        assert_eq!(column.type_hint(), "INTEGER PK NOT NULL DEFAULT 0");
    }

    fn column(
        name: &str,
        declared_type: &str,
        primary_key: u32,
        generated: bool,
    ) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            ordinal: 0,
            declared_type: declared_type.into(),
            not_null: false,
            default_value: None,
            primary_key,
            generated,
        }
    }

    #[test]
    fn rowid_column_needs_a_single_integer_key() {
        let mut schema = TableSchema {
            name: "t".into(),
            columns: vec![column("id", "integer", 1, false), column("name", "TEXT", 0, false)],
            identity_alias: Some("rowid"),
        };
        assert_eq!(schema.rowid_column().map(|c| c.name.as_str()), Some("id"));

        schema.columns[0].declared_type = "INT".into();
        assert!(schema.rowid_column().is_none());

        schema.columns[0].declared_type = "INTEGER".into();
        schema.identity_alias = None;
        assert!(schema.rowid_column().is_none());
    }

    #[test]
    fn generated_columns_are_not_writable() {
        let schema = TableSchema {
            name: "g".into(),
            columns: vec![
                column("a", "INTEGER", 0, false),
                column("b", "INTEGER", 0, true),
                column("c", "TEXT", 0, false),
            ],
            identity_alias: Some("rowid"),
        };
        let writable: Vec<_> = schema
            .writable_columns()
            .map(|(index, column)| (index, column.name.as_str()))
            .collect();
        assert_eq!(writable, vec![(0, "a"), (2, "c")]);
    }
}
