//! Persistence module split across logical submodules: the connection owner,
//! schema introspection, bounded reads and row writes, and the statement
//! builder those writes go through.

mod connection;
mod rows;
mod schema;
mod statement;

pub use connection::ConnectionManager;
pub use rows::{delete_row, fetch_rows, insert_row, update_row, ROW_LIMIT};
pub use schema::{describe, list_columns, list_tables, quote_identifier, row_identity};
pub use statement::{CommandKind, WriteCommand};
