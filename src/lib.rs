//! Core library surface for the SQLite browser.
//!
//! The engine opens an arbitrary SQLite file, discovers its tables and columns
//! at runtime, loads a bounded snapshot of rows, classifies them against a
//! live search term, and writes single-row inserts, updates, and deletes
//! through parameterized statements. The `ui` module is one front-end for it.
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod filter;
pub mod logging;
pub mod models;
pub mod ui;

/// The orchestration entry point and its collaborator contracts.
pub use controller::{
    Controller, ControllerState, FormOutcome, FormRequest, Notification, Notifier, Severity,
};

/// Failure taxonomy shared by every layer.
pub use error::{BrowserError, Result};

/// Data that flows between the layers.
pub use models::{CellValue, ColumnDescriptor, FieldValues, Row, RowIdentity, RowSet, TableSchema};

/// The interactive application and its event loop.
pub use ui::{run_app, App};
