//! Ratatui front-end: a table list, a row grid, a live search bar, and modal
//! forms for adding, editing, and deleting rows. It plays the presentation,
//! form, file-selection, confirmation, and notification roles for the
//! controller.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
