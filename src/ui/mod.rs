//! Ratatui front-end: a book table with a stats side panel, a full stats
//! screen, and modal dialogs for editing, filtering, and exporting.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
