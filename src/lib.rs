//! Core library surface for the book tracker.
//!
//! The catalog lives in an embedded SQLite store (`db`). Filtering, statistics,
//! and export are pure functions over store snapshots, so the `bin` target and
//! the integration tests drive the same pieces.
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod filter;
pub mod logging;
pub mod models;
pub mod stats;
pub mod ui;

/// The persistence layer; every mutation goes through here.
pub use db::BookStore;

pub use error::{BookError, BookResult};

/// The domain types that other layers manipulate.
pub use models::{Book, BookFields, BookId, BookPatch, Field, Status};

pub use export::{decode, encode, export_to_path, ExportFormat, ExportOptions};
pub use filter::{filter, FilterCriteria};
pub use stats::{compute, BucketRule, StatSnapshot};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
