//! Core library surface for the Library Manager TUI application.
//!
//! Persistence, the per-entity managers and the synchronizer are usable
//! without the terminal front-end, which only drives them through
//! [`Library`].
pub mod config;
pub mod db;
pub mod events;
pub mod library;
pub mod manager;
pub mod models;
pub mod sync;
pub mod table;
pub mod ui;

/// Persistence entry points used by `main.rs` and the tests.
pub use db::{init_schema, open_database, StoreError};

pub use events::{EntityKind, EventBus, EventSink, LibraryEvent};
pub use library::Library;
pub use manager::{ActionError, DeleteReport, EntityManager, Manager, Mode};
pub use models::{Author, Book, BookRecord, Category, DisplayKey};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
