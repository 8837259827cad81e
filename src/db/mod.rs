//! Persistence gateway split across logical submodules. Every helper runs a
//! single statement against the shared connection, so each call commits on
//! its own.

mod authors;
mod books;
mod categories;
mod connection;
mod error;

pub use authors::{create_author, delete_author, fetch_author, fetch_authors, update_author};
pub use books::{create_book, delete_book, fetch_book, fetch_books, update_book};
pub use categories::{
    create_category, delete_category, fetch_categories, fetch_category, update_category,
};
pub use connection::{default_database_path, init_schema, open_database};
pub use error::{StoreError, StoreResult};
