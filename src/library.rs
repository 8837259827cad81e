//! Composition root: one connection, the three managers, and the wiring that
//! routes each manager's notifications to the others.
//!
//! Notifications are delivered while the emitting action is still running,
//! first to the [`Synchronizer`] and then to subscribed listeners in the order
//! they subscribed.

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

use crate::db::init_schema;
use crate::events::{EntityKind, EventSink, LibraryEvent, Listener};
use crate::manager::{
    ActionError, AuthorStrategy, BookStrategy, CategoryStrategy, DeleteReport, EntityManager,
    Manager,
};
use crate::sync::Synchronizer;

/// Sink handed to the acting manager: applies each event to the other
/// managers, then fans it out to listeners.
struct Dispatch<'a> {
    sync: Synchronizer<'a>,
    listeners: &'a mut [Listener],
}

impl EventSink for Dispatch<'_> {
    fn emit(&mut self, event: LibraryEvent) {
        self.sync.apply(&event);
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

pub struct Library {
    conn: Connection,
    books: Manager<BookStrategy>,
    categories: Manager<CategoryStrategy>,
    authors: Manager<AuthorStrategy>,
    listeners: Vec<Listener>,
}

impl Library {
    /// Initialize the schema on `conn` and load every manager.
    pub fn open(conn: Connection) -> Result<Self> {
        init_schema(&conn).context("failed to initialize schema")?;
        let categories =
            Manager::new(CategoryStrategy, &conn).context("failed to load categories")?;
        let authors = Manager::new(AuthorStrategy, &conn).context("failed to load authors")?;
        let books = Manager::new(BookStrategy, &conn).context("failed to load books")?;

        Ok(Self {
            conn,
            books,
            categories,
            authors,
            listeners: Vec::new(),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Register an observer. Listeners run after the internal wiring, in
    /// subscription order.
    pub fn subscribe(&mut self, listener: impl FnMut(&LibraryEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn books(&self) -> &Manager<BookStrategy> {
        &self.books
    }

    pub fn categories(&self) -> &Manager<CategoryStrategy> {
        &self.categories
    }

    pub fn authors(&self) -> &Manager<AuthorStrategy> {
        &self.authors
    }

    pub fn manager(&self, kind: EntityKind) -> &dyn EntityManager {
        match kind {
            EntityKind::Book => &self.books,
            EntityKind::Category => &self.categories,
            EntityKind::Author => &self.authors,
        }
    }

    pub fn manager_mut(&mut self, kind: EntityKind) -> &mut dyn EntityManager {
        match kind {
            EntityKind::Book => &mut self.books,
            EntityKind::Category => &mut self.categories,
            EntityKind::Author => &mut self.authors,
        }
    }

    pub fn add(&mut self, kind: EntityKind, values: &[String]) -> Result<usize, ActionError> {
        self.route(kind, |manager, conn, sink| manager.add(conn, values, sink))
    }

    /// Apply `values` to the single selected row of `kind`.
    pub fn edit(&mut self, kind: EntityKind, values: &[String]) -> Result<usize, ActionError> {
        self.route(kind, |manager, conn, sink| manager.edit(conn, values, sink))
    }

    /// Delete every selected row of `kind`.
    pub fn delete_selected(&mut self, kind: EntityKind) -> DeleteReport {
        self.route(kind, |manager, conn, sink| manager.delete_selected(conn, sink))
    }

    pub fn delete_rows(&mut self, kind: EntityKind, indices: &[usize]) -> DeleteReport {
        self.route(kind, |manager, conn, sink| {
            manager.delete_rows(conn, indices, sink)
        })
    }

    /// Reload everything from the database. Book counts are recounted from
    /// scratch, discarding any incremental drift.
    pub fn reload(&mut self) -> Result<(), ActionError> {
        self.categories.load(&self.conn)?;
        self.authors.load(&self.conn)?;
        self.books.load(&self.conn)?;
        info!("reloaded library");
        Ok(())
    }

    fn route<R>(
        &mut self,
        kind: EntityKind,
        action: impl FnOnce(&mut dyn EntityManager, &Connection, &mut dyn EventSink) -> R,
    ) -> R {
        let Library {
            conn,
            books,
            categories,
            authors,
            listeners,
        } = self;

        let (source, sync): (&mut dyn EntityManager, Synchronizer<'_>) = match kind {
            EntityKind::Book => (
                books as &mut dyn EntityManager,
                Synchronizer {
                    books: None,
                    authors: Some(authors),
                    categories: Some(categories),
                },
            ),
            EntityKind::Category => (
                categories as &mut dyn EntityManager,
                Synchronizer {
                    books: Some(books),
                    authors: None,
                    categories: None,
                },
            ),
            EntityKind::Author => (
                authors as &mut dyn EntityManager,
                Synchronizer {
                    books: Some(books),
                    authors: None,
                    categories: None,
                },
            ),
        };

        let mut dispatch = Dispatch {
            sync,
            listeners: listeners.as_mut_slice(),
        };
        action(source, &*conn, &mut dispatch)
    }
}
