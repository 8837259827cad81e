//! Change notifications managers emit after a successful store call, plus the
//! sinks that receive them.

use std::collections::VecDeque;
use std::fmt;

use crate::models::{BookRefs, DisplayKey};

/// The three record types the library manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Book,
    Category,
    Author,
}

impl EntityKind {
    /// Tab order used by the front-end.
    pub const ALL: [EntityKind; 3] = [EntityKind::Book, EntityKind::Category, EntityKind::Author];

    pub fn index(self) -> usize {
        match self {
            EntityKind::Book => 0,
            EntityKind::Category => 1,
            EntityKind::Author => 2,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            EntityKind::Book => "Books",
            EntityKind::Category => "Categories",
            EntityKind::Author => "Authors",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Book => "book",
            EntityKind::Category => "category",
            EntityKind::Author => "author",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    CategoryAdded(DisplayKey),
    CategoryDeleted(DisplayKey),
    CategoryEdited {
        before: DisplayKey,
        after: DisplayKey,
    },
    AuthorAdded(DisplayKey),
    AuthorDeleted(DisplayKey),
    AuthorEdited {
        before: DisplayKey,
        after: DisplayKey,
    },
    BookAdded {
        key: DisplayKey,
        refs: BookRefs,
    },
    BookDeleted {
        key: DisplayKey,
        refs: BookRefs,
    },
    BookEdited {
        before: DisplayKey,
        after: DisplayKey,
        old_refs: BookRefs,
        new_refs: BookRefs,
    },
}

impl LibraryEvent {
    /// Which manager emitted the event.
    pub fn source(&self) -> EntityKind {
        match self {
            LibraryEvent::CategoryAdded(_)
            | LibraryEvent::CategoryDeleted(_)
            | LibraryEvent::CategoryEdited { .. } => EntityKind::Category,
            LibraryEvent::AuthorAdded(_)
            | LibraryEvent::AuthorDeleted(_)
            | LibraryEvent::AuthorEdited { .. } => EntityKind::Author,
            LibraryEvent::BookAdded { .. }
            | LibraryEvent::BookDeleted { .. }
            | LibraryEvent::BookEdited { .. } => EntityKind::Book,
        }
    }
}

/// Receives notifications synchronously, in emission order.
pub trait EventSink {
    fn emit(&mut self, event: LibraryEvent);
}

/// External observer registered on the library.
pub type Listener = Box<dyn FnMut(&LibraryEvent)>;

/// Sink that just queues events. Handy when a manager runs on its own.
#[derive(Debug, Default)]
pub struct EventBus {
    pending: VecDeque<LibraryEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = LibraryEvent> + '_ {
        self.pending.drain(..)
    }
}

impl EventSink for EventBus {
    fn emit(&mut self, event: LibraryEvent) {
        self.pending.push_back(event);
    }
}
