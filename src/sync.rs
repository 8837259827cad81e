//! Keeps the managers consistent with each other after a change, without
//! querying the database again.
//!
//! Category and author changes rewrite the book tab's option lists and the
//! matching cells of its table. Book changes move the derived book counts
//! shown on the category and author tabs. A notification about a row that is
//! no longer cached is ignored.

use tracing::debug;

use crate::events::LibraryEvent;
use crate::manager::{
    AuthorStrategy, BookStrategy, CategoryStrategy, Manager, AUTHOR_COL, CATEGORY_COL,
};
use crate::models::{BookRefs, DisplayKey};

/// Borrowed handles to the managers an event may touch. The manager that
/// emitted the event is left out as `None`.
#[derive(Default)]
pub struct Synchronizer<'a> {
    pub books: Option<&'a mut Manager<BookStrategy>>,
    pub authors: Option<&'a mut Manager<AuthorStrategy>>,
    pub categories: Option<&'a mut Manager<CategoryStrategy>>,
}

impl Synchronizer<'_> {
    pub fn apply(&mut self, event: &LibraryEvent) {
        match event {
            LibraryEvent::CategoryAdded(key) => self.option_added(CATEGORY_COL, key),
            LibraryEvent::CategoryDeleted(key) => self.option_removed(CATEGORY_COL, key),
            LibraryEvent::CategoryEdited { before, after } => {
                self.option_renamed(CATEGORY_COL, before, after)
            }
            LibraryEvent::AuthorAdded(key) => self.option_added(AUTHOR_COL, key),
            LibraryEvent::AuthorDeleted(key) => self.option_removed(AUTHOR_COL, key),
            LibraryEvent::AuthorEdited { before, after } => {
                self.option_renamed(AUTHOR_COL, before, after)
            }
            LibraryEvent::BookAdded { refs, .. } => self.shift_counts(refs, 1),
            LibraryEvent::BookDeleted { refs, .. } => self.shift_counts(refs, -1),
            LibraryEvent::BookEdited {
                old_refs, new_refs, ..
            } => self.move_counts(old_refs, new_refs),
        }
    }

    fn option_added(&mut self, col: usize, key: &DisplayKey) {
        if let Some(books) = self.books.as_deref_mut() {
            books.push_choice(col, key.to_string());
        }
    }

    /// Book rows still showing the label are left alone: the delete only went
    /// through because no book referenced the record.
    fn option_removed(&mut self, col: usize, key: &DisplayKey) {
        if let Some(books) = self.books.as_deref_mut() {
            if !books.remove_choice(col, &key.to_string()) {
                debug!(option = %key, "removed option was not listed");
            }
        }
    }

    fn option_renamed(&mut self, col: usize, before: &DisplayKey, after: &DisplayKey) {
        let Some(books) = self.books.as_deref_mut() else {
            return;
        };
        let (old, new) = (before.to_string(), after.to_string());
        books.rename_choice(col, &old, &new);
        let rows = books.rewrite_column(col, &old, &new);
        debug!(%old, %new, rows, "renamed reference in book rows");
    }

    fn shift_counts(&mut self, refs: &BookRefs, delta: i64) {
        if let Some(categories) = self.categories.as_deref_mut() {
            categories.adjust_count(refs.category_id, delta);
        }
        if let Some(authors) = self.authors.as_deref_mut() {
            authors.adjust_count(refs.author_id, delta);
        }
    }

    fn move_counts(&mut self, old: &BookRefs, new: &BookRefs) {
        if old.category_id != new.category_id {
            if let Some(categories) = self.categories.as_deref_mut() {
                categories.adjust_count(old.category_id, -1);
                categories.adjust_count(new.category_id, 1);
            }
        }
        if old.author_id != new.author_id {
            if let Some(authors) = self.authors.as_deref_mut() {
                authors.adjust_count(old.author_id, -1);
                authors.adjust_count(new.author_id, 1);
            }
        }
    }
}
