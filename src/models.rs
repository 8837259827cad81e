//! Domain models that mirror the SQLite schema and get passed throughout the
//! managers. The intent is that these types stay light-weight data holders so
//! other layers can focus on presentation and persistence logic.

use std::fmt;

use chrono::NaiveDate;

/// Date format shown in tables and typed into forms (`21.03.2024`).
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";
/// Date format stored in the `books.release_date` column (`2024-03-21`).
pub const STORAGE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Human-readable label plus numeric id. Book rows and the author/category
/// pickers show keys as `"<label> <id>"`, which lets the id be recovered from
/// the text without a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayKey {
    pub label: String,
    pub id: i64,
}

impl DisplayKey {
    pub fn new(label: impl Into<String>, id: i64) -> Self {
        Self {
            label: label.into(),
            id,
        }
    }

    /// Split `"<label> <id>"` back into its parts. The id is the last
    /// whitespace-separated token; a bare number parses with an empty label.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        match trimmed.rsplit_once(char::is_whitespace) {
            Some((label, id)) => Some(Self::new(label.trim_end(), id.parse().ok()?)),
            None => Some(Self::new("", trimmed.parse().ok()?)),
        }
    }
}

impl fmt::Display for DisplayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} {}", self.label, self.id)
        }
    }
}

/// Foreign keys a book carries. Book notifications ship these so the author
/// and category managers can adjust their counters without a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookRefs {
    pub author_id: i64,
    pub category_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A book category. `book_count` is derived by the listing query and is never
/// written back to the database.
pub struct Category {
    /// Primary key from the database.
    pub id: i64,
    /// Unique category name.
    pub name: String,
    pub description: Option<String>,
    pub book_count: i64,
}

impl Category {
    pub fn key(&self) -> DisplayKey {
        DisplayKey::new(self.name.clone(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A book author. Like [`Category`], the book count only lives in memory.
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Free-form biography, empty inputs are stored as `NULL`.
    pub bio: Option<String>,
    pub book_count: i64,
}

impl Author {
    /// `First Last`, the label used in display keys.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn key(&self) -> DisplayKey {
        DisplayKey::new(self.full_name(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// In-memory representation of a row in the `books` table.
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    pub category_id: i64,
    /// Unique across all books.
    pub isbn: String,
    pub release_date: NaiveDate,
    pub description: Option<String>,
}

impl Book {
    pub fn key(&self) -> DisplayKey {
        DisplayKey::new(self.title.clone(), self.id)
    }

    pub fn refs(&self) -> BookRefs {
        BookRefs {
            author_id: self.author_id,
            category_id: self.category_id,
        }
    }
}

/// A book together with the author and category it references. Listing and
/// lookup queries resolve both joins so the book table can show names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub book: Book,
    pub author: Author,
    pub category: Category,
}

/// Field values for inserting or updating a book, already parsed out of the
/// form strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author_id: i64,
    pub category_id: i64,
    pub isbn: String,
    pub release_date: NaiveDate,
    pub description: Option<String>,
}

impl BookDraft {
    pub fn refs(&self) -> BookRefs {
        BookRefs {
            author_id: self.author_id,
            category_id: self.category_id,
        }
    }
}

/// Parse a `dd.mm.yyyy` form value.
pub fn parse_display_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DISPLAY_DATE_FORMAT).ok()
}

pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Turn a trimmed optional form value into `None` when it is blank.
pub fn optional_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
