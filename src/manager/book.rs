use chrono::Local;
use rusqlite::Connection;
use uuid::Uuid;

use super::{cell, row_id, ActionError, Applied, Choices, EntityStrategy, ID_COL};
use crate::db::{
    create_book, delete_book, fetch_authors, fetch_book, fetch_books, fetch_categories,
    update_book, StoreError, StoreResult,
};
use crate::events::{EntityKind, LibraryEvent};
use crate::models::{
    format_display_date, optional_text, parse_display_date, BookDraft, BookRecord, BookRefs,
    DisplayKey,
};
use crate::table::{FieldDef, InputKind, Row};

const TITLE_COL: usize = 1;
/// Column showing the author's display key, `"First Last <id>"`.
pub const AUTHOR_COL: usize = 2;
/// Column showing the category's display key, `"Name <id>"`.
pub const CATEGORY_COL: usize = 3;
const ISBN_COL: usize = 4;
const RELEASE_DATE_COL: usize = 5;
const DESCRIPTION_COL: usize = 6;

/// Length of generated ISBNs.
const ISBN_LEN: usize = 13;

/// Books reference one author and one category. Both are picked from option
/// lists whose entries are display keys, so the id can be read back from the
/// submitted text.
#[derive(Debug, Default, Clone, Copy)]
pub struct BookStrategy;

fn book_row(record: &BookRecord) -> Row {
    vec![
        record.book.id.to_string(),
        record.book.title.clone(),
        record.author.key().to_string(),
        record.category.key().to_string(),
        record.book.isbn.clone(),
        format_display_date(record.book.release_date),
        record.book.description.clone().unwrap_or_default(),
    ]
}

/// Thirteen upper-case hex characters from a random UUID.
pub(crate) fn generate_isbn() -> String {
    Uuid::new_v4().simple().to_string()[..ISBN_LEN].to_uppercase()
}

fn parse_reference(values: &[String], col: usize, what: &str) -> Result<DisplayKey, ActionError> {
    let raw = cell(values, col);
    DisplayKey::parse(raw)
        .ok_or_else(|| ActionError::InvalidInput(format!("Unknown {what} \"{raw}\".")))
}

/// Parse trimmed form values into a draft. Returns the normalized author and
/// category keys too, for the row text.
fn parse_draft(values: &[String]) -> Result<(BookDraft, DisplayKey, DisplayKey), ActionError> {
    let author = parse_reference(values, AUTHOR_COL, "author")?;
    let category = parse_reference(values, CATEGORY_COL, "category")?;
    let raw_date = cell(values, RELEASE_DATE_COL);
    let release_date = parse_display_date(raw_date).ok_or_else(|| {
        ActionError::InvalidInput(format!(
            "Release date \"{raw_date}\" must use the dd.mm.yyyy format."
        ))
    })?;

    let draft = BookDraft {
        title: cell(values, TITLE_COL).to_string(),
        author_id: author.id,
        category_id: category.id,
        isbn: cell(values, ISBN_COL).to_string(),
        release_date,
        description: optional_text(cell(values, DESCRIPTION_COL)),
    };
    Ok((draft, author, category))
}

impl BookStrategy {
    /// Author and category ids of a cached book row.
    pub fn refs_of(&self, row: &[String]) -> Option<BookRefs> {
        Some(BookRefs {
            author_id: DisplayKey::parse(cell(row, AUTHOR_COL))?.id,
            category_id: DisplayKey::parse(cell(row, CATEGORY_COL))?.id,
        })
    }
}

impl EntityStrategy for BookStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Book
    }

    fn fields(&self) -> Vec<FieldDef> {
        vec![
            FieldDef::new("Id", InputKind::Fixed).hidden_in_form(),
            FieldDef::new("Title", InputKind::Line).required(),
            FieldDef::new("Author", InputKind::Choice).required(),
            FieldDef::new("Category", InputKind::Choice).required(),
            FieldDef::new("ISBN", InputKind::Fixed).required(),
            FieldDef::new("Release Date", InputKind::Date).required(),
            FieldDef::new("Description", InputKind::Text).hidden_in_table(),
        ]
    }

    fn load(&self, conn: &Connection) -> StoreResult<Vec<Row>> {
        Ok(fetch_books(conn)?.iter().map(book_row).collect())
    }

    fn load_choices(&self, conn: &Connection) -> StoreResult<Choices> {
        let mut choices = Choices::new();
        choices.insert(
            AUTHOR_COL,
            fetch_authors(conn)?
                .iter()
                .map(|author| author.key().to_string())
                .collect(),
        );
        choices.insert(
            CATEGORY_COL,
            fetch_categories(conn)?
                .iter()
                .map(|category| category.key().to_string())
                .collect(),
        );
        Ok(choices)
    }

    fn blank_form(&self, choices: &Choices) -> Row {
        let first_option = |col: usize| {
            choices
                .get(&col)
                .and_then(|options| options.first())
                .cloned()
                .unwrap_or_default()
        };

        let mut values = vec![String::new(); self.fields().len()];
        values[AUTHOR_COL] = first_option(AUTHOR_COL);
        values[CATEGORY_COL] = first_option(CATEGORY_COL);
        values[ISBN_COL] = generate_isbn();
        values[RELEASE_DATE_COL] = format_display_date(Local::now().date_naive());
        values
    }

    fn key_of(&self, row: &[String]) -> DisplayKey {
        DisplayKey::new(cell(row, TITLE_COL), cell(row, ID_COL).parse().unwrap_or_default())
    }

    fn create(&self, conn: &Connection, values: &[String]) -> Result<Applied, ActionError> {
        let (draft, _, _) = parse_draft(values)?;
        let record =
            create_book(conn, &draft).map_err(ActionError::store("add", EntityKind::Book))?;

        Ok(Applied {
            row: book_row(&record),
            event: LibraryEvent::BookAdded {
                key: record.book.key(),
                refs: record.book.refs(),
            },
        })
    }

    fn update(
        &self,
        conn: &Connection,
        current: &[String],
        values: &[String],
    ) -> Result<Applied, ActionError> {
        let id = row_id(current)?;
        let (draft, author, category) = parse_draft(values)?;
        let store_err = || ActionError::store("edit", EntityKind::Book);

        // Old references come from the database, not the cached row, so the
        // count adjustments match what was actually stored.
        let before = fetch_book(conn, id)
            .map_err(store_err())?
            .ok_or_else(|| store_err()(StoreError::NotFound { entity: "book", id }))?;
        update_book(conn, id, &draft).map_err(store_err())?;

        let row = vec![
            id.to_string(),
            draft.title.clone(),
            author.to_string(),
            category.to_string(),
            draft.isbn.clone(),
            format_display_date(draft.release_date),
            draft
                .description
                .clone()
                .or_else(|| before.book.description.clone())
                .unwrap_or_default(),
        ];
        Ok(Applied {
            row,
            event: LibraryEvent::BookEdited {
                before: before.book.key(),
                after: DisplayKey::new(draft.title.clone(), id),
                old_refs: before.book.refs(),
                new_refs: draft.refs(),
            },
        })
    }

    fn delete(&self, conn: &Connection, row: &[String]) -> Result<LibraryEvent, ActionError> {
        let id = row_id(row)?;
        let refs = self.refs_of(row).ok_or_else(|| {
            ActionError::InvalidInput(format!("Book {id} has no readable author or category."))
        })?;
        delete_book(conn, id).map_err(ActionError::store("delete", EntityKind::Book))?;

        Ok(LibraryEvent::BookDeleted {
            key: self.key_of(row),
            refs,
        })
    }
}
