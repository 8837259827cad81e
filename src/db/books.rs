use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::{map_constraint, StoreError, StoreResult};
use crate::models::{Author, Book, BookDraft, BookRecord, Category, STORAGE_DATE_FORMAT};

const ENTITY: &str = "book";

/// Books are always loaded with their author and category resolved so the
/// table can show names instead of raw ids.
const SELECT_BOOK: &str = "SELECT b.id, b.title, b.author_id, b.category_id, b.isbn,
        b.release_date, b.description,
        a.first_name, a.last_name, a.bio,
        (SELECT COUNT(*) FROM books x WHERE x.author_id = a.id),
        c.name, c.description,
        (SELECT COUNT(*) FROM books y WHERE y.category_id = c.id)
     FROM books b
     INNER JOIN authors a ON a.id = b.author_id
     INNER JOIN categories c ON c.id = b.category_id";

fn map_book(row: &Row<'_>) -> rusqlite::Result<BookRecord> {
    let author_id: i64 = row.get(2)?;
    let category_id: i64 = row.get(3)?;
    let raw_date: String = row.get(5)?;
    let release_date = NaiveDate::parse_from_str(&raw_date, STORAGE_DATE_FORMAT)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(err)))?;

    Ok(BookRecord {
        book: Book {
            id: row.get(0)?,
            title: row.get(1)?,
            author_id,
            category_id,
            isbn: row.get(4)?,
            release_date,
            description: row.get(6)?,
        },
        author: Author {
            id: author_id,
            first_name: row.get(7)?,
            last_name: row.get(8)?,
            bio: row.get(9)?,
            book_count: row.get(10)?,
        },
        category: Category {
            id: category_id,
            name: row.get(11)?,
            description: row.get(12)?,
            book_count: row.get(13)?,
        },
    })
}

pub fn fetch_books(conn: &Connection) -> StoreResult<Vec<BookRecord>> {
    let mut stmt = conn.prepare(&format!("{SELECT_BOOK} ORDER BY b.id"))?;
    let books = stmt
        .query_map([], map_book)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(books)
}

pub fn fetch_book(conn: &Connection, id: i64) -> StoreResult<Option<BookRecord>> {
    let book = conn
        .query_row(&format!("{SELECT_BOOK} WHERE b.id = ?1"), [id], map_book)
        .optional()?;
    Ok(book)
}

/// Insert a book and echo it back with the joins resolved, so callers can
/// update the table without another listing query.
pub fn create_book(conn: &Connection, draft: &BookDraft) -> StoreResult<BookRecord> {
    conn.execute(
        "INSERT INTO books (title, author_id, category_id, isbn, release_date, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            draft.title,
            draft.author_id,
            draft.category_id,
            draft.isbn,
            draft.release_date.format(STORAGE_DATE_FORMAT).to_string(),
            draft.description,
        ],
    )
    .map_err(|err| book_constraint(err, &draft.isbn))?;

    let id = conn.last_insert_rowid();
    fetch_book(conn, id)?.ok_or(StoreError::NotFound { entity: ENTITY, id })
}

/// Overwrite a book. A `None` description keeps the stored one.
pub fn update_book(conn: &Connection, id: i64, draft: &BookDraft) -> StoreResult<()> {
    let updated = conn
        .execute(
            "UPDATE books SET title = ?1, author_id = ?2, category_id = ?3, isbn = ?4,
                 release_date = ?5, description = COALESCE(?6, description)
             WHERE id = ?7",
            params![
                draft.title,
                draft.author_id,
                draft.category_id,
                draft.isbn,
                draft.release_date.format(STORAGE_DATE_FORMAT).to_string(),
                draft.description,
                id,
            ],
        )
        .map_err(|err| book_constraint(err, &draft.isbn))?;

    if updated == 0 {
        Err(StoreError::NotFound { entity: ENTITY, id })
    } else {
        Ok(())
    }
}

pub fn delete_book(conn: &Connection, id: i64) -> StoreResult<()> {
    let deleted = conn.execute("DELETE FROM books WHERE id = ?1", params![id])?;

    if deleted == 0 {
        Err(StoreError::NotFound { entity: ENTITY, id })
    } else {
        Ok(())
    }
}

fn book_constraint(err: rusqlite::Error, isbn: &str) -> StoreError {
    map_constraint(
        err,
        || StoreError::Duplicate {
            entity: ENTITY,
            field: "ISBN",
            value: isbn.to_string(),
        },
        || StoreError::MissingReference,
    )
}
