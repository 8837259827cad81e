use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::{map_constraint, StoreError, StoreResult};
use crate::models::Author;

const ENTITY: &str = "author";

const SELECT_AUTHOR: &str = "SELECT a.id, a.first_name, a.last_name, a.bio,
        (SELECT COUNT(*) FROM books b WHERE b.author_id = a.id)
     FROM authors a";

fn map_author(row: &Row<'_>) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        bio: row.get(3)?,
        book_count: row.get(4)?,
    })
}

/// Retrieve every author in insertion order along with a fresh book count.
pub fn fetch_authors(conn: &Connection) -> StoreResult<Vec<Author>> {
    let mut stmt = conn.prepare(&format!("{SELECT_AUTHOR} ORDER BY a.id"))?;
    let authors = stmt
        .query_map([], map_author)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(authors)
}

pub fn fetch_author(conn: &Connection, id: i64) -> StoreResult<Option<Author>> {
    let author = conn
        .query_row(&format!("{SELECT_AUTHOR} WHERE a.id = ?1"), [id], map_author)
        .optional()?;
    Ok(author)
}

pub fn create_author(
    conn: &Connection,
    first_name: &str,
    last_name: &str,
    bio: Option<&str>,
) -> StoreResult<Author> {
    conn.execute(
        "INSERT INTO authors (first_name, last_name, bio) VALUES (?1, ?2, ?3)",
        params![first_name, last_name, bio],
    )?;

    Ok(Author {
        id: conn.last_insert_rowid(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        bio: bio.map(str::to_string),
        book_count: 0,
    })
}

/// Update the names and biography. `None` keeps the stored biography.
pub fn update_author(
    conn: &Connection,
    id: i64,
    first_name: &str,
    last_name: &str,
    bio: Option<&str>,
) -> StoreResult<()> {
    let updated = conn.execute(
        "UPDATE authors SET first_name = ?1, last_name = ?2, bio = COALESCE(?3, bio)
         WHERE id = ?4",
        params![first_name, last_name, bio, id],
    )?;

    if updated == 0 {
        Err(StoreError::NotFound { entity: ENTITY, id })
    } else {
        Ok(())
    }
}

/// Remove an author. Fails with [`StoreError::InUse`] while books still
/// point at it.
pub fn delete_author(conn: &Connection, id: i64) -> StoreResult<()> {
    let deleted = conn
        .execute("DELETE FROM authors WHERE id = ?1", params![id])
        .map_err(|err| {
            map_constraint(
                err,
                || StoreError::InUse { entity: ENTITY, id },
                || StoreError::InUse { entity: ENTITY, id },
            )
        })?;

    if deleted == 0 {
        Err(StoreError::NotFound { entity: ENTITY, id })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    #[test]
    fn author_round_trip_with_optional_bio() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let author = create_author(&conn, "Octavia", "Butler", None).unwrap();
        assert_eq!(author.bio, None);
        update_author(&conn, author.id, "Octavia E.", "Butler", Some("Kindred")).unwrap();

        let fetched = fetch_author(&conn, author.id).unwrap().unwrap();
        assert_eq!(fetched.first_name, "Octavia E.");
        assert_eq!(fetched.bio.as_deref(), Some("Kindred"));
        assert_eq!(fetched.book_count, 0);

        update_author(&conn, author.id, "Octavia", "Butler", None).unwrap();
        let fetched = fetch_author(&conn, author.id).unwrap().unwrap();
        assert_eq!(fetched.first_name, "Octavia");
        assert_eq!(fetched.bio.as_deref(), Some("Kindred"));
        assert_eq!(fetch_authors(&conn).unwrap().len(), 1);

        delete_author(&conn, author.id).unwrap();
        assert!(fetch_author(&conn, author.id).unwrap().is_none());
    }
}
