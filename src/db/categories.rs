use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::{map_constraint, StoreError, StoreResult};
use crate::models::Category;

const ENTITY: &str = "category";

/// Book counts come from a correlated subquery so every listing recounts from
/// scratch instead of trusting a stored column.
const SELECT_CATEGORY: &str = "SELECT c.id, c.name, c.description,
        (SELECT COUNT(*) FROM books b WHERE b.category_id = c.id)
     FROM categories c";

fn map_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        book_count: row.get(3)?,
    })
}

/// Retrieve every category in insertion order.
pub fn fetch_categories(conn: &Connection) -> StoreResult<Vec<Category>> {
    let mut stmt = conn.prepare(&format!("{SELECT_CATEGORY} ORDER BY c.id"))?;
    let categories = stmt
        .query_map([], map_category)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn fetch_category(conn: &Connection, id: i64) -> StoreResult<Option<Category>> {
    let category = conn
        .query_row(
            &format!("{SELECT_CATEGORY} WHERE c.id = ?1"),
            [id],
            map_category,
        )
        .optional()?;
    Ok(category)
}

/// Insert a new category, returning the hydrated struct so the caller can
/// push it straight into the in-memory table.
pub fn create_category(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
) -> StoreResult<Category> {
    conn.execute(
        "INSERT INTO categories (name, description) VALUES (?1, ?2)",
        params![name, description],
    )
    .map_err(|err| duplicate_name(err, name))?;

    Ok(Category {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        description: description.map(str::to_string),
        book_count: 0,
    })
}

/// Update name and description. `None` keeps the stored description.
pub fn update_category(
    conn: &Connection,
    id: i64,
    name: &str,
    description: Option<&str>,
) -> StoreResult<()> {
    let updated = conn
        .execute(
            "UPDATE categories SET name = ?1, description = COALESCE(?2, description)
             WHERE id = ?3",
            params![name, description, id],
        )
        .map_err(|err| duplicate_name(err, name))?;

    if updated == 0 {
        Err(StoreError::NotFound { entity: ENTITY, id })
    } else {
        Ok(())
    }
}

/// Remove a category. Books referencing it make SQLite reject the delete,
/// which surfaces as [`StoreError::InUse`].
pub fn delete_category(conn: &Connection, id: i64) -> StoreResult<()> {
    let deleted = conn
        .execute("DELETE FROM categories WHERE id = ?1", params![id])
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

fn duplicate_name(err: rusqlite::Error, name: &str) -> StoreError {
    map_constraint(
        err,
        || StoreError::Duplicate {
            entity: ENTITY,
            field: "name",
            value: name.to_string(),
        },
        || StoreError::MissingReference,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn create_and_fetch_category() {
        let conn = conn();
        let created = create_category(&conn, "Poetry", Some("Verse")).unwrap();
        let fetched = fetch_category(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetch_categories(&conn).unwrap(), vec![created]);
    }

    #[test]
    fn duplicate_name_is_classified() {
        let conn = conn();
        create_category(&conn, "Poetry", None).unwrap();
        let err = create_category(&conn, "Poetry", None).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "name", .. }));
    }

    #[test]
    fn update_and_delete_missing_category_report_not_found() {
        let conn = conn();
        assert!(matches!(
            update_category(&conn, 42, "Ghost", None),
            Err(StoreError::NotFound { id: 42, .. })
        ));
        assert!(matches!(
            delete_category(&conn, 42),
            Err(StoreError::NotFound { id: 42, .. })
        ));
    }

    #[test]
    fn missing_description_keeps_stored_one() {
        let conn = conn();
        let created = create_category(&conn, "Essays", Some("Short prose")).unwrap();
        update_category(&conn, created.id, "Short Essays", None).unwrap();
        let fetched = fetch_category(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Short Essays");
        assert_eq!(fetched.description.as_deref(), Some("Short prose"));

        update_category(&conn, created.id, "Short Essays", Some("Prose")).unwrap();
        let fetched = fetch_category(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched.description.as_deref(), Some("Prose"));
    }
}
