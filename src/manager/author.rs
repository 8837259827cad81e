use rusqlite::Connection;

use super::{cell, row_id, ActionError, Applied, EntityStrategy, ID_COL};
use crate::db::{
    create_author, delete_author, fetch_author, fetch_authors, update_author, StoreError,
    StoreResult,
};
use crate::events::{EntityKind, LibraryEvent};
use crate::models::{optional_text, Author, DisplayKey};
use crate::table::{FieldDef, InputKind, Row};

const FIRST_NAME_COL: usize = 1;
const LAST_NAME_COL: usize = 2;
const BIO_COL: usize = 3;
const BOOKS_COL: usize = 4;

#[derive(Debug, Default, Clone, Copy)]
pub struct AuthorStrategy;

fn author_row(author: &Author) -> Row {
    vec![
        author.id.to_string(),
        author.first_name.clone(),
        author.last_name.clone(),
        author.bio.clone().unwrap_or_default(),
        author.book_count.to_string(),
    ]
}

impl EntityStrategy for AuthorStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Author
    }

    fn fields(&self) -> Vec<FieldDef> {
        vec![
            FieldDef::new("Id", InputKind::Fixed).hidden_in_form(),
            FieldDef::new("First Name", InputKind::Line).required(),
            FieldDef::new("Last Name", InputKind::Line).required(),
            FieldDef::new("Biography", InputKind::Text).hidden_in_table(),
            FieldDef::new("Books", InputKind::Fixed).hidden_in_form(),
        ]
    }

    fn count_column(&self) -> Option<usize> {
        Some(BOOKS_COL)
    }

    fn load(&self, conn: &Connection) -> StoreResult<Vec<Row>> {
        Ok(fetch_authors(conn)?.iter().map(author_row).collect())
    }

    fn key_of(&self, row: &[String]) -> DisplayKey {
        DisplayKey::new(
            format!("{} {}", cell(row, FIRST_NAME_COL), cell(row, LAST_NAME_COL)),
            cell(row, ID_COL).parse().unwrap_or_default(),
        )
    }

    fn create(&self, conn: &Connection, values: &[String]) -> Result<Applied, ActionError> {
        let bio = optional_text(cell(values, BIO_COL));
        let author = create_author(
            conn,
            cell(values, FIRST_NAME_COL),
            cell(values, LAST_NAME_COL),
            bio.as_deref(),
        )
        .map_err(ActionError::store("add", EntityKind::Author))?;

        Ok(Applied {
            row: author_row(&author),
            event: LibraryEvent::AuthorAdded(author.key()),
        })
    }

    fn update(
        &self,
        conn: &Connection,
        current: &[String],
        values: &[String],
    ) -> Result<Applied, ActionError> {
        let id = row_id(current)?;
        let store_err = || ActionError::store("edit", EntityKind::Author);

        let before = fetch_author(conn, id)
            .map_err(store_err())?
            .ok_or_else(|| store_err()(StoreError::NotFound { entity: "author", id }))?;

        let first_name = cell(values, FIRST_NAME_COL);
        let last_name = cell(values, LAST_NAME_COL);
        let bio = optional_text(cell(values, BIO_COL));
        update_author(conn, id, first_name, last_name, bio.as_deref()).map_err(store_err())?;
        let bio = bio.or_else(|| before.bio.clone());

        let row = vec![
            id.to_string(),
            first_name.to_string(),
            last_name.to_string(),
            bio.unwrap_or_default(),
            cell(current, BOOKS_COL).to_string(),
        ];
        let after = self.key_of(&row);
        Ok(Applied {
            row,
            event: LibraryEvent::AuthorEdited {
                before: before.key(),
                after,
            },
        })
    }

    fn delete(&self, conn: &Connection, row: &[String]) -> Result<LibraryEvent, ActionError> {
        let id = row_id(row)?;
        delete_author(conn, id).map_err(ActionError::store("delete", EntityKind::Author))?;
        Ok(LibraryEvent::AuthorDeleted(self.key_of(row)))
    }
}
