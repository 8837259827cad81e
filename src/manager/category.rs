use rusqlite::Connection;

use super::{cell, row_id, ActionError, Applied, EntityStrategy, ID_COL};
use crate::db::{
    create_category, delete_category, fetch_categories, fetch_category, update_category,
    StoreError, StoreResult,
};
use crate::events::{EntityKind, LibraryEvent};
use crate::models::{optional_text, Category, DisplayKey};
use crate::table::{FieldDef, InputKind, Row};

const NAME_COL: usize = 1;
const DESCRIPTION_COL: usize = 2;
const BOOKS_COL: usize = 3;

/// Categories: a unique name, an optional description, and a derived count
/// of the books filed under them.
#[derive(Debug, Default, Clone, Copy)]
pub struct CategoryStrategy;

fn category_row(category: &Category) -> Row {
    vec![
        category.id.to_string(),
        category.name.clone(),
        category.description.clone().unwrap_or_default(),
        category.book_count.to_string(),
    ]
}

impl EntityStrategy for CategoryStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Category
    }

    fn fields(&self) -> Vec<FieldDef> {
        vec![
            FieldDef::new("Id", InputKind::Fixed).hidden_in_form(),
            FieldDef::new("Name", InputKind::Line).required(),
            FieldDef::new("Description", InputKind::Text),
            FieldDef::new("Books", InputKind::Fixed).hidden_in_form(),
        ]
    }

    fn count_column(&self) -> Option<usize> {
        Some(BOOKS_COL)
    }

    fn load(&self, conn: &Connection) -> StoreResult<Vec<Row>> {
        Ok(fetch_categories(conn)?.iter().map(category_row).collect())
    }

    fn key_of(&self, row: &[String]) -> DisplayKey {
        DisplayKey::new(cell(row, NAME_COL), cell(row, ID_COL).parse().unwrap_or_default())
    }

    fn create(&self, conn: &Connection, values: &[String]) -> Result<Applied, ActionError> {
        let name = cell(values, NAME_COL);
        let description = optional_text(cell(values, DESCRIPTION_COL));
        let category = create_category(conn, name, description.as_deref())
            .map_err(ActionError::store("add", EntityKind::Category))?;

        Ok(Applied {
            row: category_row(&category),
            event: LibraryEvent::CategoryAdded(category.key()),
        })
    }

    fn update(
        &self,
        conn: &Connection,
        current: &[String],
        values: &[String],
    ) -> Result<Applied, ActionError> {
        let id = row_id(current)?;
        let store_err = || ActionError::store("edit", EntityKind::Category);

        // The cached row may already show stale text, so the "before" label
        // comes from the database.
        let before = fetch_category(conn, id)
            .map_err(store_err())?
            .ok_or_else(|| store_err()(StoreError::NotFound { entity: "category", id }))?;

        let name = cell(values, NAME_COL);
        let description = optional_text(cell(values, DESCRIPTION_COL));
        update_category(conn, id, name, description.as_deref()).map_err(store_err())?;

        // A blank description leaves the stored one in place.
        let description = description.or_else(|| before.description.clone());
        Ok(Applied {
            row: vec![
                id.to_string(),
                name.to_string(),
                description.unwrap_or_default(),
                cell(current, BOOKS_COL).to_string(),
            ],
            event: LibraryEvent::CategoryEdited {
                before: before.key(),
                after: DisplayKey::new(name, id),
            },
        })
    }

    fn delete(&self, conn: &Connection, row: &[String]) -> Result<LibraryEvent, ActionError> {
        let id = row_id(row)?;
        delete_category(conn, id).map_err(ActionError::store("delete", EntityKind::Category))?;
        Ok(LibraryEvent::CategoryDeleted(self.key_of(row)))
    }
}
