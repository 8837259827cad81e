//! Declarative field schema and the in-memory record table that mirrors one
//! entity's persisted rows. Rows are stored already formatted for display.

use thiserror::Error;

/// Kind of input a field is edited with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Single-line text.
    Line,
    /// Multi-line free text.
    Text,
    /// `dd.mm.yyyy` date.
    Date,
    /// Pick one entry from a list of options.
    Choice,
    /// Pre-filled and not editable (generated ids, derived counts).
    Fixed,
}

/// One column of an entity: its label plus the flags the table and form
/// renderers consult.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub label: &'static str,
    pub required: bool,
    pub hidden_in_table: bool,
    pub hidden_in_form: bool,
    pub input: InputKind,
}

impl FieldDef {
    pub fn new(label: &'static str, input: InputKind) -> Self {
        Self {
            label,
            required: false,
            hidden_in_table: false,
            hidden_in_form: false,
            input,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn hidden_in_table(mut self) -> Self {
        self.hidden_in_table = true;
        self
    }

    pub fn hidden_in_form(mut self) -> Self {
        self.hidden_in_form = true;
        self
    }

    /// Label as shown next to a form input, `*` marks required fields.
    pub fn form_label(&self) -> String {
        if self.required {
            format!("{}*", self.label)
        } else {
            self.label.to_string()
        }
    }
}

/// A display-formatted row, one cell per field.
pub type Row = Vec<String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("row has {actual} cells but the table has {expected} columns")]
    WidthMismatch { expected: usize, actual: usize },
    #[error("cell ({row}, {col}) is out of bounds")]
    OutOfBounds { row: usize, col: usize },
}

/// Ordered rows plus the schema they follow. Every mutation bumps
/// [`RecordTable::revision`], which renderers use as the refresh signal.
#[derive(Debug, Clone)]
pub struct RecordTable {
    fields: Vec<FieldDef>,
    rows: Vec<Row>,
    revision: u64,
}

impl RecordTable {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self {
            fields,
            rows: Vec::new(),
            revision: 0,
        }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Indices of the columns shown in the list view.
    pub fn visible_columns(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| !field.hidden_in_table)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.fields.len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// First row whose `col` cell equals `value`.
    pub fn find_row(&self, col: usize, value: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get(col).is_some_and(|cell| cell == value))
    }

    /// Swap in a freshly loaded set of rows. Nothing changes if any row has
    /// the wrong width.
    pub fn replace_rows(&mut self, rows: Vec<Row>) -> Result<(), TableError> {
        if let Some(bad) = rows.iter().find(|row| row.len() != self.column_count()) {
            return Err(TableError::WidthMismatch {
                expected: self.column_count(),
                actual: bad.len(),
            });
        }
        self.rows = rows;
        self.revision += 1;
        Ok(())
    }

    /// Append a row and return its index.
    pub fn insert_row(&mut self, row: Row) -> Result<usize, TableError> {
        if row.len() != self.column_count() {
            return Err(TableError::WidthMismatch {
                expected: self.column_count(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        self.revision += 1;
        Ok(self.rows.len() - 1)
    }

    /// Remove the row at `index`, returning `false` when it does not exist.
    pub fn remove_row(&mut self, index: usize) -> bool {
        if index >= self.rows.len() {
            return false;
        }
        self.rows.remove(index);
        self.revision += 1;
        true
    }

    pub fn set_cell(
        &mut self,
        row: usize,
        col: usize,
        value: impl Into<String>,
    ) -> Result<(), TableError> {
        let cell = self
            .rows
            .get_mut(row)
            .and_then(|cells| cells.get_mut(col))
            .ok_or(TableError::OutOfBounds { row, col })?;
        *cell = value.into();
        self.revision += 1;
        Ok(())
    }

    /// Replace a whole row in place.
    pub fn set_row(&mut self, index: usize, row: Row) -> Result<(), TableError> {
        if row.len() != self.column_count() {
            return Err(TableError::WidthMismatch {
                expected: self.column_count(),
                actual: row.len(),
            });
        }
        let slot = self
            .rows
            .get_mut(index)
            .ok_or(TableError::OutOfBounds { row: index, col: 0 })?;
        *slot = row;
        self.revision += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RecordTable {
        RecordTable::new(vec![
            FieldDef::new("Id", InputKind::Fixed).hidden_in_form(),
            FieldDef::new("Name", InputKind::Line).required(),
            FieldDef::new("Notes", InputKind::Text).hidden_in_table(),
        ])
    }

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    #[test]
    fn insert_appends_and_checks_width() {
        let mut table = table();
        assert_eq!(table.insert_row(row(&["1", "a", ""])), Ok(0));
        assert_eq!(table.insert_row(row(&["2", "b", ""])), Ok(1));
        assert_eq!(
            table.insert_row(row(&["3", "c"])),
            Err(TableError::WidthMismatch {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get_cell(1, 1), Some("b"));
    }

    #[test]
    fn remove_out_of_bounds_returns_false() {
        let mut table = table();
        table.insert_row(row(&["1", "a", ""])).unwrap();
        assert!(!table.remove_row(1));
        assert!(table.remove_row(0));
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn set_cell_bumps_revision() {
        let mut table = table();
        table.insert_row(row(&["1", "a", ""])).unwrap();
        let before = table.revision();
        table.set_cell(0, 1, "renamed").unwrap();
        assert!(table.revision() > before);
        assert_eq!(table.get_cell(0, 1), Some("renamed"));
        assert_eq!(
            table.set_cell(0, 5, "x"),
            Err(TableError::OutOfBounds { row: 0, col: 5 })
        );
    }

    #[test]
    fn schema_flags_drive_visibility_and_labels() {
        let table = table();
        assert_eq!(table.visible_columns(), vec![0, 1]);
        assert_eq!(table.fields()[1].form_label(), "Name*");
        assert_eq!(table.fields()[2].form_label(), "Notes");
        assert_eq!(table.find_row(0, "1"), None);
    }
}
