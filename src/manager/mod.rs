//! Generic list/add/edit/delete controller shared by every entity tab.
//!
//! A [`Manager`] owns the [`RecordTable`] for one entity, the option lists of
//! its choice inputs, the current [`Mode`], and the row selection. Everything
//! entity-specific (schema, queries, row formatting, which notification to
//! emit) lives in an [`EntityStrategy`], so the three tabs share one skeleton.
//!
//! The cache only changes after the store call succeeded: a rejected action
//! leaves rows, selection and mode exactly as they were.

mod author;
mod book;
mod category;

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::Connection;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{StoreError, StoreResult};
use crate::events::{EntityKind, EventSink, LibraryEvent};
use crate::models::DisplayKey;
use crate::table::{FieldDef, RecordTable, Row, TableError};

pub use author::AuthorStrategy;
pub use book::{BookStrategy, AUTHOR_COL, CATEGORY_COL};
pub use category::CategoryStrategy;

/// Every schema starts with the numeric id column.
pub const ID_COL: usize = 0;

/// Option lists keyed by column index.
pub type Choices = BTreeMap<usize, Vec<String>>;

/// Which view the manager is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    List,
    AddForm,
    EditForm,
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Please fill in all the required fields ({}).", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Select exactly one row first.")]
    NoSelection,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Could not {action} {entity}: {source}")]
    Store {
        action: &'static str,
        entity: EntityKind,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Table(#[from] TableError),
}

impl ActionError {
    pub(crate) fn store(action: &'static str, entity: EntityKind) -> impl FnOnce(StoreError) -> Self {
        move |source| ActionError::Store {
            action,
            entity,
            source,
        }
    }

    /// Delete blocked because books still reference the record.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ActionError::Store { source, .. } if source.is_in_use())
    }
}

/// Result of a store call the manager should mirror in its cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub row: Row,
    pub event: LibraryEvent,
}

/// Entity-specific half of a manager.
pub trait EntityStrategy {
    fn kind(&self) -> EntityKind;

    fn fields(&self) -> Vec<FieldDef>;

    /// Column holding the derived book count, if the entity has one.
    fn count_column(&self) -> Option<usize> {
        None
    }

    /// All rows of the entity, formatted for display.
    fn load(&self, conn: &Connection) -> StoreResult<Vec<Row>>;

    /// Option lists for choice inputs.
    fn load_choices(&self, _conn: &Connection) -> StoreResult<Choices> {
        Ok(Choices::new())
    }

    /// Initial values for the add form.
    fn blank_form(&self, _choices: &Choices) -> Row {
        vec![String::new(); self.fields().len()]
    }

    /// Key used in notifications and reports for a cached row.
    fn key_of(&self, row: &[String]) -> DisplayKey;

    /// Persist a new record from trimmed form values.
    fn create(&self, conn: &Connection, values: &[String]) -> Result<Applied, ActionError>;

    /// Persist changes to the record shown in `current`.
    fn update(
        &self,
        conn: &Connection,
        current: &[String],
        values: &[String],
    ) -> Result<Applied, ActionError>;

    /// Delete the record shown in `row`, returning the notification to emit.
    fn delete(&self, conn: &Connection, row: &[String]) -> Result<LibraryEvent, ActionError>;
}

/// One row the batch delete could not remove.
#[derive(Debug)]
pub struct DeleteFailure {
    /// Row index as selected, before any shifting.
    pub row: usize,
    pub key: DisplayKey,
    pub error: ActionError,
}

/// Outcome of a batch delete. The batch always runs to the end.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub deleted: Vec<DisplayKey>,
    pub failed: Vec<DeleteFailure>,
}

impl DeleteReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Object-safe view of a manager so callers can switch between entity tabs
/// without knowing the strategy type.
pub trait EntityManager {
    fn kind(&self) -> EntityKind;
    fn table(&self) -> &RecordTable;
    fn mode(&self) -> Mode;
    fn selection(&self) -> &BTreeSet<usize>;
    fn choices(&self, col: usize) -> &[String];

    /// Replace the selection; out-of-range indices are dropped.
    fn select(&mut self, indices: &[usize]);
    fn toggle_selected(&mut self, index: usize);
    fn clear_selection(&mut self);

    /// Enter the add form and return its initial values.
    fn begin_add(&mut self) -> Row;
    /// Enter the edit form pre-filled from the single selected row.
    fn begin_edit(&mut self) -> Result<Row, ActionError>;
    /// Leave whichever form is open.
    fn cancel(&mut self);

    /// Reload rows and choices from the store, recomputing derived counts.
    fn load(&mut self, conn: &Connection) -> Result<(), ActionError>;
    fn add(
        &mut self,
        conn: &Connection,
        values: &[String],
        sink: &mut dyn EventSink,
    ) -> Result<usize, ActionError>;
    fn edit(
        &mut self,
        conn: &Connection,
        values: &[String],
        sink: &mut dyn EventSink,
    ) -> Result<usize, ActionError>;
    fn delete_rows(
        &mut self,
        conn: &Connection,
        indices: &[usize],
        sink: &mut dyn EventSink,
    ) -> DeleteReport;
    fn delete_selected(&mut self, conn: &Connection, sink: &mut dyn EventSink) -> DeleteReport;
}

pub struct Manager<S> {
    strategy: S,
    table: RecordTable,
    choices: Choices,
    mode: Mode,
    selection: BTreeSet<usize>,
}

impl<S: EntityStrategy> Manager<S> {
    /// Build the manager and run the initial load.
    pub fn new(strategy: S, conn: &Connection) -> Result<Self, ActionError> {
        let table = RecordTable::new(strategy.fields());
        let mut manager = Self {
            strategy,
            table,
            choices: Choices::new(),
            mode: Mode::List,
            selection: BTreeSet::new(),
        };
        EntityManager::load(&mut manager, conn)?;
        Ok(manager)
    }

    pub fn row_index_by_id(&self, id: i64) -> Option<usize> {
        self.table.find_row(ID_COL, &id.to_string())
    }

    pub fn push_choice(&mut self, col: usize, option: String) {
        self.choices.entry(col).or_default().push(option);
    }

    pub fn remove_choice(&mut self, col: usize, option: &str) -> bool {
        let Some(options) = self.choices.get_mut(&col) else {
            return false;
        };
        match options.iter().position(|candidate| candidate.as_str() == option) {
            Some(idx) => {
                options.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn rename_choice(&mut self, col: usize, old: &str, new: &str) -> bool {
        let slot = self
            .choices
            .get_mut(&col)
            .and_then(|options| options.iter_mut().find(|candidate| candidate.as_str() == old));
        match slot {
            Some(option) => {
                *option = new.to_string();
                true
            }
            None => false,
        }
    }

    /// Replace `old` with `new` in every row's `col` cell. Returns how many
    /// rows changed.
    pub fn rewrite_column(&mut self, col: usize, old: &str, new: &str) -> usize {
        let matching: Vec<usize> = (0..self.table.row_count())
            .filter(|&row| self.table.get_cell(row, col) == Some(old))
            .collect();
        for &row in &matching {
            // Indices come from the scan above, so they are in bounds.
            let _ = self.table.set_cell(row, col, new);
        }
        matching.len()
    }

    /// Shift the derived count of record `id` by `delta`. A missing row or an
    /// entity without a count column is a no-op and returns `false`.
    pub fn adjust_count(&mut self, id: i64, delta: i64) -> bool {
        let Some(col) = self.strategy.count_column() else {
            return false;
        };
        let Some(row) = self.row_index_by_id(id) else {
            debug!(entity = %self.strategy.kind(), id, "count target not cached");
            return false;
        };
        let current = self
            .table
            .get_cell(row, col)
            .and_then(|cell| cell.parse::<i64>().ok())
            .unwrap_or(0);
        let mut next = current + delta;
        if next < 0 {
            warn!(entity = %self.strategy.kind(), id, current, delta, "book count would go negative");
            next = 0;
        }
        self.table.set_cell(row, col, next.to_string()).is_ok()
    }

    /// Count shown for record `id`, if cached.
    pub fn book_count(&self, id: i64) -> Option<i64> {
        let col = self.strategy.count_column()?;
        let row = self.row_index_by_id(id)?;
        self.table.get_cell(row, col)?.parse().ok()
    }

    fn single_selection(&self) -> Option<usize> {
        if self.selection.len() == 1 {
            self.selection.first().copied()
        } else {
            None
        }
    }

    /// Trim every value, pad to the schema width, then check required fields
    /// that the form actually shows.
    fn normalize(&self, values: &[String]) -> Result<Row, ActionError> {
        let fields = self.table.fields();
        let mut normalized: Row = values
            .iter()
            .take(fields.len())
            .map(|value| value.trim().to_string())
            .collect();
        normalized.resize(fields.len(), String::new());

        let missing: Vec<&'static str> = fields
            .iter()
            .zip(&normalized)
            .filter(|(field, value)| field.required && !field.hidden_in_form && value.is_empty())
            .map(|(field, _)| field.label)
            .collect();

        if missing.is_empty() {
            Ok(normalized)
        } else {
            Err(ActionError::MissingFields(missing))
        }
    }

    fn rejected(&self, action: &str, err: ActionError) -> ActionError {
        warn!(entity = %self.strategy.kind(), action, error = %err, "action rejected");
        err
    }
}

impl<S: EntityStrategy> EntityManager for Manager<S> {
    fn kind(&self) -> EntityKind {
        self.strategy.kind()
    }

    fn table(&self) -> &RecordTable {
        &self.table
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn selection(&self) -> &BTreeSet<usize> {
        &self.selection
    }

    fn choices(&self, col: usize) -> &[String] {
        self.choices.get(&col).map(Vec::as_slice).unwrap_or(&[])
    }

    fn select(&mut self, indices: &[usize]) {
        let rows = self.table.row_count();
        self.selection = indices.iter().copied().filter(|&idx| idx < rows).collect();
    }

    fn toggle_selected(&mut self, index: usize) {
        if index >= self.table.row_count() {
            return;
        }
        if !self.selection.remove(&index) {
            self.selection.insert(index);
        }
    }

    fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn begin_add(&mut self) -> Row {
        self.mode = Mode::AddForm;
        self.strategy.blank_form(&self.choices)
    }

    fn begin_edit(&mut self) -> Result<Row, ActionError> {
        let row = self
            .single_selection()
            .and_then(|index| self.table.row(index))
            .map(<[String]>::to_vec)
            .ok_or(ActionError::NoSelection)?;
        self.mode = Mode::EditForm;
        Ok(row)
    }

    fn cancel(&mut self) {
        self.mode = Mode::List;
    }

    fn load(&mut self, conn: &Connection) -> Result<(), ActionError> {
        let kind = self.strategy.kind();
        let rows = self
            .strategy
            .load(conn)
            .map_err(ActionError::store("load", kind))?;
        let choices = self
            .strategy
            .load_choices(conn)
            .map_err(ActionError::store("load", kind))?;

        self.table.replace_rows(rows)?;
        self.choices = choices;
        self.selection.clear();
        info!(entity = %kind, rows = self.table.row_count(), "loaded records");
        Ok(())
    }

    fn add(
        &mut self,
        conn: &Connection,
        values: &[String],
        sink: &mut dyn EventSink,
    ) -> Result<usize, ActionError> {
        let values = self.normalize(values).map_err(|err| self.rejected("add", err))?;
        let applied = self
            .strategy
            .create(conn, &values)
            .map_err(|err| self.rejected("add", err))?;

        let index = self.table.insert_row(applied.row)?;
        self.mode = Mode::List;
        debug!(entity = %self.strategy.kind(), index, "added row");
        sink.emit(applied.event);
        Ok(index)
    }

    fn edit(
        &mut self,
        conn: &Connection,
        values: &[String],
        sink: &mut dyn EventSink,
    ) -> Result<usize, ActionError> {
        let index = self
            .single_selection()
            .ok_or(ActionError::NoSelection)
            .map_err(|err| self.rejected("edit", err))?;
        let values = self.normalize(values).map_err(|err| self.rejected("edit", err))?;
        let current = self
            .table
            .row(index)
            .map(<[String]>::to_vec)
            .ok_or(ActionError::NoSelection)?;

        let applied = self
            .strategy
            .update(conn, &current, &values)
            .map_err(|err| self.rejected("edit", err))?;

        self.table.set_row(index, applied.row)?;
        self.mode = Mode::List;
        debug!(entity = %self.strategy.kind(), index, "edited row");
        sink.emit(applied.event);
        Ok(index)
    }

    fn delete_rows(
        &mut self,
        conn: &Connection,
        indices: &[usize],
        sink: &mut dyn EventSink,
    ) -> DeleteReport {
        let mut ordered = indices.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut report = DeleteReport::default();
        for original in ordered {
            // Every earlier removal in this batch shifted the row up by one.
            let index = original - report.deleted.len();
            let Some(row) = self.table.row(index).map(<[String]>::to_vec) else {
                warn!(entity = %self.strategy.kind(), row = original, "delete target out of range");
                continue;
            };
            let key = self.strategy.key_of(&row);

            match self.strategy.delete(conn, &row) {
                Ok(event) => {
                    self.table.remove_row(index);
                    debug!(entity = %self.strategy.kind(), key = %key, "deleted row");
                    report.deleted.push(key);
                    sink.emit(event);
                }
                Err(error) => {
                    let error = self.rejected("delete", error);
                    report.failed.push(DeleteFailure {
                        row: original,
                        key,
                        error,
                    });
                }
            }
        }

        self.selection.clear();
        report
    }

    fn delete_selected(&mut self, conn: &Connection, sink: &mut dyn EventSink) -> DeleteReport {
        let indices: Vec<usize> = self.selection.iter().copied().collect();
        self.delete_rows(conn, &indices, sink)
    }
}

/// Value of column `idx`, or `""` when the row is shorter.
pub(crate) fn cell(values: &[String], idx: usize) -> &str {
    values.get(idx).map(String::as_str).unwrap_or("")
}

/// Parse the id column of a cached row.
pub(crate) fn row_id(row: &[String]) -> Result<i64, ActionError> {
    let raw = cell(row, ID_COL);
    raw.parse()
        .map_err(|_| ActionError::InvalidInput(format!("Row id \"{raw}\" is not a number.")))
}
