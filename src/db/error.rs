use rusqlite::{ffi, Error as SqlError, ErrorCode};
use thiserror::Error;

/// Failures reported by the persistence helpers. Constraint violations are
/// classified so managers can tell a duplicate from a blocked delete.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a {entity} with {field} \"{value}\" already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{entity} is still referenced by at least one book")]
    InUse { entity: &'static str, id: i64 },
    #[error("the selected author or category no longer exists")]
    MissingReference,
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("database error: {0}")]
    Sqlite(#[from] SqlError),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Whether the error is a referential-integrity conflict on delete.
    pub fn is_in_use(&self) -> bool {
        matches!(self, StoreError::InUse { .. })
    }
}

/// Constraint families we translate into domain errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Constraint {
    Unique,
    ForeignKey,
}

pub(crate) fn constraint_of(err: &SqlError) -> Option<Constraint> {
    match err {
        SqlError::SqliteFailure(inner, _) if inner.code == ErrorCode::ConstraintViolation => {
            match inner.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Some(Constraint::Unique)
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Coerce SQLite constraint errors into [`StoreError`] variants. Anything that
/// is not a unique or foreign-key violation stays a raw SQLite error.
pub(crate) fn map_constraint(
    err: SqlError,
    on_unique: impl FnOnce() -> StoreError,
    on_foreign_key: impl FnOnce() -> StoreError,
) -> StoreError {
    match constraint_of(&err) {
        Some(Constraint::Unique) => on_unique(),
        Some(Constraint::ForeignKey) => on_foreign_key(),
        None => StoreError::Sqlite(err),
    }
}
