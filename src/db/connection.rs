use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::Connection;
use tracing::info;

use super::error::StoreResult;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".library-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "library.sqlite";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT
    );
    CREATE TABLE IF NOT EXISTS authors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        bio TEXT
    );
    CREATE TABLE IF NOT EXISTS books (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        author_id INTEGER NOT NULL REFERENCES authors(id),
        category_id INTEGER NOT NULL REFERENCES categories(id),
        isbn TEXT NOT NULL UNIQUE,
        release_date TEXT NOT NULL,
        description TEXT
    );
";

/// Open (creating if needed) the database at `path` and make sure the schema
/// exists.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("failed to create data directory")?;
        }
    }

    let conn = Connection::open(path).context("failed to open SQLite database")?;
    init_schema(&conn).context("failed to initialize schema")?;
    info!(path = %path.display(), "opened library database");
    Ok(conn)
}

/// Idempotent schema setup. Also toggles `PRAGMA foreign_keys = ON`, which
/// SQLite tracks per connection, so deleting a referenced author or category
/// is rejected by the database itself.
pub fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Resolve the default database location inside the user's home.
pub fn default_database_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('books', 'authors', 'categories')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);

        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
