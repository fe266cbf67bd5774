use std::fs;
use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::error::BookResult;

/// Open (creating if needed) the SQLite database at `path` and make sure the
/// schema exists. The parent directory is created on first launch.
pub(crate) fn open_connection(path: &Path) -> BookResult<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;
    debug!(path = %path.display(), "opened book database");
    init_connection(conn)
}

/// Private in-memory database, used by tests and throwaway sessions.
pub(crate) fn open_in_memory() -> BookResult<Connection> {
    init_connection(Connection::open_in_memory()?)
}

/// Apply durability pragmas and run lazy schema creation. `synchronous = FULL`
/// makes every committed transaction durable before the call returns.
fn init_connection(conn: Connection) -> BookResult<Connection> {
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
        row.get::<_, String>(0)
    })?;
    conn.pragma_update(None, "synchronous", "FULL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'TBR',
            genre TEXT NOT NULL DEFAULT '',
            format TEXT NOT NULL DEFAULT '',
            pages INTEGER CHECK (pages IS NULL OR pages > 0),
            start_date TEXT,
            end_date TEXT,
            rating INTEGER CHECK (rating IS NULL OR rating BETWEEN 1 AND 5),
            notes TEXT
        )",
        [],
    )?;

    Ok(conn)
}
