use std::path::Path;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::error::{BookError, BookResult};
use crate::models::{Book, BookFields, BookId, BookPatch, Status};

use super::connection::{open_connection, open_in_memory};

/// Column list shared by every query that hydrates a [`Book`]; `read_book`
/// depends on this exact order.
const BOOK_COLUMNS: &str =
    "id, title, author, status, genre, format, pages, start_date, end_date, rating, notes";

/// Authoritative, durable collection of books. The store owns its SQLite
/// connection; mutators take `&mut self` so only one write is ever in flight,
/// and each one runs inside a transaction that commits before returning.
pub struct BookStore {
    conn: Connection,
}

impl BookStore {
    /// Open the catalog at `path`, creating the file and schema on first use.
    pub fn open(path: impl AsRef<Path>) -> BookResult<Self> {
        let conn = open_connection(path.as_ref())?;
        Ok(Self { conn })
    }

    /// Open a catalog that lives only as long as the returned store.
    pub fn open_in_memory() -> BookResult<Self> {
        Ok(Self {
            conn: open_in_memory()?,
        })
    }

    /// Checkpoint the write-ahead log and close the connection, reporting any
    /// failure instead of swallowing it in `Drop`.
    pub fn close(self) -> BookResult<()> {
        self.conn
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        self.conn.close().map_err(|(_, err)| BookError::Storage(err))?;
        debug!("closed book database");
        Ok(())
    }

    /// Every book in insertion order. The ordering is the listing order that
    /// filtering preserves.
    pub fn list_all(&self) -> BookResult<Vec<Book>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY id"))?;

        let books = stmt
            .query_map([], read_book)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = books.len(), "listed books");
        Ok(books)
    }

    pub fn get(&self, id: BookId) -> BookResult<Book> {
        fetch_book(&self.conn, id)
    }

    /// Number of stored books.
    pub fn count(&self) -> BookResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Distinct authors for form auto-completion, sorted case-insensitively
    /// with the original text as tie-breaker.
    pub fn authors(&self) -> BookResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT author FROM books
             WHERE author <> ''
             ORDER BY LOWER(author), author",
        )?;

        let authors = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(authors)
    }

    /// Validate and insert a new book, returning the stored record with its
    /// freshly assigned id.
    pub fn create(&mut self, fields: BookFields) -> BookResult<Book> {
        let fields = fields.normalized();
        if let Err(err) = fields.validate() {
            warn!(error = %err, "rejected new book");
            return Err(err);
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO books
                (title, author, status, genre, format, pages, start_date, end_date, rating, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                fields.title,
                fields.author,
                fields.status,
                fields.genre,
                fields.format,
                fields.pages,
                fields.start_date,
                fields.end_date,
                fields.rating,
                fields.notes,
            ],
        )?;
        let id = BookId(tx.last_insert_rowid());
        tx.commit()?;

        let book = Book::from_fields(id, fields);
        info!(id = %book.id, title = %book.title, "added book");
        Ok(book)
    }

    /// Merge `patch` into the stored record, re-validate the result under the
    /// same rules as [`BookStore::create`], and persist the full replacement.
    pub fn update(&mut self, id: BookId, patch: BookPatch) -> BookResult<Book> {
        let tx = self.conn.transaction()?;
        let before = fetch_book(&tx, id)?;
        if patch.is_empty() {
            debug!(%id, "empty edit, nothing to write");
            return Ok(before);
        }

        let mut book = before.clone();
        patch.apply_to(&mut book);
        if let Err(err) = book.validate() {
            warn!(%id, error = %err, "rejected book edit");
            return Err(err);
        }

        tx.execute(
            "UPDATE books SET
                title = ?1, author = ?2, status = ?3, genre = ?4, format = ?5,
                pages = ?6, start_date = ?7, end_date = ?8, rating = ?9, notes = ?10
             WHERE id = ?11",
            params![
                book.title,
                book.author,
                book.status,
                book.genre,
                book.format,
                book.pages,
                book.start_date,
                book.end_date,
                book.rating,
                book.notes,
                book.id,
            ],
        )?;
        tx.commit()?;

        info!(%id, before = ?before, after = ?book, "edited book");
        Ok(book)
    }

    /// Permanently remove a book. Deleting an id that is not present is an
    /// error, so a second delete of the same id reports `NotFound`.
    pub fn delete(&mut self, id: BookId) -> BookResult<()> {
        let tx = self.conn.transaction()?;
        let title: String = tx
            .query_row(
                "DELETE FROM books WHERE id = ?1 RETURNING title",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(BookError::NotFound(id))?;
        tx.commit()?;

        info!(%id, %title, "deleted book");
        Ok(())
    }
}

fn fetch_book(conn: &Connection, id: BookId) -> BookResult<Book> {
    conn.query_row(
        &format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"),
        params![id],
        read_book,
    )
    .optional()?
    .ok_or(BookError::NotFound(id))
}

fn read_book(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        status: row.get(3)?,
        genre: row.get(4)?,
        format: row.get(5)?,
        pages: row.get(6)?,
        start_date: row.get(7)?,
        end_date: row.get(8)?,
        rating: row.get(9)?,
        notes: row.get(10)?,
    })
}

impl ToSql for BookId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for BookId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(BookId)
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err: BookError| FromSqlError::Other(Box::new(err)))
    }
}
