//! Domain models that mirror the SQLite schema and get passed throughout the
//! engine and the TUI. `Book` is the stored record; `BookFields` and
//! `BookPatch` are the typed requests the UI sends to the store, and `Field`
//! is the closed set of attribute names used by filtering, validation errors,
//! and export column ordering.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BookError, BookResult};

/// Highest rating a book can receive. Ratings start at 1.
pub const MAX_RATING: u8 = 5;

/// Canonical text format for dates in storage, filtering, and export.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Primary key of a book. Wraps the SQLite rowid so ids cannot be mixed up with
/// page counts or other integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub i64);

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reading progress of a book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "TBR")]
    Tbr,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
}

impl Status {
    /// Name used in the database, exports, and filter matching.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Tbr => "TBR",
            Status::InProgress => "IN_PROGRESS",
            Status::Completed => "COMPLETED",
        }
    }

    /// Cycle to the next status; the form uses this for its status selector.
    pub fn next(self) -> Self {
        match self {
            Status::Tbr => Status::InProgress,
            Status::InProgress => Status::Completed,
            Status::Completed => Status::Tbr,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = BookError;

    /// Accepts the wire names plus the loose spellings people type into the
    /// form (`in progress`, `in-progress`, `done`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "" | "TBR" => Ok(Status::Tbr),
            "IN_PROGRESS" | "READING" => Ok(Status::InProgress),
            "COMPLETED" | "DONE" | "READ" => Ok(Status::Completed),
            _ => Err(BookError::validation(
                Field::Status,
                "status must be one of TBR, IN_PROGRESS or COMPLETED.",
            )),
        }
    }
}

/// Attributes of a [`Book`]. The declaration order is the fixed column order
/// for tables and CSV export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Title,
    Author,
    Status,
    Genre,
    Format,
    Pages,
    StartDate,
    EndDate,
    Rating,
    Notes,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Id,
        Field::Title,
        Field::Author,
        Field::Status,
        Field::Genre,
        Field::Format,
        Field::Pages,
        Field::StartDate,
        Field::EndDate,
        Field::Rating,
        Field::Notes,
    ];

    /// Snake-case attribute name, identical to the SQLite column and the JSON
    /// key.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Title => "title",
            Field::Author => "author",
            Field::Status => "status",
            Field::Genre => "genre",
            Field::Format => "format",
            Field::Pages => "pages",
            Field::StartDate => "start_date",
            Field::EndDate => "end_date",
            Field::Rating => "rating",
            Field::Notes => "notes",
        }
    }

    /// Human-facing column header.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Id => "Id",
            Field::Title => "Title",
            Field::Author => "Author",
            Field::Status => "Status",
            Field::Genre => "Genre",
            Field::Format => "Format",
            Field::Pages => "Pages",
            Field::StartDate => "Start Date",
            Field::EndDate => "End Date",
            Field::Rating => "Rating",
            Field::Notes => "Notes",
        }
    }

    /// Render the value of this attribute for `book` as canonical text. Absent
    /// values render as an empty string.
    pub fn render(&self, book: &Book) -> String {
        match self {
            Field::Id => book.id.to_string(),
            Field::Title => book.title.clone(),
            Field::Author => book.author.clone(),
            Field::Status => book.status.as_str().to_string(),
            Field::Genre => book.genre.clone(),
            Field::Format => book.format.clone(),
            Field::Pages => render_opt(book.pages),
            Field::StartDate => render_date(book.start_date),
            Field::EndDate => render_date(book.end_date),
            Field::Rating => render_opt(book.rating),
            Field::Notes => book.notes.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = BookError;

    /// Resolve a field name. Both the snake-case names and the display labels
    /// are accepted, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Field::ALL
            .into_iter()
            .find(|field| field.name() == normalized)
            .ok_or_else(|| BookError::InvalidField(s.trim().to_string()))
    }
}

fn render_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn render_date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parse a `YYYY-MM-DD` date typed by the user. Blank input means "no date".
pub fn parse_date(field: Field, raw: &str) -> BookResult<Option<NaiveDate>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(Some)
        .map_err(|_| BookError::validation(field, "dates must be formatted as 'YYYY-MM-DD'."))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single reading record as stored in the catalog.
pub struct Book {
    /// Assigned by the store on creation and never changed afterwards.
    pub id: BookId,
    pub title: String,
    /// Conventionally `Lastname, First` so author listings sort sensibly.
    pub author: String,
    #[serde(default)]
    pub status: Status,
    /// Free-form category; empty when unset.
    #[serde(default)]
    pub genre: String,
    /// Free-form edition format (paperback, ebook, audiobook, ...).
    #[serde(default)]
    pub format: String,
    pub pages: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub rating: Option<u8>,
    pub notes: Option<String>,
}

impl Book {
    /// Hydrate a record from validated fields and a freshly assigned id.
    pub fn from_fields(id: BookId, fields: BookFields) -> Self {
        Self {
            id,
            title: fields.title,
            author: fields.author,
            status: fields.status,
            genre: fields.genre,
            format: fields.format,
            pages: fields.pages,
            start_date: fields.start_date,
            end_date: fields.end_date,
            rating: fields.rating,
            notes: fields.notes,
        }
    }

    /// Whole days between starting and finishing the book, or `None` unless
    /// both dates are known.
    pub fn days_to_read(&self) -> Option<i64> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((end - start).num_days()),
            _ => None,
        }
    }

    /// Check the record invariants. Records loaded from the store always pass;
    /// records assembled elsewhere (imports, tests) might not.
    pub fn validate(&self) -> BookResult<()> {
        check_invariants(
            &self.title,
            &self.author,
            self.pages,
            self.start_date,
            self.end_date,
            self.rating,
        )
    }

    /// Compose a `Title - Author` string that omits the hyphen when the author
    /// is blank.
    pub fn display_title(&self) -> String {
        if self.author.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.author)
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Everything needed to create a book. The store validates and normalizes it
/// before insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub status: Status,
    pub genre: String,
    pub format: String,
    pub pages: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub rating: Option<u8>,
    pub notes: Option<String>,
}

impl BookFields {
    /// Convenience constructor for the two required attributes.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    /// Trim text inputs and drop blank notes so equal-looking inputs store
    /// identically.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            genre: self.genre.trim().to_string(),
            format: self.format.trim().to_string(),
            notes: normalize_notes(self.notes),
            ..self
        }
    }

    pub fn validate(&self) -> BookResult<()> {
        check_invariants(
            &self.title,
            &self.author,
            self.pages,
            self.start_date,
            self.end_date,
            self.rating,
        )
    }
}

impl From<&Book> for BookFields {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            status: book.status,
            genre: book.genre.clone(),
            format: book.format.clone(),
            pages: book.pages,
            start_date: book.start_date,
            end_date: book.end_date,
            rating: book.rating,
            notes: book.notes.clone(),
        }
    }
}

/// Sparse update where each `Some` overwrites the stored value. Optional
/// attributes nest a second `Option` so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub status: Option<Status>,
    pub genre: Option<String>,
    pub format: Option<String>,
    pub pages: Option<Option<u32>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub rating: Option<Option<u8>>,
    pub notes: Option<Option<String>>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply this patch in place. The id is never touched.
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(v) = &self.title {
            book.title = v.trim().to_string();
        }
        if let Some(v) = &self.author {
            book.author = v.trim().to_string();
        }
        if let Some(v) = self.status {
            book.status = v;
        }
        if let Some(v) = &self.genre {
            book.genre = v.trim().to_string();
        }
        if let Some(v) = &self.format {
            book.format = v.trim().to_string();
        }
        if let Some(v) = self.pages {
            book.pages = v;
        }
        if let Some(v) = self.start_date {
            book.start_date = v;
        }
        if let Some(v) = self.end_date {
            book.end_date = v;
        }
        if let Some(v) = self.rating {
            book.rating = v;
        }
        if let Some(v) = &self.notes {
            book.notes = normalize_notes(v.clone());
        }
    }
}

impl From<BookFields> for BookPatch {
    /// A patch that replaces every attribute, used by the edit form.
    fn from(fields: BookFields) -> Self {
        Self {
            title: Some(fields.title),
            author: Some(fields.author),
            status: Some(fields.status),
            genre: Some(fields.genre),
            format: Some(fields.format),
            pages: Some(fields.pages),
            start_date: Some(fields.start_date),
            end_date: Some(fields.end_date),
            rating: Some(fields.rating),
            notes: Some(fields.notes),
        }
    }
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

fn check_invariants(
    title: &str,
    author: &str,
    pages: Option<u32>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    rating: Option<u8>,
) -> BookResult<()> {
    if title.trim().is_empty() {
        return Err(BookError::validation(Field::Title, "title is required."));
    }
    if author.trim().is_empty() {
        return Err(BookError::validation(Field::Author, "author is required."));
    }
    if pages == Some(0) {
        return Err(BookError::validation(
            Field::Pages,
            "pages must be a positive number.",
        ));
    }
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            return Err(BookError::validation(
                Field::EndDate,
                "end_date must not be before start_date.",
            ));
        }
    }
    if let Some(rating) = rating {
        if !(1..=MAX_RATING).contains(&rating) {
            return Err(BookError::validation(
                Field::Rating,
                format!("rating must be between 1 and {MAX_RATING}."),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn days_to_read_needs_both_dates() {
        let mut book = Book::from_fields(BookId(1), BookFields::new("Dune", "Herbert, Frank"));
        assert_eq!(book.days_to_read(), None);

        book.start_date = Some(date(2025, 1, 1));
        assert_eq!(book.days_to_read(), None);

        book.end_date = Some(date(2025, 1, 2));
        assert_eq!(book.days_to_read(), Some(1));

        book.end_date = Some(date(2025, 1, 1));
        assert_eq!(book.days_to_read(), Some(0));
    }

    #[test]
    fn validation_names_the_offending_field() {
        let mut fields = BookFields::new("Dune", "  ");
        let err = fields.validate().unwrap_err();
        assert!(matches!(err, BookError::Validation { field: Field::Author, .. }));

        fields.author = "Herbert, Frank".into();
        fields.start_date = Some(date(2024, 1, 1));
        fields.end_date = Some(date(2023, 1, 1));
        let err = fields.validate().unwrap_err();
        assert!(matches!(err, BookError::Validation { field: Field::EndDate, .. }));

        fields.end_date = Some(date(2024, 1, 1));
        fields.rating = Some(6);
        let err = fields.validate().unwrap_err();
        assert!(matches!(err, BookError::Validation { field: Field::Rating, .. }));
    }

    #[test]
    fn field_names_parse_from_labels() {
        assert_eq!("start_date".parse::<Field>().unwrap(), Field::StartDate);
        assert_eq!("Start Date".parse::<Field>().unwrap(), Field::StartDate);
        assert_eq!(" TITLE ".parse::<Field>().unwrap(), Field::Title);
        assert!(matches!(
            "isbn".parse::<Field>(),
            Err(BookError::InvalidField(name)) if name == "isbn"
        ));
    }

    #[test]
    fn status_parses_loose_spellings() {
        assert_eq!("in progress".parse::<Status>().unwrap(), Status::InProgress);
        assert_eq!("completed".parse::<Status>().unwrap(), Status::Completed);
        assert_eq!("".parse::<Status>().unwrap(), Status::Tbr);
        assert!("TB".parse::<Status>().is_err());
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert_eq!(parse_date(Field::StartDate, " ").unwrap(), None);
        assert_eq!(
            parse_date(Field::StartDate, "2025-01-02").unwrap(),
            Some(date(2025, 1, 2))
        );
        let err = parse_date(Field::EndDate, "01/02/2025").unwrap_err();
        assert!(matches!(err, BookError::Validation { field: Field::EndDate, .. }));
    }

    #[test]
    fn patch_clears_optional_values() {
        let mut fields = BookFields::new("Dune", "Herbert, Frank");
        fields.pages = Some(412);
        fields.notes = Some("re-read".into());
        let mut book = Book::from_fields(BookId(7), fields);

        let patch = BookPatch {
            pages: Some(None),
            notes: Some(Some("   ".into())),
            ..BookPatch::default()
        };
        patch.apply_to(&mut book);

        assert_eq!(book.id, BookId(7));
        assert_eq!(book.pages, None);
        assert_eq!(book.notes, None);
    }
}
