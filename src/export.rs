//! CSV and JSON interchange for book records. Encoding is pure (records in,
//! bytes out); `export_to_path` is the small file-writing wrapper the TUI uses.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use crate::error::{BookError, BookResult};
use crate::models::{Book, Field};

/// Header/key of the derived days-to-read value.
pub const DAYS_TO_READ_COLUMN: &str = "days_to_read";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    /// Infer the format from a file extension such as `books.csv`.
    pub fn from_path(path: &Path) -> BookResult<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                BookError::Encoding(format!(
                    "cannot tell the export format of '{}' (use .csv or .json)",
                    path.display()
                ))
            })?;
        ext.parse()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = BookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(BookError::Encoding(format!(
                "unsupported export format '{other}' (use csv or json)"
            ))),
        }
    }
}

/// Knobs for [`encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Append the derived `days_to_read` column/key.
    pub include_derived: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_derived: true,
        }
    }
}

/// JSON shape of one record: the stored attributes plus, optionally, the
/// derived value. Absent values serialize as `null` in both positions.
#[derive(Serialize)]
struct ExportRecord<'a> {
    #[serde(flatten)]
    book: &'a Book,
    #[serde(skip_serializing_if = "Option::is_none")]
    days_to_read: Option<Option<i64>>,
}

/// Serialize `records` in `format`. Only structurally invalid input fails:
/// records that break the book invariants or repeat an id.
pub fn encode(records: &[Book], format: ExportFormat, options: ExportOptions) -> BookResult<Vec<u8>> {
    check_records(records)?;
    match format {
        ExportFormat::Csv => encode_csv(records, options),
        ExportFormat::Json => encode_json(records, options),
    }
}

fn check_records(records: &[Book]) -> BookResult<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for book in records {
        if !seen.insert(book.id) {
            return Err(BookError::Encoding(format!("duplicate book id {}", book.id)));
        }
        book.validate()
            .map_err(|err| BookError::Encoding(format!("book {}: {err}", book.id)))?;
    }
    Ok(())
}

fn encode_csv(records: &[Book], options: ExportOptions) -> BookResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = Field::ALL.iter().map(|field| field.name()).collect();
    if options.include_derived {
        header.push(DAYS_TO_READ_COLUMN);
    }
    writer.write_record(&header).map_err(encoding_error)?;

    for book in records {
        let mut row: Vec<String> = Field::ALL.iter().map(|field| field.render(book)).collect();
        if options.include_derived {
            row.push(
                book.days_to_read()
                    .map(|days| days.to_string())
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&row).map_err(encoding_error)?;
    }

    writer
        .into_inner()
        .map_err(|err| BookError::Encoding(err.to_string()))
}

fn encode_json(records: &[Book], options: ExportOptions) -> BookResult<Vec<u8>> {
    let rows: Vec<ExportRecord<'_>> = records
        .iter()
        .map(|book| ExportRecord {
            book,
            days_to_read: options.include_derived.then(|| book.days_to_read()),
        })
        .collect();
    serde_json::to_vec_pretty(&rows).map_err(encoding_error)
}

/// Parse records previously produced by [`encode`]. Extra columns (such as the
/// derived `days_to_read`) are ignored; every decoded record must satisfy the
/// book invariants.
pub fn decode(bytes: &[u8], format: ExportFormat) -> BookResult<Vec<Book>> {
    let books: Vec<Book> = match format {
        ExportFormat::Csv => {
            let mut reader = csv::Reader::from_reader(bytes);
            reader
                .deserialize::<Book>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(encoding_error)?
        }
        ExportFormat::Json => serde_json::from_slice(bytes).map_err(encoding_error)?,
    };
    check_records(&books)?;
    Ok(books)
}

/// Encode `records` and write them to `path`, choosing the format from the
/// file extension. The bytes land in a sibling temp file first and are renamed
/// into place, so a failed export never leaves a truncated file behind.
pub fn export_to_path(
    records: &[Book],
    path: &Path,
    options: ExportOptions,
) -> BookResult<ExportFormat> {
    let format = ExportFormat::from_path(path)?;
    let bytes = encode(records, format, options)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension(format!("{}.tmp", format.extension()));
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;

    info!(path = %path.display(), %format, count = records.len(), "exported books");
    Ok(format)
}

fn encoding_error(err: impl fmt::Display) -> BookError {
    BookError::Encoding(err.to_string())
}
