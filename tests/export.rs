use book_tracker::export::DAYS_TO_READ_COLUMN;
use book_tracker::{
    decode, encode, export_to_path, Book, BookError, BookFields, BookId, BookStore, ExportFormat,
    ExportOptions, Status,
};
use chrono::NaiveDate;
use serde_json::Value;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn catalog() -> Vec<Book> {
    let mut store = BookStore::open_in_memory().unwrap();
    store
        .create(BookFields {
            status: Status::Completed,
            genre: "Classic".into(),
            format: "Paperback".into(),
            pages: Some(1225),
            start_date: Some(date(2024, 1, 1)),
            end_date: Some(date(2024, 1, 11)),
            rating: Some(5),
            notes: Some("Said \"epic\", meant it,\nreally".into()),
            ..BookFields::new("War and Peace", "Tolstoy, Leo")
        })
        .unwrap();
    store
        .create(BookFields::new("Dune", "Herbert, Frank"))
        .unwrap();
    store.list_all().unwrap()
}

#[test]
fn json_round_trips_field_for_field() {
    let books = catalog();
    let bytes = encode(&books, ExportFormat::Json, ExportOptions::default()).unwrap();
    assert_eq!(decode(&bytes, ExportFormat::Json).unwrap(), books);
}

#[test]
fn csv_round_trips_field_for_field() {
    let books = catalog();
    let bytes = encode(&books, ExportFormat::Csv, ExportOptions::default()).unwrap();
    assert_eq!(decode(&bytes, ExportFormat::Csv).unwrap(), books);
}

#[test]
fn csv_has_fixed_header_and_quotes_awkward_text() {
    let books = catalog();
    let bytes = encode(&books, ExportFormat::Csv, ExportOptions::default()).unwrap();
    let text = String::from_utf8(bytes).unwrap();

    let header = text.lines().next().unwrap();
    assert_eq!(
        header,
        "id,title,author,status,genre,format,pages,start_date,end_date,rating,notes,days_to_read"
    );
    assert!(text.contains("\"Tolstoy, Leo\""));
    assert!(text.contains("\"Said \"\"epic\"\", meant it,\nreally\""));
    // Absent values are empty cells.
    assert!(text.contains("2,Dune,\"Herbert, Frank\",TBR,,,,,,,,\n"));
}

#[test]
fn json_uses_attribute_names_and_nulls() {
    let books = catalog();
    let bytes = encode(&books, ExportFormat::Json, ExportOptions::default()).unwrap();
    let rows: Vec<Value> = serde_json::from_slice(&bytes).unwrap();

    let first = &rows[0];
    assert_eq!(first["id"], 1);
    assert_eq!(first["status"], "COMPLETED");
    assert_eq!(first["pages"], 1225);
    assert_eq!(first["start_date"], "2024-01-01");
    assert_eq!(first[DAYS_TO_READ_COLUMN], 10);

    let second = rows[1].as_object().unwrap();
    assert_eq!(second["pages"], Value::Null);
    assert_eq!(second["end_date"], Value::Null);
    assert_eq!(second["notes"], Value::Null);
    assert_eq!(second[DAYS_TO_READ_COLUMN], Value::Null);
    assert_eq!(second.len(), 12);
}

#[test]
fn derived_column_is_optional() {
    let books = catalog();
    let options = ExportOptions {
        include_derived: false,
    };

    let csv = String::from_utf8(encode(&books, ExportFormat::Csv, options).unwrap()).unwrap();
    assert!(!csv.lines().next().unwrap().contains(DAYS_TO_READ_COLUMN));

    let json = encode(&books, ExportFormat::Json, options).unwrap();
    let rows: Vec<Value> = serde_json::from_slice(&json).unwrap();
    assert!(rows[0].get(DAYS_TO_READ_COLUMN).is_none());
    assert_eq!(decode(&json, ExportFormat::Json).unwrap(), books);
}

#[test]
fn empty_catalog_encodes() {
    let json = encode(&[], ExportFormat::Json, ExportOptions::default()).unwrap();
    assert_eq!(decode(&json, ExportFormat::Json).unwrap(), Vec::<Book>::new());

    let csv = encode(&[], ExportFormat::Csv, ExportOptions::default()).unwrap();
    assert_eq!(String::from_utf8(csv).unwrap().lines().count(), 1);
}

#[test]
fn invalid_records_fail_with_encoding_error() {
    let mut books = catalog();
    books[1].rating = Some(9);
    let err = encode(&books, ExportFormat::Csv, ExportOptions::default()).unwrap_err();
    assert!(matches!(err, BookError::Encoding(_)));

    let mut books = catalog();
    books[1].id = BookId(1);
    let err = encode(&books, ExportFormat::Json, ExportOptions::default()).unwrap_err();
    assert!(matches!(err, BookError::Encoding(message) if message.contains("duplicate")));
}

#[test]
fn malformed_input_fails_to_decode() {
    let err = decode(b"{not json", ExportFormat::Json).unwrap_err();
    assert!(matches!(err, BookError::Encoding(_)));

    let err = decode(b"id,title\nabc,Dune\n", ExportFormat::Csv).unwrap_err();
    assert!(matches!(err, BookError::Encoding(_)));
}

#[test]
fn formats_parse_from_names_and_paths() {
    assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
    assert_eq!(
        ExportFormat::from_path("out/books.json".as_ref()).unwrap(),
        ExportFormat::Json
    );
    assert!(matches!(
        "xml".parse::<ExportFormat>(),
        Err(BookError::Encoding(_))
    ));
    assert!(ExportFormat::from_path("books".as_ref()).is_err());
}

#[test]
fn export_to_path_writes_the_inferred_format() {
    let dir = TempDir::new().unwrap();
    let books = catalog();

    let path = dir.path().join("exports").join("books.json");
    let format = export_to_path(&books, &path, ExportOptions::default()).unwrap();
    assert_eq!(format, ExportFormat::Json);
    let written = std::fs::read(&path).unwrap();
    assert_eq!(decode(&written, ExportFormat::Json).unwrap(), books);

    let path = dir.path().join("books.csv");
    export_to_path(&books, &path, ExportOptions::default()).unwrap();
    let written = std::fs::read(&path).unwrap();
    assert_eq!(decode(&written, ExportFormat::Csv).unwrap(), books);

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}
