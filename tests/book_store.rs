use std::collections::BTreeSet;

use book_tracker::{Book, BookError, BookFields, BookId, BookPatch, BookStore, Field, Status};
use chrono::NaiveDate;
use proptest::prelude::*;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn war_and_peace() -> BookFields {
    BookFields {
        status: Status::Completed,
        genre: "Classic".into(),
        format: "Paperback".into(),
        pages: Some(1225),
        start_date: Some(date(2024, 1, 1)),
        end_date: Some(date(2024, 1, 11)),
        rating: Some(5),
        notes: Some("Long but worth it".into()),
        ..BookFields::new("War and Peace", "Tolstoy, Leo")
    }
}

#[test]
fn create_then_get_returns_equal_record() {
    let mut store = BookStore::open_in_memory().unwrap();
    let created = store.create(war_and_peace()).unwrap();

    let fetched = store.get(created.id).unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.title, "War and Peace");
    assert_eq!(fetched.days_to_read(), Some(10));
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn create_trims_text_and_drops_blank_notes() {
    let mut store = BookStore::open_in_memory().unwrap();
    let fields = BookFields {
        notes: Some("   ".into()),
        ..BookFields::new("  Dune ", " Herbert, Frank")
    };

    let book = store.create(fields).unwrap();
    assert_eq!(book.title, "Dune");
    assert_eq!(book.author, "Herbert, Frank");
    assert_eq!(book.notes, None);
    assert_eq!(store.get(book.id).unwrap(), book);
}

#[test]
fn create_rejects_invalid_fields_without_writing() {
    let mut store = BookStore::open_in_memory().unwrap();

    let err = store.create(BookFields::new("", "Someone")).unwrap_err();
    assert!(matches!(err, BookError::Validation { field: Field::Title, .. }));

    let backwards = BookFields {
        start_date: Some(date(2024, 2, 1)),
        end_date: Some(date(2024, 1, 1)),
        ..BookFields::new("Emma", "Austen, Jane")
    };
    let err = store.create(backwards).unwrap_err();
    assert!(matches!(err, BookError::Validation { field: Field::EndDate, .. }));

    let zero_pages = BookFields {
        pages: Some(0),
        ..BookFields::new("Emma", "Austen, Jane")
    };
    let err = store.create(zero_pages).unwrap_err();
    assert!(matches!(err, BookError::Validation { field: Field::Pages, .. }));

    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn list_all_is_in_insertion_order() {
    let mut store = BookStore::open_in_memory().unwrap();
    let titles = ["Ulysses", "Emma", "Dune"];
    for title in titles {
        store.create(BookFields::new(title, "Someone")).unwrap();
    }

    let listed: Vec<String> = store
        .list_all()
        .unwrap()
        .into_iter()
        .map(|book| book.title)
        .collect();
    assert_eq!(listed, titles);
    assert_eq!(store.list_all().unwrap(), store.list_all().unwrap());
}

#[test]
fn update_keeps_id_and_revalidates() {
    let mut store = BookStore::open_in_memory().unwrap();
    let book = store.create(war_and_peace()).unwrap();

    let updated = store
        .update(
            book.id,
            BookPatch {
                title: Some("War & Peace".into()),
                rating: Some(None),
                ..BookPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.id, book.id);
    assert_eq!(updated.title, "War & Peace");
    assert_eq!(updated.rating, None);
    assert_eq!(updated.author, book.author);
    assert_eq!(store.get(book.id).unwrap(), updated);

    let err = store
        .update(
            book.id,
            BookPatch {
                author: Some("   ".into()),
                ..BookPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, BookError::Validation { field: Field::Author, .. }));

    let err = store
        .update(
            book.id,
            BookPatch {
                start_date: Some(Some(date(2024, 6, 1))),
                ..BookPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, BookError::Validation { field: Field::EndDate, .. }));

    // Rejected edits leave the stored record untouched.
    assert_eq!(store.get(book.id).unwrap(), updated);
}

#[test]
fn empty_update_returns_the_stored_record() {
    let mut store = BookStore::open_in_memory().unwrap();
    let book = store.create(war_and_peace()).unwrap();

    let unchanged = store.update(book.id, BookPatch::default()).unwrap();
    assert_eq!(unchanged, book);
    assert_eq!(store.get(book.id).unwrap(), book);
}

#[test]
fn update_unknown_id_is_not_found() {
    let mut store = BookStore::open_in_memory().unwrap();
    let err = store.update(BookId(42), BookPatch::default()).unwrap_err();
    assert!(matches!(err, BookError::NotFound(BookId(42))));
}

#[test]
fn delete_twice_reports_not_found() {
    let mut store = BookStore::open_in_memory().unwrap();
    let book = store.create(war_and_peace()).unwrap();

    store.delete(book.id).unwrap();
    let err = store.delete(book.id).unwrap_err();
    assert!(matches!(err, BookError::NotFound(id) if id == book.id));
    assert!(matches!(store.get(book.id), Err(BookError::NotFound(_))));
}

#[test]
fn ids_are_not_reused_after_delete() {
    let mut store = BookStore::open_in_memory().unwrap();
    let first = store.create(BookFields::new("Emma", "Austen, Jane")).unwrap();
    let second = store.create(BookFields::new("Dune", "Herbert, Frank")).unwrap();
    store.delete(second.id).unwrap();

    let third = store.create(BookFields::new("Ulysses", "Joyce, James")).unwrap();
    assert!(third.id > second.id);
    assert_ne!(third.id, first.id);
}

#[test]
fn authors_are_distinct_and_sorted_case_insensitively() {
    let mut store = BookStore::open_in_memory().unwrap();
    for (title, author) in [
        ("Emma", "austen, Jane"),
        ("Dune", "Herbert, Frank"),
        ("Persuasion", "austen, Jane"),
        ("Beloved", "Morrison, Toni"),
    ] {
        store.create(BookFields::new(title, author)).unwrap();
    }

    assert_eq!(
        store.authors().unwrap(),
        vec!["austen, Jane", "Herbert, Frank", "Morrison, Toni"]
    );
}

#[test]
fn data_survives_close_and_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("books.sqlite");

    let mut store = BookStore::open(&path).unwrap();
    let created = store.create(war_and_peace()).unwrap();
    let other = store.create(BookFields::new("Emma", "Austen, Jane")).unwrap();
    store.delete(other.id).unwrap();
    store.close().unwrap();

    let mut reopened = BookStore::open(&path).unwrap();
    let books: Vec<Book> = reopened.list_all().unwrap();
    assert_eq!(books, vec![created]);

    // The id high-water mark survives the restart as well.
    let next = reopened.create(BookFields::new("Dune", "Herbert, Frank")).unwrap();
    assert!(next.id > other.id);
    reopened.close().unwrap();
}

proptest! {
    #[test]
    fn ids_stay_unique_across_creates_and_deletes(ops in prop::collection::vec(any::<bool>(), 1..40)) {
        let mut store = BookStore::open_in_memory().unwrap();
        let mut issued = BTreeSet::new();
        let mut live = Vec::new();

        for (n, create) in ops.into_iter().enumerate() {
            if create || live.is_empty() {
                let book = store.create(BookFields::new(format!("Book {n}"), "Someone")).unwrap();
                prop_assert!(issued.insert(book.id), "id {} was handed out twice", book.id);
                live.push(book.id);
            } else {
                let id = live.remove(0);
                store.delete(id).unwrap();
            }
        }

        let stored: Vec<BookId> = store.list_all().unwrap().into_iter().map(|b| b.id).collect();
        prop_assert_eq!(stored, live);
    }
}
