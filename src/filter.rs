//! Field/term filtering over the catalog. Matching is a plain, order-preserving
//! text scan: the field value is rendered as canonical text (ISO dates, decimal
//! numbers) and searched case-insensitively for the term.

use tracing::debug;

use crate::db::BookStore;
use crate::error::BookResult;
use crate::models::{Book, Field};

/// A single field/term pair. Built from user input at the boundary so unknown
/// field names are rejected before any matching happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub field: Field,
    pub term: String,
}

impl FilterCriteria {
    pub fn new(field: Field, term: impl Into<String>) -> Self {
        Self {
            field,
            term: term.into(),
        }
    }

    /// Resolve `field` by name, failing with `InvalidField` when it does not
    /// name a book attribute.
    pub fn parse(field: &str, term: impl Into<String>) -> BookResult<Self> {
        Ok(Self::new(field.parse()?, term))
    }

    /// Blank terms act as the identity filter. Any other term is matched
    /// verbatim, surrounding whitespace included.
    pub fn is_identity(&self) -> bool {
        self.term.trim().is_empty()
    }

    pub fn matches(&self, book: &Book) -> bool {
        if self.is_identity() {
            return true;
        }
        let needle = self.term.to_lowercase();
        self.field.render(book).to_lowercase().contains(&needle)
    }
}

/// Filter the current contents of `store`.
pub fn filter(store: &BookStore, field: &str, term: &str) -> BookResult<Vec<Book>> {
    let criteria = FilterCriteria::parse(field, term)?;
    let books = store.list_all()?;
    Ok(filter_books(&books, &criteria))
}

/// Books from `books` matching `criteria`, in their original order.
pub fn filter_books(books: &[Book], criteria: &FilterCriteria) -> Vec<Book> {
    let matched: Vec<Book> = books
        .iter()
        .filter(|book| criteria.matches(book))
        .cloned()
        .collect();
    debug!(
        field = %criteria.field,
        term = %criteria.term,
        matched = matched.len(),
        total = books.len(),
        "filtered books"
    );
    matched
}

/// Books matching every criterion. An empty slice keeps everything.
pub fn filter_all(books: &[Book], criteria: &[FilterCriteria]) -> Vec<Book> {
    books
        .iter()
        .filter(|book| criteria.iter().all(|c| c.matches(book)))
        .cloned()
        .collect()
}
