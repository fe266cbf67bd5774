//! Error type shared by every engine operation. The variants map one-to-one
//! onto the failure kinds the UI knows how to surface: input problems the user
//! can fix (validation, unknown filter field, bad export input) and storage
//! failures that leave previously committed data untouched.

use thiserror::Error;

use crate::models::{BookId, Field};

/// Failure raised by the book store, filter, statistics, or export layers.
#[derive(Debug, Error)]
pub enum BookError {
    /// A field failed validation on create/update. The field is named so the
    /// form can point at the offending input.
    #[error("{field}: {message}")]
    Validation { field: Field, message: String },

    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("Unknown field '{0}'")]
    InvalidField(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BookError {
    pub(crate) fn validation(field: Field, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// True for the variants caused by bad input rather than the backing store.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Io(_))
    }
}

pub type BookResult<T> = Result<T, BookError>;
