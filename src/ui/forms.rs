use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::Local;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::error::{BookError, BookResult};
use crate::models::{
    parse_date, Book, BookFields, BookId, Field, Status, DATE_FORMAT, MAX_RATING,
};

/// Inputs of the add/edit form, in tab order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum BookField {
    #[default]
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

impl BookField {
    pub(crate) const ORDER: [BookField; 10] = [
        BookField::Title,
        BookField::Author,
        BookField::Status,
        BookField::Genre,
        BookField::Format,
        BookField::Pages,
        BookField::StartDate,
        BookField::EndDate,
        BookField::Rating,
        BookField::Notes,
    ];

    pub(crate) fn label(&self) -> &'static str {
        self.field().label()
    }

    fn placeholder(&self) -> &'static str {
        match self {
            BookField::Title => "<required>",
            BookField::Author => "<required: Lastname, First>",
            BookField::Status => "TBR | IN_PROGRESS | COMPLETED (←/→ cycles)",
            BookField::StartDate | BookField::EndDate => "YYYY-MM-DD (t = today)",
            BookField::Rating => "1-5",
            _ => "<optional>",
        }
    }

    /// The model attribute this input feeds, used to route validation errors
    /// back to the right input.
    pub(crate) fn field(&self) -> Field {
        match self {
            BookField::Title => Field::Title,
            BookField::Author => Field::Author,
            BookField::Status => Field::Status,
            BookField::Genre => Field::Genre,
            BookField::Format => Field::Format,
            BookField::Pages => Field::Pages,
            BookField::StartDate => Field::StartDate,
            BookField::EndDate => Field::EndDate,
            BookField::Rating => Field::Rating,
            BookField::Notes => Field::Notes,
        }
    }

    fn from_field(field: Field) -> Option<Self> {
        Self::ORDER.into_iter().find(|input| input.field() == field)
    }

    fn index(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|input| input == self)
            .unwrap_or(0)
    }

    fn is_date(&self) -> bool {
        matches!(self, BookField::StartDate | BookField::EndDate)
    }
}

/// Form state for book creation/editing, including author autocomplete.
#[derive(Default, Clone)]
pub(crate) struct BookForm {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) status: String,
    pub(crate) genre: String,
    pub(crate) format: String,
    pub(crate) pages: String,
    pub(crate) start_date: String,
    pub(crate) end_date: String,
    pub(crate) rating: String,
    pub(crate) notes: String,
    pub(crate) active: BookField,
    pub(crate) error: Option<String>,
    pub(crate) suggestion: Option<String>,
    pub(crate) autocomplete_disabled: bool,
}

impl BookForm {
    /// Populate the form from an existing book when entering edit mode.
    pub(crate) fn from_book(book: &Book) -> Self {
        let text = |field: Field| field.render(book);
        Self {
            title: text(Field::Title),
            author: text(Field::Author),
            status: text(Field::Status),
            genre: text(Field::Genre),
            format: text(Field::Format),
            pages: text(Field::Pages),
            start_date: text(Field::StartDate),
            end_date: text(Field::EndDate),
            rating: text(Field::Rating),
            notes: text(Field::Notes),
            ..Self::default()
        }
    }

    pub(crate) fn value(&self, field: BookField) -> &str {
        match field {
            BookField::Title => &self.title,
            BookField::Author => &self.author,
            BookField::Status => &self.status,
            BookField::Genre => &self.genre,
            BookField::Format => &self.format,
            BookField::Pages => &self.pages,
            BookField::StartDate => &self.start_date,
            BookField::EndDate => &self.end_date,
            BookField::Rating => &self.rating,
            BookField::Notes => &self.notes,
        }
    }

    fn value_mut(&mut self, field: BookField) -> &mut String {
        match field {
            BookField::Title => &mut self.title,
            BookField::Author => &mut self.author,
            BookField::Status => &mut self.status,
            BookField::Genre => &mut self.genre,
            BookField::Format => &mut self.format,
            BookField::Pages => &mut self.pages,
            BookField::StartDate => &mut self.start_date,
            BookField::EndDate => &mut self.end_date,
            BookField::Rating => &mut self.rating,
            BookField::Notes => &mut self.notes,
        }
    }

    /// Switch focus to a particular field.
    pub(crate) fn focus(&mut self, field: BookField) {
        self.active = field;
        if field != BookField::Author {
            self.suggestion = None;
        }
    }

    pub(crate) fn next_field(&mut self) {
        let next = BookField::ORDER[(self.active.index() + 1) % BookField::ORDER.len()];
        self.focus(next);
    }

    pub(crate) fn previous_field(&mut self) {
        let len = BookField::ORDER.len();
        let previous = BookField::ORDER[(self.active.index() + len - 1) % len];
        self.focus(previous);
    }

    /// Insert a character into the active field. Numeric inputs only take
    /// digits and date inputs digits and dashes; `t` in a date input fills in
    /// today's date.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        let active = self.active;
        match active {
            BookField::Pages | BookField::Rating if !ch.is_ascii_digit() => return false,
            _ if active.is_date() && (ch == 't' || ch == 'T') => {
                self.fill_today(active);
                return true;
            }
            _ if active.is_date() && !(ch.is_ascii_digit() || ch == '-') => return false,
            BookField::Author => self.autocomplete_disabled = false,
            _ => {}
        }
        self.value_mut(active).push(ch);
        true
    }

    /// Step the status input to the next value. Unrecognized text restarts at
    /// the first status.
    pub(crate) fn cycle_status(&mut self) {
        let next = self
            .status
            .parse::<Status>()
            .map(Status::next)
            .unwrap_or_default();
        self.status = next.as_str().to_string();
    }

    fn fill_today(&mut self, field: BookField) {
        *self.value_mut(field) = Local::now().date_naive().format(DATE_FORMAT).to_string();
    }

    /// Remove a character from the active field.
    pub(crate) fn backspace(&mut self) {
        let active = self.active;
        self.value_mut(active).pop();
        if active == BookField::Author {
            self.autocomplete_disabled = false;
        }
    }

    /// Empty the active field.
    pub(crate) fn clear_active(&mut self) {
        let active = self.active;
        self.value_mut(active).clear();
        self.suggestion = None;
    }

    /// Convert the raw inputs into typed fields. Parse failures come back as
    /// validation errors naming the field, the same shape the store uses.
    pub(crate) fn parse_inputs(&self) -> BookResult<BookFields> {
        Ok(BookFields {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            status: self.status.parse()?,
            genre: self.genre.trim().to_string(),
            format: self.format.trim().to_string(),
            pages: parse_number(Field::Pages, &self.pages, "pages must be a positive number.")?,
            start_date: parse_date(Field::StartDate, &self.start_date)?,
            end_date: parse_date(Field::EndDate, &self.end_date)?,
            rating: parse_number(
                Field::Rating,
                &self.rating,
                &format!("rating must be between 1 and {MAX_RATING}."),
            )?,
            notes: Some(self.notes.trim().to_string()),
        })
    }

    /// Record an error on the form and move focus to the input it concerns.
    pub(crate) fn show_error(&mut self, err: &BookError, message: String) {
        if let BookError::Validation { field, .. } = err {
            if let Some(input) = BookField::from_field(*field) {
                self.focus(input);
            }
        }
        self.error = Some(message);
    }

    /// Update the author autocomplete suggestion based on current input.
    pub(crate) fn update_suggestion(&mut self, authors: &[String]) {
        if self.active != BookField::Author
            || self.autocomplete_disabled
            || self.author.chars().count() < 2
        {
            self.suggestion = None;
            return;
        }

        let current_lower = self.author.to_lowercase();
        self.suggestion = authors
            .iter()
            .find(|candidate| candidate.to_lowercase().starts_with(&current_lower))
            .filter(|candidate| candidate.to_lowercase() != current_lower)
            .cloned();
    }

    /// Apply the suggested author, marking autocomplete as satisfied.
    pub(crate) fn accept_suggestion(&mut self) -> bool {
        if self.suggestion_suffix().is_none() {
            return false;
        }
        match self.suggestion.take() {
            Some(candidate) => {
                self.author = candidate;
                self.autocomplete_disabled = true;
                true
            }
            None => false,
        }
    }

    /// Explicitly disable autocomplete for the rest of this interaction.
    pub(crate) fn cancel_autocomplete(&mut self) -> bool {
        if self.has_active_suggestion() {
            self.autocomplete_disabled = true;
            self.suggestion = None;
            return true;
        }
        false
    }

    /// Remaining characters of the suggestion, shown as a ghosted hint.
    pub(crate) fn suggestion_suffix(&self) -> Option<String> {
        let candidate = self.suggestion.as_ref()?;
        let suffix: String = candidate.chars().skip(self.author.chars().count()).collect();
        if suffix.is_empty() {
            None
        } else {
            Some(suffix)
        }
    }

    pub(crate) fn has_active_suggestion(&self) -> bool {
        self.active == BookField::Author && self.suggestion.is_some()
    }

    /// Render a styled line for the modal form, appending the autocomplete
    /// suffix on the author input.
    pub(crate) fn build_line(&self, field: BookField) -> Line<'static> {
        let value = self.value(field);
        let is_active = self.active == field;

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        let mut spans = vec![Span::raw(format!("{}: ", field.label()))];
        if value.is_empty() {
            spans.push(Span::styled(field.placeholder().to_string(), style));
        } else {
            spans.push(Span::styled(value.to_string(), style));
        }
        if field == BookField::Author && is_active {
            if let Some(suffix) = self.suggestion_suffix() {
                spans.push(Span::styled(suffix, Style::default().fg(Color::DarkGray)));
            }
        }

        Line::from(spans)
    }

    /// Character length of the requested field.
    pub(crate) fn value_len(&self, field: BookField) -> usize {
        self.value(field).chars().count()
    }
}

fn parse_number<T: FromStr>(field: Field, raw: &str, message: &str) -> BookResult<Option<T>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| BookError::Validation {
            field,
            message: message.to_string(),
        })
}

/// State for confirming permanent book deletion.
pub(crate) struct ConfirmBookDelete {
    pub(crate) id: BookId,
    pub(crate) title: String,
    pub(crate) author: String,
}

impl ConfirmBookDelete {
    pub(crate) fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
        }
    }
}

/// State for the inline filter bar: which attribute to search and the term.
#[derive(Clone)]
pub(crate) struct FilterState {
    pub(crate) field: Field,
    pub(crate) query: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            field: Field::Title,
            query: String::new(),
        }
    }
}

impl FilterState {
    /// Cycle through the filterable attributes.
    pub(crate) fn next_field(&mut self) {
        let idx = Field::ALL
            .iter()
            .position(|field| *field == self.field)
            .unwrap_or(0);
        self.field = Field::ALL[(idx + 1) % Field::ALL.len()];
    }

    pub(crate) fn previous_field(&mut self) {
        let len = Field::ALL.len();
        let idx = Field::ALL
            .iter()
            .position(|field| *field == self.field)
            .unwrap_or(0);
        self.field = Field::ALL[(idx + len - 1) % len];
    }

    pub(crate) fn prompt(&self) -> String {
        format!("{}: ", self.field.label())
    }
}

/// Which records an export covers.
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) enum ExportScope {
    All,
    Filtered,
}

/// State of the export dialog.
pub(crate) struct ExportForm {
    pub(crate) path: String,
    pub(crate) scope: ExportScope,
    pub(crate) error: Option<String>,
}

impl ExportForm {
    pub(crate) fn new(default_path: String, filtered: bool) -> Self {
        Self {
            path: default_path,
            scope: if filtered {
                ExportScope::Filtered
            } else {
                ExportScope::All
            },
            error: None,
        }
    }

    pub(crate) fn toggle_scope(&mut self) {
        self.scope = match self.scope {
            ExportScope::All => ExportScope::Filtered,
            ExportScope::Filtered => ExportScope::All,
        };
    }

    pub(crate) fn scope_label(&self) -> &'static str {
        match self.scope {
            ExportScope::All => "all books",
            ExportScope::Filtered => "filtered books",
        }
    }

    pub(crate) fn parse_path(&self) -> Result<PathBuf> {
        let trimmed = self.path.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Export path is required."));
        }
        Ok(PathBuf::from(trimmed))
    }
}
