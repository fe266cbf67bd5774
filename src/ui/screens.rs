use crate::filter::{filter_books, FilterCriteria};
use crate::models::{Book, BookId};

/// Catalog listing plus the currently applied filter. `books` is the full
/// snapshot from the store; `filtered_books` is what the table shows.
pub(crate) struct BookListScreen {
    pub(crate) books: Vec<Book>,
    pub(crate) filtered_books: Vec<Book>,
    pub(crate) filter: Option<FilterCriteria>,
    pub(crate) selected: usize,
}

impl BookListScreen {
    pub(crate) fn new(books: Vec<Book>) -> Self {
        let mut screen = Self {
            filtered_books: Vec::new(),
            books,
            filter: None,
            selected: 0,
        };
        screen.apply_filter();
        screen
    }

    pub(crate) fn apply_filter(&mut self) {
        self.filtered_books = match &self.filter {
            Some(criteria) => filter_books(&self.books, criteria),
            None => self.books.clone(),
        };
        self.ensure_in_bounds();
    }

    pub(crate) fn set_filter(&mut self, filter: Option<FilterCriteria>) {
        self.filter = filter.filter(|criteria| !criteria.is_identity());
        self.apply_filter();
    }

    pub(crate) fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    /// Replace the snapshot after a mutation, keeping the filter and moving
    /// the cursor onto `focus_id` when it is still visible.
    pub(crate) fn set_books(&mut self, books: Vec<Book>, focus_id: Option<BookId>) {
        self.books = books;
        self.apply_filter();
        if let Some(id) = focus_id {
            if let Some(idx) = self.filtered_books.iter().position(|book| book.id == id) {
                self.selected = idx;
            }
        }
    }

    pub(crate) fn current_book(&self) -> Option<&Book> {
        self.filtered_books.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.filtered_books.is_empty() {
            return;
        }
        let last = self.filtered_books.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.filtered_books.len().saturating_sub(1);
    }

    fn ensure_in_bounds(&mut self) {
        if self.filtered_books.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.filtered_books.len() {
            self.selected = self.filtered_books.len() - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookFields, Field};

    fn book(id: i64, title: &str) -> Book {
        Book::from_fields(BookId(id), BookFields::new(title, "Someone"))
    }

    #[test]
    fn filter_keeps_selection_in_bounds() {
        let mut screen = BookListScreen::new(vec![book(1, "Emma"), book(2, "Dune"), book(3, "Ulysses")]);
        screen.select_last();
        assert_eq!(screen.selected, 2);

        screen.set_filter(Some(FilterCriteria::new(Field::Title, "dune")));
        assert_eq!(screen.filtered_books.len(), 1);
        assert_eq!(screen.selected, 0);

        screen.set_filter(Some(FilterCriteria::new(Field::Title, "  ")));
        assert!(!screen.is_filtered());
        assert_eq!(screen.filtered_books.len(), 3);
    }

    #[test]
    fn set_books_follows_the_focused_record() {
        let mut screen = BookListScreen::new(vec![book(1, "Emma")]);
        screen.set_books(vec![book(1, "Emma"), book(2, "Dune")], Some(BookId(2)));
        assert_eq!(screen.current_book().map(|b| b.id), Some(BookId(2)));
        screen.move_selection(-5);
        assert_eq!(screen.selected, 0);
    }
}
