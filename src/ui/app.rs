use std::mem;
use std::path::PathBuf;

use anyhow::{Context, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;
use tracing::error;

use crate::db::BookStore;
use crate::error::BookError;
use crate::export::{export_to_path, ExportOptions};
use crate::filter::FilterCriteria;
use crate::models::{BookId, BookPatch, Status};
use crate::stats::{compute, BucketRule, MonthSummary, StatSnapshot, YearSummary};

use super::forms::{BookField, BookForm, ConfirmBookDelete, ExportForm, ExportScope, FilterState};
use super::helpers::{centered_rect, format_decimal, surface_error, truncate_text};
use super::screens::BookListScreen;

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows skipped by PageUp/PageDown in the book table.
const PAGE_STEP: isize = 10;
/// Width share of the stats panel next to the book table.
const STATS_PANEL_PERCENT: u16 = 35;
/// File name suggested by the export dialog.
const DEFAULT_EXPORT_NAME: &str = "books.csv";

/// High-level navigation states.
enum Screen {
    Books,
    Stats,
}

/// Fine-grained modes scoped to the current screen.
enum Mode {
    Normal,
    AddingBook(BookForm),
    EditingBook { id: BookId, form: BookForm },
    ConfirmDelete(ConfirmBookDelete),
    Filtering(FilterState),
    Exporting(ExportForm),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI. The store is owned here
/// for the whole session; listings and stats are refreshed from it after
/// every mutation.
pub struct App {
    store: BookStore,
    bucket_rule: BucketRule,
    export_dir: PathBuf,
    books: BookListScreen,
    stats: StatSnapshot,
    yearly_rows: Vec<YearSummary>,
    monthly_rows: Vec<MonthSummary>,
    authors: Vec<String>,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
    last_filter: FilterState,
}

impl App {
    pub fn new(store: BookStore, bucket_rule: BucketRule, export_dir: PathBuf) -> Result<Self> {
        let books = store.list_all().context("failed to load books")?;
        let stats = compute(&store, bucket_rule).context("failed to compute stats")?;
        let authors = store.authors().context("failed to load authors")?;

        Ok(Self {
            store,
            bucket_rule,
            export_dir,
            books: BookListScreen::new(books),
            yearly_rows: stats.yearly_report(),
            monthly_rows: stats.monthly_report(),
            stats,
            authors,
            screen: Screen::Books,
            mode: Mode::Normal,
            status: None,
            last_filter: FilterState::default(),
        })
    }

    /// Close the store, flushing anything still pending to disk.
    pub fn close(self) -> Result<()> {
        self.store
            .close()
            .context("failed to close the book database")
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingBook(form) => self.handle_book_form(code, None, form)?,
            Mode::EditingBook { id, form } => self.handle_book_form(code, Some(id), form)?,
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm)?,
            Mode::Filtering(state) => self.handle_filter(code, state),
            Mode::Exporting(form) => self.handle_export(code, form),
        };

        self.mode = mode;
        Ok(exit)
    }

    /// Ctrl+U empties whichever input currently has focus.
    pub(crate) fn handle_ctrl_u(&mut self) {
        match &mut self.mode {
            Mode::AddingBook(form) | Mode::EditingBook { form, .. } => form.clear_active(),
            Mode::Filtering(state) => {
                state.query.clear();
                self.books.set_filter(None);
            }
            Mode::Exporting(form) => form.path.clear(),
            Mode::Normal | Mode::ConfirmDelete(_) => {}
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match self.screen {
            Screen::Books => match code {
                KeyCode::Char('q') => *exit = true,
                KeyCode::Esc => {
                    if self.books.is_filtered() {
                        self.books.set_filter(None);
                        self.set_status("Filter cleared.", StatusKind::Info);
                    } else {
                        *exit = true;
                    }
                }
                KeyCode::Up => self.books.move_selection(-1),
                KeyCode::Down => self.books.move_selection(1),
                KeyCode::PageUp => self.books.move_selection(-PAGE_STEP),
                KeyCode::PageDown => self.books.move_selection(PAGE_STEP),
                KeyCode::Home => self.books.select_first(),
                KeyCode::End => self.books.select_last(),
                KeyCode::Char('a') | KeyCode::Char('+') => {
                    self.clear_status();
                    let mut form = BookForm::default();
                    form.focus(BookField::Title);
                    return Ok(Mode::AddingBook(form));
                }
                KeyCode::Char('e') | KeyCode::Enter => {
                    if let Some(book) = self.books.current_book() {
                        let mode = Mode::EditingBook {
                            id: book.id,
                            form: BookForm::from_book(book),
                        };
                        self.clear_status();
                        return Ok(mode);
                    }
                    self.set_status("No book selected to edit.", StatusKind::Error);
                }
                KeyCode::Char('d') | KeyCode::Char('-') | KeyCode::Delete => {
                    if let Some(book) = self.books.current_book() {
                        let confirm = ConfirmBookDelete::from(book);
                        self.clear_status();
                        return Ok(Mode::ConfirmDelete(confirm));
                    }
                    self.set_status("No book selected to delete.", StatusKind::Error);
                }
                KeyCode::Char('/') | KeyCode::Char('f') => {
                    self.clear_status();
                    let state = match &self.books.filter {
                        Some(criteria) => FilterState {
                            field: criteria.field,
                            query: criteria.term.clone(),
                        },
                        None => FilterState {
                            query: String::new(),
                            ..self.last_filter.clone()
                        },
                    };
                    return Ok(Mode::Filtering(state));
                }
                KeyCode::Char('x') => {
                    self.clear_status();
                    let path = self.export_dir.join(DEFAULT_EXPORT_NAME);
                    return Ok(Mode::Exporting(ExportForm::new(
                        path.display().to_string(),
                        self.books.is_filtered(),
                    )));
                }
                KeyCode::Char('s') | KeyCode::Tab => {
                    self.clear_status();
                    self.screen = Screen::Stats;
                }
                KeyCode::Char('r') => {
                    self.reload(None)?;
                    self.set_status("Reloaded catalog.", StatusKind::Info);
                }
                _ => {}
            },
            Screen::Stats => match code {
                KeyCode::Char('q') => *exit = true,
                KeyCode::Esc | KeyCode::Char('s') | KeyCode::Tab | KeyCode::Backspace => {
                    self.screen = Screen::Books;
                }
                _ => {}
            },
        }
        Ok(Mode::Normal)
    }

    /// Shared key handling for the add and edit forms. `target` is the id being
    /// edited, or `None` when creating.
    fn handle_book_form(
        &mut self,
        code: KeyCode,
        target: Option<BookId>,
        mut form: BookForm,
    ) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                if !form.cancel_autocomplete() {
                    let message = if target.is_some() {
                        "Edit cancelled."
                    } else {
                        "Add book cancelled."
                    };
                    self.set_status(message, StatusKind::Info);
                    keep_open = false;
                }
            }
            KeyCode::Tab => {
                if !form.accept_suggestion() {
                    form.next_field();
                }
            }
            KeyCode::Right | KeyCode::Left if form.active == BookField::Status => {
                form.cycle_status();
                form.error = None;
            }
            KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_book(target, &form) {
                Ok(_) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    match err.downcast_ref::<BookError>() {
                        Some(book_err) => {
                            if !book_err.is_user_error() {
                                error!(error = %book_err, "failed to save book");
                            }
                            form.show_error(book_err, message.clone());
                        }
                        None => form.error = Some(message.clone()),
                    }
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if !keep_open {
            return Ok(Mode::Normal);
        }
        form.update_suggestion(&self.authors);
        Ok(match target {
            Some(id) => Mode::EditingBook { id, form },
            None => Mode::AddingBook(form),
        })
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmBookDelete) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&confirm) {
                    Ok(_) => Ok(Mode::Normal),
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    /// The filter applies live while typing; Enter keeps it, Esc drops it.
    fn handle_filter(&mut self, code: KeyCode, mut state: FilterState) -> Mode {
        match code {
            KeyCode::Esc => {
                self.books.set_filter(None);
                self.last_filter = state;
                return Mode::Normal;
            }
            KeyCode::Enter => {
                self.set_status(
                    format!(
                        "Showing {} of {} books.",
                        self.books.filtered_books.len(),
                        self.books.books.len()
                    ),
                    StatusKind::Info,
                );
                self.last_filter = state;
                return Mode::Normal;
            }
            KeyCode::Up => self.books.move_selection(-1),
            KeyCode::Down => self.books.move_selection(1),
            KeyCode::Tab => state.next_field(),
            KeyCode::BackTab => state.previous_field(),
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) => state.query.push(ch),
            _ => return Mode::Filtering(state),
        }

        self.books.set_filter(Some(FilterCriteria::new(
            state.field,
            state.query.clone(),
        )));
        Mode::Filtering(state)
    }

    fn handle_export(&mut self, code: KeyCode, mut form: ExportForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Export cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_scope(),
            KeyCode::Backspace => {
                form.path.pop();
            }
            KeyCode::Enter => match self.perform_export(&form) {
                Ok(_) => return Mode::Normal,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) if !ch.is_control() => {
                form.path.push(ch);
                form.error = None;
            }
            _ => {}
        }
        Mode::Exporting(form)
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match self.screen {
            Screen::Books => self.draw_books_screen(frame, content_area),
            Screen::Stats => self.draw_stats_screen(frame, content_area),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::AddingBook(form) => self.draw_book_form(frame, area, "Add Book", form),
            Mode::EditingBook { form, .. } => self.draw_book_form(frame, area, "Edit Book", form),
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::Filtering(state) => self.draw_filter_bar(frame, area, state),
            Mode::Exporting(form) => self.draw_export_form(frame, area, form),
            Mode::Normal => {}
        }
    }

    fn draw_books_screen(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(100 - STATS_PANEL_PERCENT),
                Constraint::Percentage(STATS_PANEL_PERCENT),
            ])
            .split(area);

        self.draw_book_table(frame, chunks[0]);
        self.draw_stats_summary(frame, chunks[1]);
    }

    fn draw_book_table(&self, frame: &mut Frame, area: Rect) {
        let list = &self.books;
        let title = match &list.filter {
            Some(criteria) => format!(
                "Books ({} of {}) | {} contains '{}'",
                list.filtered_books.len(),
                list.books.len(),
                criteria.field.label(),
                criteria.term
            ),
            None => format!("Books ({})", list.books.len()),
        };
        let block = Block::default().title(title).borders(Borders::ALL);

        if list.filtered_books.is_empty() {
            let message = if list.books.is_empty() {
                "No books yet. Press 'a' to add one."
            } else {
                "No books match the filter. Press Esc to clear it."
            };
            let paragraph = Paragraph::new(Span::styled(message, Style::default().fg(Color::Gray)))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let header_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let header = Row::new(
            ["Id", "Title", "Author", "Status", "Started", "Finished", "DTR", "Rating"]
                .into_iter()
                .map(|label| Cell::from(label).style(header_style)),
        );

        let rows = list.filtered_books.iter().map(|book| {
            let days = book
                .days_to_read()
                .map(|d| d.to_string())
                .unwrap_or_default();
            let rating = book
                .rating
                .map(|r| "*".repeat(r as usize))
                .unwrap_or_default();
            Row::new(vec![
                Cell::from(book.id.to_string()),
                Cell::from(book.title.clone()),
                Cell::from(book.author.clone()),
                Cell::from(book.status.as_str()).style(status_style(book.status)),
                Cell::from(date_text(book.start_date)),
                Cell::from(date_text(book.end_date)),
                Cell::from(days),
                Cell::from(rating),
            ])
        });

        let widths = [
            Constraint::Length(5),
            Constraint::Fill(3),
            Constraint::Fill(2),
            Constraint::Length(11),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(4),
            Constraint::Length(6),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = TableState::default().with_selected(Some(list.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_stats_summary(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(8), Constraint::Min(0)])
            .split(area);

        let stats = &self.stats;
        let label_style = Style::default().fg(Color::Gray);
        let busiest_year = stats
            .max_year
            .map(|(year, count)| format!("{year} ({count})"))
            .unwrap_or_else(|| "-".to_string());
        let busiest_month = stats
            .max_year_month
            .map(|(period, count)| format!("{period} ({count})"))
            .unwrap_or_else(|| "-".to_string());
        let days = stats
            .days_to_read
            .map(|d| format!("min {} / max {} / mean {:.1}", d.min, d.max, d.mean))
            .unwrap_or_else(|| "-".to_string());

        let lines = vec![
            Line::from(vec![
                Span::styled("Total: ", label_style),
                Span::raw(stats.total.to_string()),
            ]),
            Line::from(vec![
                Span::styled("TBR / Reading / Done: ", label_style),
                Span::raw(format!(
                    "{} / {} / {}",
                    stats.count_for_status(Status::Tbr),
                    stats.count_for_status(Status::InProgress),
                    stats.count_for_status(Status::Completed)
                )),
            ]),
            Line::from(vec![
                Span::styled("Busiest year: ", label_style),
                Span::raw(busiest_year),
            ]),
            Line::from(vec![
                Span::styled("Busiest month: ", label_style),
                Span::raw(busiest_month),
            ]),
            Line::from(vec![
                Span::styled("Days to read: ", label_style),
                Span::raw(days),
            ]),
        ];

        let summary = Paragraph::new(lines)
            .block(Block::default().title("Stats").borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        frame.render_widget(summary, chunks[0]);

        self.draw_yearly_table(frame, chunks[1]);
    }

    fn draw_yearly_table(&self, frame: &mut Frame, area: Rect) {
        let header = stats_header(&["Year", "Count", "/Month", "/Week", "Avg DTR"]);
        let rows = self.yearly_rows.iter().map(|row| {
            Row::new(vec![
                Cell::from(row.year.to_string()),
                Cell::from(row.count.to_string()),
                Cell::from(format_decimal(Some(row.per_month))),
                Cell::from(format_decimal(Some(row.per_week))),
                Cell::from(format_decimal(row.avg_days_to_read)),
            ])
        });
        let table = Table::new(rows, [Constraint::Fill(1); 5])
            .header(header)
            .block(Block::default().title("Yearly").borders(Borders::ALL));
        frame.render_widget(table, area);
    }

    fn draw_stats_screen(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Percentage(35),
                Constraint::Percentage(35),
            ])
            .split(area);

        self.draw_yearly_table(frame, chunks[0]);

        let header = stats_header(&["Month", "Count", "/Week", "Avg DTR"]);
        let rows = self.monthly_rows.iter().map(|row| {
            let style = if row.count == 0 {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(row.period.to_string()),
                Cell::from(row.count.to_string()),
                Cell::from(format_decimal(Some(row.per_week))),
                Cell::from(format_decimal(row.avg_days_to_read)),
            ])
            .style(style)
        });
        let monthly = Table::new(rows, [Constraint::Fill(1); 4])
            .header(header)
            .block(Block::default().title("Monthly").borders(Borders::ALL));
        frame.render_widget(monthly, chunks[1]);

        let header = stats_header(&["Author", "Books"]);
        let author_width = chunks[2].width.saturating_sub(12) as usize;
        let rows = self.stats.top_authors.iter().map(|(author, count)| {
            Row::new(vec![
                Cell::from(truncate_text(author, author_width)),
                Cell::from(count.to_string()),
            ])
        });
        let authors = Table::new(rows, [Constraint::Fill(1), Constraint::Length(6)])
            .header(header)
            .block(Block::default().title("Top Authors").borders(Borders::ALL));
        frame.render_widget(authors, chunks[2]);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let hints: &[(&str, &str)] = match (&self.screen, &self.mode) {
            (_, Mode::AddingBook(_)) | (_, Mode::EditingBook { .. }) => &[
                ("[Tab]", " Next/Accept   "),
                ("[Shift+Tab]", " Previous   "),
                ("[Ctrl+U]", " Clear field   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
            (_, Mode::ConfirmDelete(_)) => &[("[Y]", " Delete   "), ("[N/Esc]", " Keep")],
            (_, Mode::Filtering(_)) => &[
                ("[Tab]", " Change field   "),
                ("[Enter]", " Keep filter   "),
                ("[Esc]", " Clear filter"),
            ],
            (_, Mode::Exporting(_)) => &[
                ("[Tab]", " Toggle scope   "),
                ("[Enter]", " Export   "),
                ("[Esc]", " Cancel"),
            ],
            (Screen::Books, Mode::Normal) => &[
                ("[↑↓]", " Navigate   "),
                ("[A]", " Add   "),
                ("[E]", " Edit   "),
                ("[D]", " Delete   "),
                ("[/]", " Filter   "),
                ("[X]", " Export   "),
                ("[S]", " Stats   "),
                ("[Q]", " Quit"),
            ],
            (Screen::Stats, Mode::Normal) => &[("[S/Esc]", " Back to books   "), ("[Q]", " Quit")],
        };

        Line::from(
            hints
                .iter()
                .flat_map(|(key, action)| {
                    [
                        Span::styled(key.to_string(), key_style),
                        Span::raw(action.to_string()),
                    ]
                })
                .collect::<Vec<_>>(),
        )
    }

    fn draw_book_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &BookForm) {
        let popup_area = centered_rect(70, 70, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = BookField::ORDER
            .iter()
            .map(|field| form.build_line(*field))
            .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to accept/switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines);
        frame.render_widget(paragraph, inner);

        let row = BookField::ORDER
            .iter()
            .position(|field| *field == form.active)
            .unwrap_or(0) as u16;
        let prefix = format!("{}: ", form.active.label()).chars().count() as u16;
        let cursor_x = inner.x + prefix + form.value_len(form.active) as u16;
        frame.set_cursor_position((cursor_x, inner.y + row));
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmBookDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Deletion")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete '{}' by {}?", confirm.title, confirm.author)),
            Line::from("This cannot be undone."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_filter_bar(&self, frame: &mut Frame, area: Rect, state: &FilterState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let prompt = state.prompt();
        let block = Block::default().borders(Borders::ALL).title("Filter");
        let paragraph = Paragraph::new(Line::from(vec![
            Span::styled(prompt.clone(), Style::default().fg(Color::Cyan)),
            Span::raw(state.query.clone()),
        ]))
        .block(block.clone());
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x =
            inner.x + prompt.chars().count() as u16 + state.query.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_export_form(&self, frame: &mut Frame, area: Rect, form: &ExportForm) {
        let popup_area = centered_rect(70, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Export").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let count = match form.scope {
            ExportScope::All => self.books.books.len(),
            ExportScope::Filtered => self.books.filtered_books.len(),
        };
        let mut lines = vec![
            Line::from(vec![
                Span::raw("Path: "),
                Span::styled(form.path.clone(), Style::default().fg(Color::Yellow)),
            ]),
            Line::from(format!("Scope: {} ({count})", form.scope_label())),
            Line::from(""),
        ];
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Format follows the extension (.csv or .json)",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);
        let cursor_x = inner.x + "Path: ".len() as u16 + form.path.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn save_book(&mut self, target: Option<BookId>, form: &BookForm) -> Result<()> {
        let fields = form.parse_inputs()?;
        let (book, verb) = match target {
            None => (self.store.create(fields)?, "Added"),
            Some(id) => (self.store.update(id, BookPatch::from(fields))?, "Updated"),
        };
        self.reload(Some(book.id))?;
        self.set_status(
            format!("{verb} '{}'.", book.display_title()),
            StatusKind::Info,
        );
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmBookDelete) -> Result<()> {
        self.store.delete(confirm.id)?;
        self.reload(None)?;
        self.set_status(format!("Deleted '{}'.", confirm.title), StatusKind::Info);
        Ok(())
    }

    fn perform_export(&mut self, form: &ExportForm) -> Result<()> {
        let path = form.parse_path()?;
        let records = match form.scope {
            ExportScope::All => self.store.list_all()?,
            ExportScope::Filtered => self.books.filtered_books.clone(),
        };
        let format = export_to_path(&records, &path, ExportOptions::default())?;
        self.set_status(
            format!(
                "Exported {} books to {} ({}).",
                records.len(),
                path.display(),
                format
            ),
            StatusKind::Info,
        );
        Ok(())
    }

    /// Re-read listing, stats, and authors after a mutation so every view
    /// reflects committed state.
    fn reload(&mut self, focus_id: Option<BookId>) -> Result<()> {
        let books = self.store.list_all()?;
        let stats = compute(&self.store, self.bucket_rule)?;
        self.yearly_rows = stats.yearly_report();
        self.monthly_rows = stats.monthly_report();
        self.stats = stats;
        self.authors = self.store.authors()?;
        self.books.set_books(books, focus_id);
        Ok(())
    }
}

fn stats_header(labels: &[&'static str]) -> Row<'static> {
    let style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    Row::new(labels.iter().map(|label| Cell::from(*label).style(style)))
}

fn status_style(status: Status) -> Style {
    match status {
        Status::Tbr => Style::default().fg(Color::Gray),
        Status::InProgress => Style::default().fg(Color::Yellow),
        Status::Completed => Style::default().fg(Color::Green),
    }
}

fn date_text(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::BookFields;

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    #[test]
    fn report_rows_refresh_after_adding_a_book() {
        let mut store = BookStore::open_in_memory().unwrap();
        store
            .create(BookFields {
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                end_date: NaiveDate::from_ymd_opt(2024, 1, 11),
                ..BookFields::new("War and Peace", "Tolstoy, Leo")
            })
            .unwrap();
        let mut app = App::new(store, BucketRule::default(), PathBuf::from(".")).unwrap();
        assert_eq!(app.yearly_rows.len(), 1);
        assert_eq!(app.monthly_rows.len(), 1);

        app.handle_key(KeyCode::Char('a')).unwrap();
        type_text(&mut app, "Dune");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "Herbert, Frank");
        // Author -> Status -> Genre -> Format -> Pages -> Start -> End.
        for _ in 0..6 {
            app.handle_key(KeyCode::Down).unwrap();
        }
        type_text(&mut app, "2023-05-02");
        app.handle_key(KeyCode::Enter).unwrap();

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.stats.total, 2);
        assert_eq!(app.yearly_rows, app.stats.yearly_report());
        assert_eq!(app.monthly_rows, app.stats.monthly_report());
        let years: Vec<i32> = app.yearly_rows.iter().map(|row| row.year).collect();
        assert_eq!(years, vec![2024, 2023]);
        assert_eq!(app.monthly_rows.len(), 9);
    }
}
