use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row as TableRow, Table,
    TableState, Wrap,
};
use ratatui::Frame;

use crate::controller::{
    AddRequest, Controller, DeleteRequest, EditRequest, FormOutcome, Notification, Notifier,
    Severity,
};
use crate::filter::MatchState;

use super::forms::{PathPrompt, RowForm};
use super::helpers::{centered_rect, severity_style, truncate_cell};
use super::screens::{column_widths, BrowserView, Focus};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Header space for the database/table summary line.
const HEADER_HEIGHT: u16 = 3;
/// Width of the table list on the left.
const TABLE_PANE_WIDTH: u16 = 26;
/// Rows skipped by PageUp/PageDown.
const PAGE: isize = 10;

/// Modal states layered over the browser view.
enum Mode {
    Normal,
    OpeningFile(PathPrompt),
    Searching,
    AddingRow { request: AddRequest, form: RowForm },
    EditingRow { request: EditRequest, form: RowForm },
    ConfirmDelete(DeleteRequest),
}

/// Footer notifications from the most recent action.
#[derive(Default)]
struct StatusLine {
    messages: Vec<Notification>,
    stale: bool,
}

impl StatusLine {
    /// Keep showing the current messages until the next notification arrives.
    fn start_batch(&mut self) {
        self.stale = true;
    }

    fn info(&mut self, text: &str) {
        self.notify(Notification::new("Info", text, Severity::Info));
    }

    fn latest_message(&self) -> Option<String> {
        self.messages.last().map(|note| note.message.clone())
    }
}

impl Notifier for StatusLine {
    fn notify(&mut self, notification: Notification) {
        if self.stale {
            self.messages.clear();
            self.stale = false;
        }
        self.messages.push(notification);
    }
}

/// Central application state shared across the TUI.
pub struct App {
    controller: Controller,
    view: BrowserView,
    mode: Mode,
    status: StatusLine,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        let mut status = StatusLine::default();
        status.info("Press 'o' to open a SQLite database.");
        Self {
            controller: Controller::new(),
            view: BrowserView::default(),
            mode: Mode::Normal,
            status,
        }
    }

    /// Route one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        self.status.start_batch();
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::OpeningFile(prompt) => self.handle_open_file(code, prompt),
            Mode::Searching => self.handle_search(code),
            Mode::AddingRow { request, form } => self.handle_add_row(code, request, form),
            Mode::EditingRow { request, form } => self.handle_edit_row(code, request, form),
            Mode::ConfirmDelete(request) => self.handle_confirm_delete(code, request),
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
            }
            KeyCode::Char('o') | KeyCode::Char('O') => {
                let initial = self
                    .controller
                    .database_path()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default();
                return Mode::OpeningFile(PathPrompt::with_path(&initial));
            }
            KeyCode::Tab | KeyCode::BackTab => self.view.toggle_focus(),
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-PAGE),
            KeyCode::PageDown => self.move_selection(PAGE),
            KeyCode::Home => self.view.select_first(self.focused_len()),
            KeyCode::End => self.view.select_last(self.focused_len()),
            KeyCode::Enter => {
                if self.view.focus == Focus::Tables {
                    self.select_table_at_cursor();
                }
            }
            KeyCode::Char('f') | KeyCode::Char('/') => {
                if self.controller.active_table().is_some() {
                    self.view.focus = Focus::Rows;
                    return Mode::Searching;
                }
                self.status.info("Choose a table before searching.");
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                if self.controller.refresh(&mut self.status) {
                    self.view.clamp_rows(self.controller.rows().len());
                }
            }
            KeyCode::Char('+') => {
                if let Some(request) = self.controller.begin_add(&mut self.status) {
                    let form = RowForm::from_request(&request.form);
                    return Mode::AddingRow { request, form };
                }
            }
            KeyCode::Char('e') | KeyCode::Char('E') => {
                if let Some(request) = self
                    .controller
                    .begin_edit(self.view.row_cursor, &mut self.status)
                {
                    let form = RowForm::from_request(&request.form);
                    return Mode::EditingRow { request, form };
                }
            }
            KeyCode::Char('-') => {
                if let Some(request) = self
                    .controller
                    .begin_delete(self.view.row_cursor, &mut self.status)
                {
                    return Mode::ConfirmDelete(request);
                }
            }
            _ => {}
        }
        Mode::Normal
    }

    fn handle_open_file(&mut self, code: KeyCode, mut prompt: PathPrompt) -> Mode {
        match code {
            KeyCode::Esc => {
                self.status.info("Open cancelled.");
                return Mode::Normal;
            }
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Enter => {
                let Some(path) = prompt.path() else {
                    self.status.info("Open cancelled.");
                    return Mode::Normal;
                };
                if self.controller.open_database(&path, &mut self.status) {
                    self.view.reset(
                        self.controller.tables().len(),
                        self.controller.rows().len(),
                    );
                    return Mode::Normal;
                }
                prompt.error = self.status.latest_message();
            }
            KeyCode::Char(ch) => {
                if prompt.push_char(ch) {
                    prompt.error = None;
                }
            }
            _ => {}
        }
        Mode::OpeningFile(prompt)
    }

    fn handle_search(&mut self, code: KeyCode) -> Mode {
        let mut term = self.controller.search_term().to_string();
        match code {
            KeyCode::Esc => {
                self.controller.set_search("");
                return Mode::Normal;
            }
            KeyCode::Enter => return Mode::Normal,
            KeyCode::Up => {
                self.move_selection(-1);
                return Mode::Searching;
            }
            KeyCode::Down => {
                self.move_selection(1);
                return Mode::Searching;
            }
            KeyCode::PageUp => {
                self.move_selection(-PAGE);
                return Mode::Searching;
            }
            KeyCode::PageDown => {
                self.move_selection(PAGE);
                return Mode::Searching;
            }
            KeyCode::Backspace => {
                term.pop();
            }
            KeyCode::Char(ch) if !ch.is_control() => term.push(ch),
            _ => return Mode::Searching,
        }

        let classification = self.controller.set_search(&term);
        if !term.is_empty() {
            if let Some(first) = classification.next_match(0) {
                self.view.row_cursor = Some(first);
            }
        }
        Mode::Searching
    }

    fn handle_add_row(&mut self, code: KeyCode, request: AddRequest, mut form: RowForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.controller
                    .finish_add(request, FormOutcome::Cancelled, &mut self.status);
                self.status.info("Add cancelled.");
                return Mode::Normal;
            }
            KeyCode::Enter => {
                let outcome = FormOutcome::Submitted(form.field_values());
                if self
                    .controller
                    .finish_add(request.clone(), outcome, &mut self.status)
                {
                    self.view.clamp_rows(self.controller.rows().len());
                    return Mode::Normal;
                }
                form.error = self.status.latest_message();
            }
            other => edit_form(&mut form, other),
        }
        Mode::AddingRow { request, form }
    }

    fn handle_edit_row(&mut self, code: KeyCode, request: EditRequest, mut form: RowForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.controller
                    .finish_edit(request, FormOutcome::Cancelled, &mut self.status);
                self.status.info("Edit cancelled.");
                return Mode::Normal;
            }
            KeyCode::Enter => {
                let outcome = FormOutcome::Submitted(form.field_values());
                if self
                    .controller
                    .finish_edit(request.clone(), outcome, &mut self.status)
                {
                    self.view.clamp_rows(self.controller.rows().len());
                    return Mode::Normal;
                }
                form.error = self.status.latest_message();
            }
            other => edit_form(&mut form, other),
        }
        Mode::EditingRow { request, form }
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, request: DeleteRequest) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.controller.finish_delete(request, false, &mut self.status);
                self.status.info("Deletion cancelled.");
                Mode::Normal
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.controller.finish_delete(request, true, &mut self.status);
                self.view.clamp_rows(self.controller.rows().len());
                Mode::Normal
            }
            _ => Mode::ConfirmDelete(request),
        }
    }

    fn select_table_at_cursor(&mut self) {
        let Some(name) = self.controller.tables().get(self.view.table_cursor).cloned() else {
            return;
        };
        if self.controller.select_table(&name, &mut self.status) {
            self.view.row_cursor = None;
            self.view.clamp_rows(self.controller.rows().len());
            self.view.focus = Focus::Rows;
        }
    }

    fn move_selection(&mut self, offset: isize) {
        let len = self.focused_len();
        self.view.move_selection(offset, len);
    }

    fn focused_len(&self) -> usize {
        match self.view.focus {
            Focus::Tables => self.controller.tables().len(),
            Focus::Rows => self.controller.rows().len(),
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT.min(area.height)),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT.min(area.height)),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);

        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(TABLE_PANE_WIDTH), Constraint::Min(0)])
            .split(chunks[1]);
        self.draw_table_list(frame, panes[0]);
        self.draw_grid(frame, panes[1]);

        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::OpeningFile(prompt) => self.draw_open_prompt(frame, area, prompt),
            Mode::Searching => self.draw_search_bar(frame, chunks[0]),
            Mode::AddingRow { form, .. } | Mode::EditingRow { form, .. } => {
                self.draw_row_form(frame, area, form)
            }
            Mode::ConfirmDelete(request) => self.draw_confirm_delete(frame, area, request),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let database = self
            .controller
            .database_path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "no database".to_string());

        let mut spans = vec![
            Span::styled("Database: ", Style::default().fg(Color::Cyan)),
            Span::raw(database),
        ];
        if let Some(table) = self.controller.active_table() {
            let rows = self.controller.rows();
            let count = if rows.truncated {
                format!("first {} rows", rows.len())
            } else {
                format!("{} rows", rows.len())
            };
            spans.push(Span::styled("   Table: ", Style::default().fg(Color::Cyan)));
            spans.push(Span::raw(format!("{table} ({count})")));
        }
        let term = self.controller.search_term();
        if !term.is_empty() {
            spans.push(Span::styled("   Search: ", Style::default().fg(Color::Cyan)));
            spans.push(Span::raw(format!(
                "\"{term}\" ({} matches)",
                self.controller.classification().match_count()
            )));
        }

        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("SQLite Browser"));
        frame.render_widget(paragraph, area);
    }

    fn draw_table_list(&self, frame: &mut Frame, area: Rect) {
        let active = self.controller.active_table();
        let items: Vec<ListItem> = self
            .controller
            .tables()
            .iter()
            .map(|name| {
                let style = if Some(name.as_str()) == active {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(Span::styled(name.clone(), style))
            })
            .collect();

        let border_style = if self.view.focus == Focus::Tables {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Tables")
                    .border_style(border_style),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let selected = (!self.controller.tables().is_empty()).then_some(self.view.table_cursor);
        let mut state = ListState::default().with_selected(selected);
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_grid(&self, frame: &mut Frame, area: Rect) {
        let border_style = if self.view.focus == Focus::Rows {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Rows")
            .border_style(border_style);

        let columns = self.controller.columns();
        let rows = self.controller.rows();
        if columns.is_empty() || rows.is_empty() {
            let message = if self.controller.active_table().is_none() {
                "No table selected."
            } else {
                "This table has no rows. Press '+' to add one."
            };
            let paragraph = Paragraph::new(message)
                .block(block)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }

        let widths = column_widths(columns, rows);
        let header = TableRow::new(
            columns
                .iter()
                .map(|column| Cell::from(column.name.clone()))
                .collect::<Vec<_>>(),
        )
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

        let searching = !self.controller.search_term().is_empty();
        let classification = self.controller.classification();
        let body = rows.rows.iter().enumerate().map(|(index, row)| {
            let cells = row
                .values
                .iter()
                .zip(&widths)
                .map(|(value, width)| {
                    let text = value.to_string().replace(['\n', '\r'], " ");
                    let cell = Cell::from(truncate_cell(&text, usize::from(*width)));
                    if value.is_null() {
                        cell.style(Style::default().add_modifier(Modifier::ITALIC))
                    } else {
                        cell
                    }
                })
                .collect::<Vec<_>>();
            let style = match (searching, classification.get(index)) {
                (true, Some(MatchState::Match)) => Style::default()
                    .fg(Color::Black)
                    .bg(Color::LightYellow),
                (true, _) => Style::default().fg(Color::DarkGray),
                (false, _) => Style::default(),
            };
            TableRow::new(cells).style(style)
        });

        let table = Table::new(body, widths.iter().map(|width| Constraint::Length(*width)))
            .header(header)
            .block(block)
            .column_spacing(2)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = TableState::default().with_selected(self.view.row_cursor);
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let spans = self
            .status
            .messages
            .iter()
            .enumerate()
            .flat_map(|(index, note)| {
                let separator = (index > 0).then(|| Span::raw("  ·  "));
                separator.into_iter().chain([Span::styled(
                    note.message.clone(),
                    severity_style(note.severity),
                )])
            })
            .collect::<Vec<_>>();

        let paragraph = Paragraph::new(vec![Line::from(spans), self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        match &self.mode {
            Mode::Searching => Line::from(vec![
                Span::styled("[type]", key_style),
                Span::raw(" Filter   "),
                Span::styled("[↑↓]", key_style),
                Span::raw(" Move   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Keep   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Clear"),
            ]),
            Mode::AddingRow { .. } | Mode::EditingRow { .. } => Line::from(vec![
                Span::styled("[Tab/↑↓]", key_style),
                Span::raw(" Field   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Save   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            Mode::OpeningFile(_) | Mode::ConfirmDelete(_) => Line::from(""),
            Mode::Normal => Line::from(vec![
                Span::styled("[o]", key_style),
                Span::raw(" Open   "),
                Span::styled("[Tab]", key_style),
                Span::raw(" Pane   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Select Table   "),
                Span::styled("[f]", key_style),
                Span::raw(" Search   "),
                Span::styled("[+]", key_style),
                Span::raw(" Add   "),
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[r]", key_style),
                Span::raw(" Refresh   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
        }
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Clear, area);
        let term = self.controller.search_term();
        let block = Block::default().borders(Borders::ALL).title("Search");
        let paragraph = Paragraph::new(Span::raw(format!("Search: {term}")))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);

        let inner = block.inner(area);
        let cursor_x = inner.x + "Search: ".len() as u16 + term.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_open_prompt(&self, frame: &mut Frame, area: Rect, prompt: &PathPrompt) {
        let popup_area = centered_rect(70, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Open Database")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            Line::from(format!("Path: {}", prompt.input)),
            Line::from(""),
        ];
        if let Some(error) = &prompt.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to open • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let cursor_x = inner.x + "Path: ".len() as u16 + prompt.input.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_row_form(&self, frame: &mut Frame, area: Rect, form: &RowForm) {
        let popup_area = centered_rect(80, 70, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(form.title.clone())
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = (0..form.len()).map(|index| form.build_line(index)).collect();
        lines.push(Line::from(""));
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);

        let cursor_x = inner.x + form.cursor_offset() as u16;
        let cursor_y = inner.y + form.active as u16;
        if cursor_y < inner.y + inner.height {
            frame.set_cursor_position((cursor_x, cursor_y));
        }
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, request: &DeleteRequest) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Deletion")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(request.prompt.clone()),
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
}

/// Shared key handling for the add and edit forms.
fn edit_form(form: &mut RowForm, code: KeyCode) {
    match code {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.previous_field(),
        KeyCode::Backspace => {
            form.backspace();
            form.error = None;
        }
        KeyCode::Char(ch) => {
            if form.push_char(ch) {
                form.error = None;
            }
        }
        _ => {}
    }
}
