//! Category board interface.
//!
//! Three columns, one per category, each listing its tasks in display order
//! under subcategory headers. Cards move through the workflow in place; every
//! change goes through the task store and the columns are rebuilt afterwards.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use mockable::Clock;
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::config::Config;
use crate::db::{format_deadline, format_due_relative, local_today, truncate, TaskStore};
use crate::error::TrackerError;
use crate::fields::*;
use crate::grouping::buckets;
use crate::registry::SubcategoryRegistry;
use crate::report::export_report;
use crate::storage::KeyValueStore;
use crate::task::{Task, TaskId};
use crate::tui::colors::{category_color, text_on, ALERT_RED, DARK_RED};
use crate::tui::input::InputField;
use crate::tui::task_form::{
    TaskForm, CATEGORY_FIELD, DEADLINE_FIELD, DESCRIPTION_FIELD, NAMES_FIELD, SUBCATEGORY_FIELD,
};
use crate::tui::utils::centered_rect;

const CARD_HEIGHT: usize = 5;
const HEADER_HEIGHT: usize = 1;
const FORM_LABEL_WIDTH: usize = 13;

const HELP_TEXT: &str =
    "Help: ←/→ Column | ↑/↓ Card | c: New | e: Edit | a: Advance | b: Back | n: Note | x: Delete | t: Toggle done | Enter: Details | p: Export | Esc: Exit";

/// One card slot in a column.
#[derive(Debug, Clone, PartialEq)]
struct ColumnEntry {
    id: TaskId,
    bucket: String,
    /// First card of its subcategory, drawn under a header.
    opens_bucket: bool,
}

impl ColumnEntry {
    fn height(&self, first_visible: bool) -> usize {
        if self.opens_bucket || first_visible {
            CARD_HEIGHT + HEADER_HEIGHT
        } else {
            CARD_HEIGHT
        }
    }
}

/// What the keyboard is currently driving.
#[derive(Debug, Clone)]
enum Mode {
    Board,
    Detail,
    Note(InputField),
    Form(TaskForm),
    ConfirmDelete(TaskId),
}

/// Main board application state
pub struct BoardApp<S: KeyValueStore, C: Clock> {
    store: TaskStore<S, C>,
    registry: SubcategoryRegistry<S>,
    config: Config,
    export_dir: PathBuf,
    mode: Mode,
    selected_column: usize,
    selected_card: usize,
    column_scroll_offsets: [usize; 3],
    status_message: String,
    show_completed: bool,
    columns: [Vec<ColumnEntry>; 3],
}

impl<S: KeyValueStore, C: Clock> BoardApp<S, C> {
    pub fn new(store: TaskStore<S, C>, registry: SubcategoryRegistry<S>, config: Config) -> Self {
        let export_dir = config.export_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let mut app = BoardApp {
            store,
            registry,
            config,
            export_dir,
            mode: Mode::Board,
            selected_column: 0,
            selected_card: 0,
            column_scroll_offsets: [0; 3],
            status_message: String::new(),
            show_completed: true,
            columns: Default::default(),
        };
        app.update_columns();
        app
    }

    /// Rebuild every column from the store.
    fn update_columns(&mut self) {
        for (i, category) in Category::ALL.iter().enumerate() {
            let mut entries = Vec::new();
            for bucket in buckets(self.store.tasks(), *category) {
                let mut opens_bucket = true;
                for task in bucket.tasks {
                    if task.status.is_completed() && !self.show_completed {
                        continue;
                    }
                    entries.push(ColumnEntry {
                        id: task.id.clone(),
                        bucket: bucket.label.to_string(),
                        opens_bucket,
                    });
                    opens_bucket = false;
                }
            }
            self.columns[i] = entries;
        }
        self.clamp_selection();
    }

    /// Ensure selected column and card indices are valid
    fn clamp_selection(&mut self) {
        if self.selected_column >= self.columns.len() {
            self.selected_column = 0;
        }
        let column_len = self.columns[self.selected_column].len();
        if column_len == 0 {
            self.selected_card = 0;
            self.column_scroll_offsets[self.selected_column] = 0;
        } else if self.selected_card >= column_len {
            self.selected_card = column_len - 1;
        }
    }

    /// Rebuild the columns and keep the cursor on `id` wherever it moved to.
    fn refresh_keeping(&mut self, id: &TaskId) {
        self.update_columns();
        for (col, entries) in self.columns.iter().enumerate() {
            if let Some(pos) = entries.iter().position(|e| &e.id == id) {
                self.selected_column = col;
                self.selected_card = pos;
                return;
            }
        }
        self.clamp_selection();
    }

    fn selected_id(&self) -> Option<&TaskId> {
        self.columns[self.selected_column]
            .get(self.selected_card)
            .map(|e| &e.id)
    }

    fn selected_task(&self) -> Option<&Task> {
        self.selected_id().and_then(|id| self.store.get(id))
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
    }

    fn report_error(&mut self, e: TrackerError) {
        tracing::error!(error = %e, "board action failed");
        self.set_status_message(format!("Error saving: {e}"));
    }

    fn advance_selected(&mut self) {
        let Some(id) = self.selected_id().cloned() else { return };
        match self.store.advance(&id) {
            Ok(Some(status)) => {
                self.refresh_keeping(&id);
                self.set_status_message(format!("Task is now {}", format_status(status)));
            }
            Ok(None) => self.set_status_message("Task is already completed"),
            Err(e) => self.report_error(e),
        }
    }

    fn retreat_selected(&mut self) {
        let Some(id) = self.selected_id().cloned() else { return };
        match self.store.retreat(&id) {
            Ok(Some(status)) => {
                self.refresh_keeping(&id);
                self.set_status_message(format!("Task is now {}", format_status(status)));
            }
            Ok(None) => self.set_status_message("Task has not been started"),
            Err(e) => self.report_error(e),
        }
    }

    fn save_note(&mut self, text: String) {
        let Some(id) = self.selected_id().cloned() else { return };
        match self.store.append_note(&id, &text) {
            Ok(true) => {
                self.refresh_keeping(&id);
                self.set_status_message("Note added");
            }
            Ok(false) => self.set_status_message("Empty note ignored"),
            Err(e) => self.report_error(e),
        }
    }

    /// Save the form. Hands the form back when it has to stay open.
    fn save_form(&mut self, form: TaskForm) -> Option<TaskForm> {
        let draft = match form.to_draft(local_today(self.store.clock())) {
            Ok(draft) => draft,
            Err(msg) => {
                self.set_status_message(msg);
                return Some(form);
            }
        };
        let saved = match &form.editing {
            Some(id) => self.store.update(id, draft).map(|found| found.then(|| id.clone())),
            None => self.store.create(draft).map(|task| Some(task.id)),
        };
        let id = match saved {
            Ok(Some(id)) => id,
            Ok(None) => {
                self.update_columns();
                self.set_status_message("Task no longer exists");
                return None;
            }
            Err(TrackerError::Validation(e)) => {
                self.set_status_message(e.to_string());
                return Some(form);
            }
            Err(e) => {
                self.report_error(e);
                return Some(form);
            }
        };

        self.refresh_keeping(&id);
        let verb = if form.editing.is_some() { "updated" } else { "added" };
        let registered = self
            .store
            .get(&id)
            .and_then(|task| Some((task.category, task.subcategory.clone()?)))
            .map(|(category, sub)| self.registry.register(category, &sub).map(|new| new.then_some(sub)));
        match registered {
            Some(Ok(Some(sub))) => self.set_status_message(format!("Task {verb}, new subcategory '{sub}'")),
            Some(Err(e)) => {
                tracing::error!(error = %e, "subcategory registration failed");
                self.set_status_message(format!("Task {verb}, but subcategories were not saved: {e}"));
            }
            _ => self.set_status_message(format!("Task {verb}")),
        }
        None
    }

    fn delete_task(&mut self, id: &TaskId) {
        match self.store.remove(id) {
            Ok(Some(task)) => {
                self.update_columns();
                self.set_status_message(format!("Deleted '{}'", task.description));
            }
            Ok(None) => self.set_status_message("Task no longer exists"),
            Err(e) => self.report_error(e),
        }
    }

    fn export(&mut self) {
        let now = self.store.clock().local();
        let completed = self.store.completed();
        match export_report(&completed, &self.config.report_title, &self.export_dir, now) {
            Ok(path) => self.set_status_message(format!("Exported {}", path.display())),
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    /// Apply one key press. Returns true when the board should close.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        match std::mem::replace(&mut self.mode, Mode::Board) {
            Mode::Note(mut input) => {
                match key.code {
                    KeyCode::Esc => self.set_status_message("Note cancelled"),
                    KeyCode::Enter => {
                        let text = input.take();
                        self.save_note(text);
                    }
                    KeyCode::Backspace => {
                        input.handle_backspace();
                        self.mode = Mode::Note(input);
                    }
                    KeyCode::Delete => {
                        input.handle_delete();
                        self.mode = Mode::Note(input);
                    }
                    KeyCode::Left => {
                        input.move_cursor_left();
                        self.mode = Mode::Note(input);
                    }
                    KeyCode::Right => {
                        input.move_cursor_right();
                        self.mode = Mode::Note(input);
                    }
                    KeyCode::Home => {
                        input.move_home();
                        self.mode = Mode::Note(input);
                    }
                    KeyCode::End => {
                        input.move_end();
                        self.mode = Mode::Note(input);
                    }
                    KeyCode::Char(c) => {
                        input.handle_char(c);
                        self.mode = Mode::Note(input);
                    }
                    _ => self.mode = Mode::Note(input),
                }
                return false;
            }
            Mode::Form(mut form) => {
                match key.code {
                    KeyCode::Esc => {
                        self.set_status_message("Edit cancelled");
                        return false;
                    }
                    KeyCode::Enter => {
                        if let Some(form) = self.save_form(form) {
                            self.mode = Mode::Form(form);
                        }
                        return false;
                    }
                    KeyCode::Tab => form.next_field(),
                    KeyCode::BackTab => form.prev_field(),
                    KeyCode::Up | KeyCode::Down if form.current_field == SUBCATEGORY_FIELD => {
                        let registered = self.registry.subcategories(form.category);
                        form.cycle_subcategory(registered, key.code == KeyCode::Down);
                    }
                    KeyCode::Up => form.prev_field(),
                    KeyCode::Down => form.next_field(),
                    KeyCode::Left => form.handle_left(),
                    KeyCode::Right => form.handle_right(),
                    KeyCode::Backspace => form.handle_backspace(),
                    KeyCode::Delete => form.handle_delete(),
                    KeyCode::Char(c) => form.handle_char(c),
                    _ => {}
                }
                self.mode = Mode::Form(form);
                return false;
            }
            Mode::ConfirmDelete(id) => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => self.delete_task(&id),
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        self.set_status_message("Delete cancelled")
                    }
                    _ => self.mode = Mode::ConfirmDelete(id),
                }
                return false;
            }
            Mode::Detail => {
                if !matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                    self.mode = Mode::Detail;
                }
                return false;
            }
            Mode::Board => {}
        }

        self.clear_status_message();

        match key.code {
            KeyCode::Esc => return true,

            KeyCode::Enter => {
                if self.selected_task().is_some() {
                    self.mode = Mode::Detail;
                }
            }

            // Column navigation
            KeyCode::Left => {
                if self.selected_column > 0 {
                    self.selected_column -= 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Right => {
                if self.selected_column < self.columns.len() - 1 {
                    self.selected_column += 1;
                    self.clamp_selection();
                }
            }

            // Card navigation within column
            KeyCode::Up => {
                self.selected_card = self.selected_card.saturating_sub(1);
            }
            KeyCode::Down => {
                let column_len = self.columns[self.selected_column].len();
                if column_len > 0 && self.selected_card < column_len - 1 {
                    self.selected_card += 1;
                }
            }

            KeyCode::Char('a') => self.advance_selected(),
            KeyCode::Char('b') => self.retreat_selected(),

            KeyCode::Char('c') => {
                self.mode = Mode::Form(TaskForm::new(Category::ALL[self.selected_column]));
                self.set_status_message("Tab: Next field | Enter: Save | Esc: Cancel");
            }

            KeyCode::Char('e') => {
                if let Some(task) = self.selected_task() {
                    self.mode = Mode::Form(TaskForm::from_task(task));
                    self.set_status_message("Tab: Next field | Enter: Save | Esc: Cancel");
                }
            }

            KeyCode::Char('n') => {
                if self.selected_task().is_some() {
                    self.mode = Mode::Note(InputField::new());
                    self.set_status_message("Note: Enter to save, Esc to cancel");
                }
            }

            KeyCode::Char('x') => {
                if let Some(id) = self.selected_id().cloned() {
                    self.mode = Mode::ConfirmDelete(id);
                }
            }

            KeyCode::Char('t') => {
                self.show_completed = !self.show_completed;
                match self.selected_id().cloned() {
                    Some(id) => self.refresh_keeping(&id),
                    None => self.update_columns(),
                }
                let status = if self.show_completed {
                    "Showing completed tasks"
                } else {
                    "Hiding completed tasks"
                };
                self.set_status_message(status);
            }

            KeyCode::Char('p') => self.export(),

            KeyCode::Char('h') => self.set_status_message(HELP_TEXT),

            _ => {}
        }
        false
    }

    /// Handle keyboard input
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key));
                }
            }
        }
        Ok(false)
    }

    /// Render the board
    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Board
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_board(f, chunks[1]);
        self.render_status_bar(f, chunks[2]);

        match &self.mode {
            Mode::Detail => self.render_task_detail_popup(f),
            Mode::Note(input) => self.render_note_input(f, input),
            Mode::Form(form) => self.render_form(f, form),
            Mode::ConfirmDelete(id) => self.render_confirm(f, id),
            Mode::Board => {}
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let today = self.store.clock().local();
        let header_text = vec![Line::from(vec![
            Span::styled(
                self.config.report_title.to_uppercase(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                today.format("%A, %B %-d, %Y").to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ])];

        let header_block = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header_block, area);
    }

    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let columns_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ])
            .split(area);

        for (i, &column_area) in columns_layout.iter().enumerate() {
            self.render_column(f, column_area, i);
        }
    }

    fn render_column(&mut self, f: &mut Frame, area: Rect, column_index: usize) {
        let category = Category::ALL[column_index];
        let color = category_color(category);
        let is_selected = column_index == self.selected_column;
        let border_style = if is_selected {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let entries = &self.columns[column_index];
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{} ({})", category, entries.len()))
            .border_style(border_style);
        let inner = block.inner(area);
        f.render_widget(block, area);

        if entries.is_empty() {
            f.render_widget(
                Paragraph::new("No tasks yet").style(Style::default().fg(Color::DarkGray)),
                inner,
            );
            return;
        }

        let available_height = inner.height as usize;
        let scroll_offset = if is_selected {
            let offset = scroll_to_show(
                entries,
                self.selected_card,
                self.column_scroll_offsets[column_index],
                available_height,
            );
            self.column_scroll_offsets[column_index] = offset;
            offset
        } else {
            self.column_scroll_offsets[column_index].min(entries.len() - 1)
        };

        let today = local_today(self.store.clock());
        let entries = &self.columns[column_index];
        let mut current_y = 0;
        let mut rendered_cards = 0;

        for (card_index, entry) in entries.iter().enumerate().skip(scroll_offset) {
            let height = entry.height(card_index == scroll_offset);
            if current_y + height > available_height {
                break;
            }
            let Some(task) = self.store.get(&entry.id) else { continue };

            if height > CARD_HEIGHT {
                let header = Paragraph::new(Line::from(Span::styled(
                    format!("▸ {}", entry.bucket),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )));
                f.render_widget(header, Rect {
                    x: inner.x,
                    y: inner.y + current_y as u16,
                    width: inner.width,
                    height: HEADER_HEIGHT as u16,
                });
                current_y += HEADER_HEIGHT;
            }

            let card_area = Rect {
                x: inner.x,
                y: inner.y + current_y as u16,
                width: inner.width,
                height: CARD_HEIGHT as u16,
            };
            let is_this_card_selected = is_selected && card_index == self.selected_card;
            render_card(f, card_area, task, color, is_this_card_selected, today);
            current_y += CARD_HEIGHT;
            rendered_cards += 1;
        }

        let remaining = entries.len() - scroll_offset - rendered_cards;
        if remaining > 0 && inner.height > 0 {
            let indicator = Paragraph::new(format!("▼ +{remaining} below"))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(indicator, Rect {
                x: inner.x,
                y: inner.y + inner.height - 1,
                width: inner.width,
                height: 1,
            });
        }
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            let total_tasks: usize = self.columns.iter().map(|col| col.len()).sum();
            let completed_indicator = if self.show_completed { "" } else { " [done hidden]" };
            let advance = self
                .selected_task()
                .and_then(|t| format_advance_action(t.status))
                .map(|action| format!("a: {action} | "))
                .unwrap_or_default();
            format!(
                "Tasks: {total_tasks}{completed_indicator} | {advance}b: Back | n: Note | x: Delete | p: Export | h: Help"
            )
        };

        let color = category_color(Category::ALL[self.selected_column]);
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(color).fg(text_on(color)))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn render_task_detail_popup(&self, f: &mut Frame) {
        let Some(task) = self.selected_task() else { return };
        let popup_area = centered_rect(80, 80, f.area());
        f.render_widget(Clear, popup_area);

        let today = local_today(self.store.clock());
        let deadline = match task.deadline {
            Some(d) => format!("{} ({})", format_deadline(d), format_due_relative(Some(d), today)),
            None => "-".to_string(),
        };
        let deadline_style = if task.is_overdue(today) {
            Style::default().fg(ALERT_RED).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let mut detail_lines = vec![
            Line::from(vec![Span::styled(
                task.description.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(format!("Assigned to:  {}", task.joined_names())),
            Line::from(format!(
                "Category:     {}{}",
                task.category,
                task.subcategory.as_deref().map(|s| format!(" - {s}")).unwrap_or_default()
            )),
            Line::from(format!("Status:       {}", format_status(task.status))),
            Line::from(vec![Span::raw("Deadline:     "), Span::styled(deadline, deadline_style)]),
            Line::from(format!(
                "Created:      {}",
                task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            )),
            Line::from(format!("ID:           {}", task.id)),
            Line::from(""),
            Line::from("Notes:"),
        ];

        if task.notes.is_empty() {
            detail_lines.push(Line::from("-"));
        }
        for note in &task.notes {
            detail_lines.push(Line::from(vec![
                Span::styled(
                    note.date.with_timezone(&Local).format("[%m/%d %H:%M] ").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(note.text.clone()),
            ]));
        }

        let popup_block = Block::default()
            .borders(Borders::ALL)
            .title("Task Details (Press Enter to close)")
            .title_alignment(Alignment::Center)
            .border_style(
                Style::default()
                    .fg(category_color(task.category))
                    .add_modifier(Modifier::BOLD),
            );

        let popup_paragraph = Paragraph::new(detail_lines)
            .block(popup_block)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup_paragraph, popup_area);
    }

    fn render_note_input(&self, f: &mut Frame, input: &InputField) {
        let Some(task) = self.selected_task() else { return };
        let area = centered_rect(60, 20, f.area());
        f.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Note for: {}", truncate(&task.description, 40)))
            .border_style(Style::default().fg(category_color(task.category)));
        let inner = block.inner(area);
        let paragraph = Paragraph::new(input.value.as_str())
            .block(block)
            .style(Style::default().bg(Color::Black));
        f.render_widget(paragraph, area);

        let cursor_x = inner.x + (input.cursor as u16).min(inner.width.saturating_sub(1));
        f.set_cursor_position((cursor_x, inner.y));
    }

    fn render_form(&self, f: &mut Frame, form: &TaskForm) {
        let area = centered_rect(60, 50, f.area());
        f.render_widget(Clear, area);

        let title = if form.editing.is_some() { "Edit Task" } else { "New Task" };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_alignment(Alignment::Center)
            .border_style(
                Style::default()
                    .fg(category_color(form.category))
                    .add_modifier(Modifier::BOLD),
            );
        let inner = block.inner(area);

        let registered = self.registry.subcategories(form.category);
        let suggestions = if registered.is_empty() {
            "(none registered)".to_string()
        } else {
            registered.join(", ")
        };
        let fields = [
            (DESCRIPTION_FIELD, "Description", form.description.value.clone()),
            (NAMES_FIELD, "Names", form.names.value.clone()),
            (CATEGORY_FIELD, "Category", format!("◂ {} ▸", form.category)),
            (SUBCATEGORY_FIELD, "Subcategory", form.subcategory.value.clone()),
            (DEADLINE_FIELD, "Deadline", form.deadline.value.clone()),
        ];

        let mut lines = Vec::new();
        for (index, label, value) in fields {
            let label_style = if index == form.current_field {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{label:<width$}", width = FORM_LABEL_WIDTH), label_style),
                Span::raw(value),
            ]));
            if index == SUBCATEGORY_FIELD {
                lines.push(Line::from(Span::styled(
                    format!("{:<width$}{suggestions}", "", width = FORM_LABEL_WIDTH),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
        lines.push(Line::from(""));
        lines.push(Line::from("↑/↓ on Subcategory picks a registered one"));

        let paragraph = Paragraph::new(lines)
            .block(block)
            .style(Style::default().bg(Color::Black));
        f.render_widget(paragraph, area);

        if let Some(input) = form.active_input() {
            // The suggestion line sits below the subcategory row.
            let row = form.current_field + usize::from(form.current_field > SUBCATEGORY_FIELD);
            let cursor_x = inner.x + ((FORM_LABEL_WIDTH + input.cursor) as u16).min(inner.width.saturating_sub(1));
            f.set_cursor_position((cursor_x, inner.y + row as u16));
        }
    }

    fn render_confirm(&self, f: &mut Frame, id: &TaskId) {
        let description = self
            .store
            .get(id)
            .map(|t| t.description.as_str())
            .unwrap_or("");

        let block = Block::default()
            .title("Confirm Action")
            .borders(Borders::ALL)
            .style(Style::default().bg(DARK_RED));

        let area = centered_rect(50, 20, f.area());
        f.render_widget(Clear, area);

        let text = vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "Delete this task?",
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(description),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ];

        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    /// Main event loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

/// Render a single task card
fn render_card(
    f: &mut Frame,
    area: Rect,
    task: &Task,
    color: Color,
    is_selected: bool,
    today: chrono::NaiveDate,
) {
    let style = if is_selected {
        Style::default().bg(color).fg(text_on(color)).add_modifier(Modifier::BOLD)
    } else {
        Style::default().bg(Color::DarkGray)
    };
    let available_width = area.width.saturating_sub(2) as usize;

    let description_style = if task.status.is_completed() {
        Style::default().add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };

    let mut status_line = vec![Span::raw(format_status(task.status))];
    if let Some(d) = task.deadline {
        status_line.push(Span::raw(" | "));
        let due = format!("Due {}", format_deadline(d));
        if task.is_overdue(today) {
            status_line.push(Span::styled(
                format!("{due} !"),
                Style::default().fg(ALERT_RED).add_modifier(Modifier::BOLD),
            ));
        } else {
            status_line.push(Span::raw(due));
        }
    }

    let card_text = vec![
        Line::from(Span::styled(truncate(&task.description, available_width), description_style)),
        Line::from(truncate(&task.joined_names(), available_width)),
        Line::from(status_line),
    ];

    let card_block = Paragraph::new(card_text)
        .block(Block::default().borders(Borders::ALL))
        .style(style);
    f.render_widget(card_block, area);
}

/// Scroll offset that keeps `selected` fully visible in `available` rows.
/// The first visible card always carries its bucket header.
fn scroll_to_show(entries: &[ColumnEntry], selected: usize, offset: usize, available: usize) -> usize {
    if entries.is_empty() {
        return 0;
    }
    let selected = selected.min(entries.len() - 1);
    let mut offset = offset.min(selected);
    loop {
        let used: usize = entries[offset..=selected]
            .iter()
            .enumerate()
            .map(|(i, e)| e.height(i == 0))
            .sum();
        if used <= available || offset == selected {
            return offset;
        }
        offset += 1;
    }
}
