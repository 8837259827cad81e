use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Paragraph, Row as TableRow, Table, TableState, Tabs, Wrap,
};
use ratatui::Frame;
use tracing::error;

use crate::events::EntityKind;
use crate::library::Library;
use crate::manager::{ActionError, EntityManager, Mode as ManagerMode};
use crate::table::InputKind;

use super::forms::FormState;
use super::helpers::{centered_rect, column_constraint, delete_summary, noun};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height of the tab strip at the top.
const TABS_HEIGHT: u16 = 3;
/// Rows skipped by PageUp/PageDown.
const PAGE_STEP: isize = 10;

/// Fine-grained modes layered over the active tab.
enum Mode {
    Normal,
    Form(FormState),
    ConfirmDelete(Vec<usize>),
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

/// Central application state shared across the TUI.
pub struct App {
    library: Library,
    tab: EntityKind,
    cursors: [usize; 3],
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(library: Library) -> Self {
        Self {
            library,
            tab: EntityKind::Book,
            cursors: [0; 3],
            mode: Mode::Normal,
            status: None,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn tab(&self) -> EntityKind {
        self.tab
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Form(form) => self.handle_form(code, form)?,
            Mode::ConfirmDelete(rows) => self.handle_confirm_delete(code, rows)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc => {
                if self.current().selection().is_empty() {
                    *exit = true;
                } else {
                    self.library.manager_mut(self.tab).clear_selection();
                    self.clear_status();
                }
            }
            KeyCode::Tab => self.switch_tab(1),
            KeyCode::BackTab => self.switch_tab(-1),
            KeyCode::Char(ch @ '1'..='3') => {
                let index = ch as usize - '1' as usize;
                self.tab = EntityKind::ALL[index];
                self.clear_status();
            }
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::PageUp => self.move_cursor(-PAGE_STEP),
            KeyCode::PageDown => self.move_cursor(PAGE_STEP),
            KeyCode::Home => self.cursors[self.tab.index()] = 0,
            KeyCode::End => {
                let rows = self.current().table().row_count();
                self.cursors[self.tab.index()] = rows.saturating_sub(1);
            }
            KeyCode::Char(' ') => {
                let cursor = self.cursor();
                self.library.manager_mut(self.tab).toggle_selected(cursor);
            }
            KeyCode::Char('a') | KeyCode::Char('+') => return Ok(self.open_add_form()),
            KeyCode::Char('e') | KeyCode::Enter => return Ok(self.open_edit_form()),
            KeyCode::Char('d') | KeyCode::Char('-') | KeyCode::Delete => {
                return Ok(self.confirm_delete());
            }
            KeyCode::Char('r') => match self.library.reload() {
                Ok(()) => {
                    self.clamp_cursors();
                    self.set_status("Reloaded from the database.", StatusKind::Info);
                }
                Err(err) => {
                    error!(error = %err, "reload failed");
                    self.set_status(err.to_string(), StatusKind::Error);
                }
            },
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_form(&mut self, code: KeyCode, mut form: FormState) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                let manager = self.library.manager_mut(self.tab);
                if manager.mode() == ManagerMode::EditForm {
                    manager.clear_selection();
                }
                manager.cancel();
                self.set_status("Cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab | KeyCode::Down => form.move_focus(1),
            KeyCode::BackTab | KeyCode::Up => form.move_focus(-1),
            KeyCode::Left => {
                form.cycle_choice(-1);
            }
            KeyCode::Right => {
                form.cycle_choice(1);
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => return Ok(self.submit_form(form)),
            KeyCode::Char(ch) => {
                form.push_char(ch);
            }
            _ => {}
        }
        Ok(Mode::Form(form))
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, rows: Vec<usize>) -> Result<Mode> {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                let report = self.library.delete_rows(self.tab, &rows);
                self.clamp_cursors();
                let (text, failed) = delete_summary(self.tab, &report);
                let kind = if failed {
                    StatusKind::Error
                } else {
                    StatusKind::Info
                };
                self.set_status(text, kind);
                Ok(Mode::Normal)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.clear_status();
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmDelete(rows)),
        }
    }

    fn open_add_form(&mut self) -> Mode {
        let manager = self.library.manager_mut(self.tab);
        let values = manager.begin_add();
        let form = self.build_form(format!("Add {}", noun(self.tab)), values);
        self.clear_status();
        Mode::Form(form)
    }

    fn open_edit_form(&mut self) -> Mode {
        let cursor = self.cursor();
        let manager = self.library.manager_mut(self.tab);
        if manager.table().row_count() == 0 {
            self.set_status(
                format!("No {} to edit.", self.tab.title().to_lowercase()),
                StatusKind::Error,
            );
            return Mode::Normal;
        }
        manager.select(&[cursor]);
        match manager.begin_edit() {
            Ok(values) => {
                let form = self.build_form(format!("Edit {}", noun(self.tab)), values);
                self.clear_status();
                Mode::Form(form)
            }
            Err(err) => {
                self.set_status(err.to_string(), StatusKind::Error);
                Mode::Normal
            }
        }
    }

    fn build_form(&self, title: String, values: Vec<String>) -> FormState {
        let manager = self.current();
        let fields = manager.table().fields().to_vec();
        let options = fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.input == InputKind::Choice)
            .map(|(idx, _)| (idx, manager.choices(idx).to_vec()))
            .collect();
        FormState::new(title, fields, values, options)
    }

    fn submit_form(&mut self, mut form: FormState) -> Mode {
        let editing = self.current().mode() == ManagerMode::EditForm;
        let result = if editing {
            self.library.edit(self.tab, &form.values)
        } else {
            self.library.add(self.tab, &form.values)
        };

        match result {
            Ok(index) => {
                // The edit target was selected only for the form.
                if editing {
                    self.library.manager_mut(self.tab).clear_selection();
                }
                self.cursors[self.tab.index()] = index;
                let verb = if editing { "Updated" } else { "Added" };
                self.set_status(format!("{verb} {}.", self.tab), StatusKind::Info);
                Mode::Normal
            }
            Err(err) => {
                self.report_form_error(&err);
                form.error = Some(err.to_string());
                Mode::Form(form)
            }
        }
    }

    fn report_form_error(&mut self, err: &ActionError) {
        if matches!(err, ActionError::Store { .. }) {
            error!(entity = %self.tab, error = %err, "store rejected form");
        }
        self.set_status(err.to_string(), StatusKind::Error);
    }

    fn confirm_delete(&mut self) -> Mode {
        let manager = self.current();
        if manager.table().row_count() == 0 {
            self.set_status(
                format!("No {} to delete.", self.tab.title().to_lowercase()),
                StatusKind::Error,
            );
            return Mode::Normal;
        }
        let rows: Vec<usize> = if manager.selection().is_empty() {
            vec![self.cursor()]
        } else {
            manager.selection().iter().copied().collect()
        };
        Mode::ConfirmDelete(rows)
    }

    fn current(&self) -> &dyn EntityManager {
        self.library.manager(self.tab)
    }

    fn cursor(&self) -> usize {
        self.cursors[self.tab.index()]
    }

    fn switch_tab(&mut self, offset: isize) {
        let len = EntityKind::ALL.len() as isize;
        let next = (self.tab.index() as isize + offset).rem_euclid(len);
        self.tab = EntityKind::ALL[next as usize];
        self.clear_status();
    }

    fn move_cursor(&mut self, offset: isize) {
        let rows = self.current().table().row_count();
        if rows == 0 {
            self.cursors[self.tab.index()] = 0;
            return;
        }
        let next = (self.cursor() as isize + offset).clamp(0, rows as isize - 1);
        self.cursors[self.tab.index()] = next as usize;
    }

    /// Rows can disappear on any tab after a delete or reload.
    fn clamp_cursors(&mut self) {
        for kind in EntityKind::ALL {
            let rows = self.library.manager(kind).table().row_count();
            let cursor = &mut self.cursors[kind.index()];
            *cursor = (*cursor).min(rows.saturating_sub(1));
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(TABS_HEIGHT.min(area.height)),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_tabs(frame, chunks[0]);
        self.draw_table(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::Form(form) => self.draw_form(frame, area, form),
            Mode::ConfirmDelete(rows) => self.draw_confirm_delete(frame, area, rows),
            Mode::Normal => {}
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = EntityKind::ALL
            .iter()
            .enumerate()
            .map(|(idx, kind)| {
                let rows = self.library.manager(*kind).table().row_count();
                Line::from(format!(" {} {} ({rows}) ", idx + 1, kind.title()))
            })
            .collect();

        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title("Library"))
            .select(self.tab.index())
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_table(&self, frame: &mut Frame, area: Rect) {
        let manager = self.current();
        let table = manager.table();

        if table.row_count() == 0 {
            let message = Paragraph::new(format!(
                "No {} yet. Press 'a' to add one.",
                self.tab.title().to_lowercase()
            ))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(self.tab.title()));
            frame.render_widget(message, area);
            return;
        }

        let columns = table.visible_columns();
        let fields = table.fields();

        let mut widths = vec![Constraint::Length(1)];
        widths.extend(columns.iter().map(|&col| column_constraint(&fields[col])));

        let header = TableRow::new(
            std::iter::once(Cell::from(""))
                .chain(columns.iter().map(|&col| Cell::from(fields[col].label))),
        )
        .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = table.rows().iter().enumerate().map(|(idx, row)| {
            let marker = if manager.selection().contains(&idx) {
                "*"
            } else {
                " "
            };
            TableRow::new(
                std::iter::once(Cell::from(marker))
                    .chain(columns.iter().map(|&col| Cell::from(row[col].clone()))),
            )
        });

        let title = match manager.selection().len() {
            0 => self.tab.title().to_string(),
            marked => format!("{} ({marked} marked)", self.tab.title()),
        };

        let widget = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .row_highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("> ");

        let mut state = TableState::default().with_selected(Some(self.cursor()));
        frame.render_stateful_widget(widget, area, &mut state);
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
        let keys: &[(&str, &str)] = match &self.mode {
            Mode::Form(_) => &[
                ("[Tab]", " Next field   "),
                ("[←→]", " Choose   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
            Mode::ConfirmDelete(_) => &[("[Y]", " Delete   "), ("[N/Esc]", " Keep")],
            Mode::Normal => &[
                ("[Tab/1-3]", " Switch   "),
                ("[Space]", " Mark   "),
                ("[a]", " Add   "),
                ("[e]", " Edit   "),
                ("[d]", " Delete   "),
                ("[r]", " Reload   "),
                ("[q]", " Quit"),
            ],
        };

        Line::from(
            keys.iter()
                .flat_map(|(key, action)| {
                    [Span::styled(*key, key_style), Span::raw(*action)]
                })
                .collect::<Vec<_>>(),
        )
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, form: &FormState) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(form.title.as_str())
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let visible = form.visible();
        let mut lines: Vec<Line> = visible.iter().map(|&idx| form.build_line(idx)).collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Fields marked * are required.",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, inner);

        if form.shows_cursor() {
            if let Some(line) = visible.iter().position(|&idx| idx == form.active) {
                let cursor_x = inner.x + (form.label_width() + form.active_len()) as u16;
                let cursor_y = inner.y + line as u16;
                frame.set_cursor_position((cursor_x, cursor_y));
            }
        }
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, rows: &[usize]) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Removal")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let table = self.current().table();
        let question = match rows {
            [row] => {
                let label = table.get_cell(*row, 1).unwrap_or_default();
                format!("Delete {} \"{label}\"?", self.tab)
            }
            _ => format!(
                "Delete {} {}?",
                rows.len(),
                self.tab.title().to_lowercase()
            ),
        };

        let mut lines = vec![Line::from(question)];
        if self.tab != EntityKind::Book {
            lines.push(Line::from(
                "Records still referenced by a book will be kept.",
            ));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press Y to confirm or N / Esc to cancel.",
            Style::default().fg(Color::Gray),
        )));

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
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
}
