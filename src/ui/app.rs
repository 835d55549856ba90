use std::mem;

use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;
use tracing::debug;

use crate::db::{delete_workout_by_id, list_workouts_by_date, replace_workout, save_workout};
use crate::models::{Workout, WorkoutDraft, DATE_FORMAT};

use super::forms::{DateForm, DraftForm};
use super::helpers::{centered_rect, key_hints, surface_error};
use super::screens::SavedWorkoutsScreen;

/// Rows reserved for the date header.
const HEADER_HEIGHT: u16 = 4;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// Which pane receives navigation keys.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Focus {
    Draft,
    Saved,
}

/// Modal state layered over the two panes.
enum Mode {
    Normal,
    PickingDate(DateForm),
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

/// Single-session form state: one selected date, the draft being built for
/// it, the workouts already stored on that date, and the id of the workout
/// being edited (if any). Store failures are returned to the caller rather
/// than shown in the footer.
pub struct App {
    conn: Connection,
    date: NaiveDate,
    form: DraftForm,
    editing_id: Option<i64>,
    saved: SavedWorkoutsScreen,
    focus: Focus,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(conn: Connection, date: NaiveDate) -> Result<Self> {
        let workouts = list_workouts_by_date(&conn, date)?;
        Ok(Self {
            conn,
            date,
            form: DraftForm::empty(date),
            editing_id: None,
            saved: SavedWorkoutsScreen::new(workouts),
            focus: Focus::Draft,
            mode: Mode::Normal,
            status: None,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn draft(&self) -> &WorkoutDraft {
        &self.form.draft
    }

    pub fn editing_id(&self) -> Option<i64> {
        self.editing_id
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn saved_workouts(&self) -> &[Workout] {
        &self.saved.workouts
    }

    /// Route a plain key press. Returns `true` when the app should exit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => match self.focus {
                Focus::Draft => self.handle_draft_key(code)?,
                Focus::Saved => self.handle_saved_key(code, &mut exit)?,
            },
            Mode::PickingDate(form) => self.handle_date_prompt(code, form)?,
        };

        Ok(exit)
    }

    /// Route a Ctrl+key chord. Returns `true` when the app should exit.
    pub fn handle_ctrl(&mut self, code: KeyCode) -> Result<bool> {
        if matches!(self.mode, Mode::PickingDate(_)) {
            return Ok(matches!(code, KeyCode::Char('q') | KeyCode::Char('c')));
        }
        match code {
            KeyCode::Char('q') | KeyCode::Char('c') => return Ok(true),
            KeyCode::Char('n') => self.add_exercise(),
            KeyCode::Char('a') => {
                if !self.add_set() {
                    self.set_status("Move the cursor onto an exercise first.", StatusKind::Error);
                }
            }
            KeyCode::Char('s') => {
                self.save()?;
            }
            KeyCode::Char('t') => {
                self.clear_status();
                self.mode = Mode::PickingDate(DateForm::with_date(self.date));
            }
            _ => {}
        }
        Ok(false)
    }

    /// Switch the form to another day. The draft and the editing target are
    /// discarded without warning; choosing the current day again is a no-op.
    pub fn select_date(&mut self, date: NaiveDate) -> Result<()> {
        if date == self.date {
            return Ok(());
        }
        debug!(from = %self.date, to = %date, "switching date");
        self.date = date;
        self.form = DraftForm::empty(date);
        self.editing_id = None;
        self.reload_saved()
    }

    pub fn add_exercise(&mut self) {
        self.focus = Focus::Draft;
        self.form.add_exercise();
    }

    /// Append a zeroed set to the exercise under the cursor.
    pub fn add_set(&mut self) -> bool {
        self.focus = Focus::Draft;
        self.form.add_set()
    }

    /// Persist the draft. When editing, the original tree is swapped for the
    /// draft in one transaction, so the saved workout gets a new id and a
    /// failed save leaves the original in place. Returns the new id.
    pub fn save(&mut self) -> Result<i64> {
        let draft = self.form.to_workout_draft();
        let replaced = match self.editing_id {
            Some(id) => replace_workout(&mut self.conn, id, &draft)?,
            None => None,
        };
        let id = match replaced {
            Some(id) => id,
            None => save_workout(&mut self.conn, &draft)?,
        };
        self.editing_id = None;
        self.reload_saved()?;
        self.set_status("Workout saved.", StatusKind::Info);
        Ok(id)
    }

    /// Load the selected saved workout into the draft, replacing whatever was
    /// there, and remember it as the edit target.
    pub fn edit_selected(&mut self) -> bool {
        let Some(workout) = self.saved.current_workout().cloned() else {
            self.set_status("No saved workout selected.", StatusKind::Error);
            return false;
        };
        self.date = workout.date;
        self.form = DraftForm::from_draft(workout.to_draft());
        self.editing_id = Some(workout.id);
        self.focus = Focus::Draft;
        self.set_status(
            format!("Editing {workout}. Saving replaces it."),
            StatusKind::Info,
        );
        true
    }

    /// Delete the selected saved workout immediately.
    pub fn delete_selected(&mut self) -> Result<bool> {
        let Some(id) = self.saved.current_workout().map(|workout| workout.id) else {
            self.set_status("No saved workout selected.", StatusKind::Error);
            return Ok(false);
        };
        let existed = delete_workout_by_id(&mut self.conn, id)?;
        if self.editing_id == Some(id) {
            self.editing_id = None;
        }
        self.reload_saved()?;
        self.set_status("Workout deleted.", StatusKind::Info);
        Ok(existed)
    }

    fn handle_draft_key(&mut self, code: KeyCode) -> Result<Mode> {
        match code {
            KeyCode::Up => self.form.move_cursor(-1),
            KeyCode::Down | KeyCode::Enter => self.form.move_cursor(1),
            KeyCode::Tab | KeyCode::BackTab => self.focus = Focus::Saved,
            KeyCode::PageUp => self.step_date(-1)?,
            KeyCode::PageDown => self.step_date(1)?,
            KeyCode::Esc => self.clear_status(),
            KeyCode::Backspace => self.form.backspace(),
            KeyCode::Char(ch) => {
                self.form.push_char(ch);
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_saved_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Esc => self.focus = Focus::Draft,
            KeyCode::Up => self.saved.move_selection(-1),
            KeyCode::Down => self.saved.move_selection(1),
            KeyCode::PageUp => self.step_date(-1)?,
            KeyCode::PageDown => self.step_date(1)?,
            KeyCode::Char('e') | KeyCode::Char('E') => {
                self.edit_selected();
            }
            KeyCode::Char('d') | KeyCode::Char('D') => {
                self.delete_selected()?;
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_date_prompt(&mut self, code: KeyCode, mut form: DateForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Date unchanged.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter => match form.parse_inputs() {
                Ok(date) => {
                    self.select_date(date)?;
                    Ok(Mode::Normal)
                }
                Err(err) => {
                    form.error = Some(surface_error(&err));
                    Ok(Mode::PickingDate(form))
                }
            },
            KeyCode::Backspace => {
                form.backspace();
                form.error = None;
                Ok(Mode::PickingDate(form))
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
                Ok(Mode::PickingDate(form))
            }
            _ => Ok(Mode::PickingDate(form)),
        }
    }

    fn step_date(&mut self, days: i64) -> Result<()> {
        let next = match days {
            d if d < 0 => self.date.pred_opt(),
            _ => self.date.succ_opt(),
        };
        match next {
            Some(date) => {
                self.clear_status();
                self.select_date(date)
            }
            None => Ok(()),
        }
    }

    fn reload_saved(&mut self) -> Result<()> {
        let workouts = list_workouts_by_date(&self.conn, self.date)?;
        self.saved.set_workouts(workouts);
        Ok(())
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

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT.min(area.height)),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);

        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(chunks[1]);
        self.draw_draft(frame, panes[0]);
        self.draw_saved(frame, panes[1]);
        self.draw_footer(frame, chunks[2]);

        if let Mode::PickingDate(form) = &self.mode {
            self.draw_date_prompt(frame, area, form);
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![Line::from(vec![
            Span::styled(
                self.date.format(DATE_FORMAT).to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  •  {}", self.date.format("%A"))),
        ])];
        match self.editing_id {
            Some(id) => lines.push(Line::from(Span::styled(
                format!("Editing workout #{id}. Saving deletes it and stores the draft anew."),
                Style::default().fg(Color::Yellow),
            ))),
            None => lines.push(Line::from(Span::styled(
                "New workout",
                Style::default().fg(Color::Gray),
            ))),
        }

        let header = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .block(Block::default().borders(Borders::ALL).title("Workout Log"));
        frame.render_widget(header, area);
    }

    fn draw_draft(&self, frame: &mut Frame, area: Rect) {
        let block = pane_block("Draft", self.focus == Focus::Draft);
        let items: Vec<ListItem> = self
            .form
            .fields()
            .into_iter()
            .map(|field| ListItem::new(self.form.build_line(field)))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_symbol("▶ ")
            .highlight_style(Style::default().add_modifier(Modifier::BOLD));
        let mut state = ListState::default().with_selected(Some(self.form.cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_saved(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Saved;
        let block = pane_block("Saved Workouts for This Date", focused);

        if self.saved.workouts.is_empty() {
            let message = Paragraph::new("No saved workouts for this date.")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        let items: Vec<ListItem> = self
            .saved
            .workouts
            .iter()
            .map(|workout| {
                let mut lines = vec![Line::from(Span::styled(
                    workout.to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ))];
                lines.extend(
                    SavedWorkoutsScreen::card_lines(workout)
                        .into_iter()
                        .map(|text| Line::from(format!("  {text}"))),
                );
                lines.push(Line::from(""));
                ListItem::new(lines)
            })
            .collect();

        let highlight = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let list = List::new(items)
            .block(block)
            .highlight_symbol(if focused { "▶ " } else { "  " })
            .highlight_style(highlight);
        let mut state = ListState::default().with_selected(Some(self.saved.selected));
        frame.render_stateful_widget(list, area, &mut state);
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

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        match (&self.mode, self.focus) {
            (Mode::PickingDate(_), _) => key_hints(&[("Enter", "Go"), ("Esc", "Cancel")]),
            (Mode::Normal, Focus::Draft) => key_hints(&[
                ("↑↓", "Field"),
                ("Ctrl+N", "Add Exercise"),
                ("Ctrl+A", "Add Set"),
                ("Ctrl+S", "Save"),
                ("PgUp/PgDn", "Day"),
                ("Ctrl+T", "Date"),
                ("Tab", "Saved"),
                ("Ctrl+Q", "Quit"),
            ]),
            (Mode::Normal, Focus::Saved) => key_hints(&[
                ("↑↓", "Select"),
                ("e", "Edit"),
                ("d", "Delete"),
                ("PgUp/PgDn", "Day"),
                ("Tab", "Draft"),
                ("q", "Quit"),
            ]),
        }
    }

    fn draw_date_prompt(&self, frame: &mut Frame, area: Rect, form: &DateForm) {
        let popup_area = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Go to Date").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![form.build_line(), Line::from("")];
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to jump • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let cursor_x = inner.x + "Date: ".len() as u16 + form.input.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }
}

fn pane_block(title: &str, focused: bool) -> Block<'static> {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string());
    if focused {
        block.border_style(Style::default().fg(Color::Yellow))
    } else {
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fetch_workout, init_schema, save_workout};
    use crate::models::{ExerciseDraft, SetDraft};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn memory_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn app_on(d: u32) -> App {
        App::new(memory_conn(), day(d)).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) {
        assert!(!app.handle_key(code).unwrap());
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn seeded(conn: &mut Connection, date: NaiveDate, name: &str) -> i64 {
        save_workout(
            conn,
            &WorkoutDraft {
                date,
                label: Some(format!("{name} day")),
                exercises: vec![ExerciseDraft {
                    name: name.to_string(),
                    sets: vec![SetDraft {
                        reps: 5,
                        weight: 100.0,
                        notes: "".into(),
                    }],
                }],
            },
        )
        .unwrap()
    }

    #[test]
    fn keyboard_built_draft_is_saved_and_listed() {
        let mut app = app_on(25);
        type_text(&mut app, "Push Day");
        app.handle_ctrl(KeyCode::Char('n')).unwrap();
        type_text(&mut app, "Push Up");
        app.handle_ctrl(KeyCode::Char('a')).unwrap();
        type_text(&mut app, "10");
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        type_text(&mut app, "strict");
        app.handle_ctrl(KeyCode::Char('s')).unwrap();

        let saved = app.saved_workouts();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].label.as_deref(), Some("Push Day"));
        let set = &saved[0].exercises[0].sets[0];
        assert_eq!((set.reps, set.weight, set.notes.as_str()), (10, 0.0, "strict"));
        assert_eq!(app.editing_id(), None);
    }

    #[test]
    fn changing_date_resets_draft_and_edit_target() {
        let mut conn = memory_conn();
        seeded(&mut conn, day(25), "Squat");
        let mut app = App::new(conn, day(25)).unwrap();

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('e'));
        assert!(app.editing_id().is_some());
        assert_eq!(app.draft().exercises.len(), 1);

        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.date(), day(26));
        assert_eq!(app.editing_id(), None);
        assert_eq!(app.draft(), &WorkoutDraft::empty(day(26)));
        assert!(app.saved_workouts().is_empty());
    }

    #[test]
    fn reselecting_same_date_keeps_draft() {
        let mut app = app_on(25);
        app.add_exercise();
        app.select_date(day(25)).unwrap();
        assert_eq!(app.draft().exercises.len(), 1);
    }

    #[test]
    fn save_while_editing_replaces_the_tree() {
        let mut conn = memory_conn();
        let original = seeded(&mut conn, day(25), "Squat");
        let mut app = App::new(conn, day(25)).unwrap();

        assert!(app.edit_selected());
        assert_eq!(app.editing_id(), Some(original));
        assert_eq!(app.focus(), Focus::Draft);
        assert_eq!(app.draft().label.as_deref(), Some("Squat day"));

        press(&mut app, KeyCode::Down);
        assert!(app.add_set());
        let new_id = app.save().unwrap();
        assert_ne!(new_id, original);
        assert_eq!(app.editing_id(), None);

        let saved = app.saved_workouts();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, new_id);
        assert_eq!(saved[0].exercises[0].sets.len(), 2);
    }

    #[test]
    fn failed_edit_save_keeps_the_original() {
        let mut conn = memory_conn();
        let original = seeded(&mut conn, day(25), "Squat");
        conn.execute_batch(
            "CREATE TRIGGER reject_heavy BEFORE INSERT ON sets
             WHEN NEW.weight > 150 BEGIN SELECT RAISE(ABORT, 'too heavy'); END;",
        )
        .unwrap();
        let mut app = App::new(conn, day(25)).unwrap();

        assert!(app.edit_selected());
        app.form.draft.exercises[0].sets[0].weight = 200.0;
        let err = app.save().unwrap_err();
        assert!(format!("{err:#}").contains("too heavy"));

        assert_eq!(app.editing_id(), Some(original));
        let stored = fetch_workout(&app.conn, original).unwrap().unwrap();
        assert_eq!(stored.exercises[0].sets[0].weight, 100.0);
        assert_eq!(list_workouts_by_date(&app.conn, day(25)).unwrap().len(), 1);
    }

    #[test]
    fn saving_an_edit_whose_target_vanished_inserts_fresh() {
        let mut conn = memory_conn();
        let original = seeded(&mut conn, day(25), "Squat");
        let mut app = App::new(conn, day(25)).unwrap();

        assert!(app.edit_selected());
        assert!(delete_workout_by_id(&mut app.conn, original).unwrap());
        let new_id = app.save().unwrap();

        assert_ne!(new_id, original);
        assert_eq!(app.saved_workouts().len(), 1);
        assert_eq!(app.saved_workouts()[0].id, new_id);
    }

    #[test]
    fn delete_removes_without_confirmation() {
        let mut conn = memory_conn();
        let older = seeded(&mut conn, day(25), "Squat");
        seeded(&mut conn, day(25), "Deadlift");
        let mut app = App::new(conn, day(25)).unwrap();

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('d'));

        let remaining: Vec<&str> = app
            .saved_workouts()
            .iter()
            .map(|w| w.exercises[0].name.as_str())
            .collect();
        assert_eq!(remaining, vec!["Deadlift"]);
        assert!(app.saved_workouts().iter().all(|w| w.id != older));
    }

    #[test]
    fn deleting_the_edit_target_clears_it() {
        let mut conn = memory_conn();
        seeded(&mut conn, day(25), "Squat");
        let mut app = App::new(conn, day(25)).unwrap();
        app.edit_selected();
        assert!(app.delete_selected().unwrap());
        assert_eq!(app.editing_id(), None);
        assert!(!app.delete_selected().unwrap());
    }

    #[test]
    fn date_prompt_jumps_and_rejects_bad_days() {
        let mut app = app_on(25);
        app.handle_ctrl(KeyCode::Char('t')).unwrap();
        for _ in 0..10 {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "2025-02-30");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.date(), day(25));

        for _ in 0..2 {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "28");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.date(), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn quit_chords_and_saved_pane_q() {
        let mut app = app_on(25);
        assert!(app.handle_ctrl(KeyCode::Char('q')).unwrap());
        assert!(!app.handle_key(KeyCode::Char('q')).unwrap());
        press(&mut app, KeyCode::Tab);
        assert!(app.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn renders_saved_workouts_and_draft() {
        let mut conn = memory_conn();
        seeded(&mut conn, day(25), "Squat");
        let mut app = App::new(conn, day(25)).unwrap();
        app.add_exercise();

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|cell| cell.symbol()).collect();

        assert!(text.contains("2025-05-25"));
        assert!(text.contains("Squat day — 2025-05-25"));
        assert!(text.contains("- 5 reps @ 100 lbs"));
        assert!(text.contains("Exercise 1: <name>"));
    }
}
