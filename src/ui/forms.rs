use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{ExerciseDraft, SetDraft, WorkoutDraft, DATE_FORMAT};

/// Longest weight entry accepted, decimal point included.
const MAX_WEIGHT_CHARS: usize = 9;

/// One editable slot in the draft. Indices point into the draft's exercise
/// and set vectors.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum DraftField {
    Label,
    ExerciseName(usize),
    Reps(usize, usize),
    Weight(usize, usize),
    Notes(usize, usize),
}

impl DraftField {
    /// Exercise the field belongs to, if any.
    pub(crate) fn exercise(self) -> Option<usize> {
        match self {
            DraftField::Label => None,
            DraftField::ExerciseName(ex)
            | DraftField::Reps(ex, _)
            | DraftField::Weight(ex, _)
            | DraftField::Notes(ex, _) => Some(ex),
        }
    }
}

/// The in-memory workout being assembled, plus the cursor that decides which
/// field receives keystrokes. Edits land in the draft immediately.
#[derive(Clone, Debug)]
pub(crate) struct DraftForm {
    pub(crate) draft: WorkoutDraft,
    pub(crate) cursor: usize,
    /// Text of the weight field under the cursor, so a trailing decimal point
    /// survives between keystrokes.
    weight_input: String,
}

impl DraftForm {
    pub(crate) fn empty(date: NaiveDate) -> Self {
        Self::from_draft(WorkoutDraft::empty(date))
    }

    /// Wrap an existing tree, placing the cursor on the label.
    pub(crate) fn from_draft(draft: WorkoutDraft) -> Self {
        let mut form = Self {
            draft,
            cursor: 0,
            weight_input: String::new(),
        };
        form.sync_input();
        form
    }

    /// Flattened, display-ordered list of every editable field.
    pub(crate) fn fields(&self) -> Vec<DraftField> {
        let mut fields = vec![DraftField::Label];
        for (ex, exercise) in self.draft.exercises.iter().enumerate() {
            fields.push(DraftField::ExerciseName(ex));
            for set in 0..exercise.sets.len() {
                fields.push(DraftField::Reps(ex, set));
                fields.push(DraftField::Weight(ex, set));
                fields.push(DraftField::Notes(ex, set));
            }
        }
        fields
    }

    pub(crate) fn active(&self) -> DraftField {
        self.fields()
            .get(self.cursor)
            .copied()
            .unwrap_or(DraftField::Label)
    }

    pub(crate) fn move_cursor(&mut self, offset: isize) {
        let len = self.fields().len() as isize;
        let new = (self.cursor as isize + offset).clamp(0, len - 1);
        self.cursor = new as usize;
        self.sync_input();
    }

    /// Append a blank exercise and put the cursor on its name.
    pub(crate) fn add_exercise(&mut self) {
        self.draft.exercises.push(ExerciseDraft::default());
        let ex = self.draft.exercises.len() - 1;
        self.focus(DraftField::ExerciseName(ex));
    }

    /// Append a zeroed set to the exercise under the cursor. Returns `false`
    /// when the cursor is not inside an exercise.
    pub(crate) fn add_set(&mut self) -> bool {
        let Some(ex) = self.active().exercise() else {
            return false;
        };
        let sets = &mut self.draft.exercises[ex].sets;
        sets.push(SetDraft::default());
        let set = sets.len() - 1;
        self.focus(DraftField::Reps(ex, set));
        true
    }

    /// Feed one typed character to the active field. Numeric fields only take
    /// digits (and one decimal point for weight), so values never go negative.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active() {
            DraftField::Label => {
                self.draft.label.get_or_insert_with(String::new).push(ch);
                true
            }
            DraftField::ExerciseName(ex) => {
                self.draft.exercises[ex].name.push(ch);
                true
            }
            DraftField::Notes(ex, set) => {
                self.draft.exercises[ex].sets[set].notes.push(ch);
                true
            }
            DraftField::Reps(ex, set) => {
                let Some(digit) = ch.to_digit(10) else {
                    return false;
                };
                let reps = &mut self.draft.exercises[ex].sets[set].reps;
                match reps.checked_mul(10).and_then(|r| r.checked_add(digit)) {
                    Some(updated) => {
                        *reps = updated;
                        true
                    }
                    None => false,
                }
            }
            DraftField::Weight(ex, set) => {
                let accepted = match ch {
                    '0'..='9' => self.weight_input.len() < MAX_WEIGHT_CHARS,
                    '.' => {
                        !self.weight_input.contains('.')
                            && self.weight_input.len() < MAX_WEIGHT_CHARS
                    }
                    _ => false,
                };
                if !accepted {
                    return false;
                }
                if self.weight_input == "0" && ch != '.' {
                    self.weight_input.clear();
                }
                self.weight_input.push(ch);
                self.draft.exercises[ex].sets[set].weight = parse_weight(&self.weight_input);
                true
            }
        }
    }

    pub(crate) fn backspace(&mut self) {
        match self.active() {
            DraftField::Label => {
                if let Some(label) = self.draft.label.as_mut() {
                    label.pop();
                }
            }
            DraftField::ExerciseName(ex) => {
                self.draft.exercises[ex].name.pop();
            }
            DraftField::Notes(ex, set) => {
                self.draft.exercises[ex].sets[set].notes.pop();
            }
            DraftField::Reps(ex, set) => {
                self.draft.exercises[ex].sets[set].reps /= 10;
            }
            DraftField::Weight(ex, set) => {
                self.weight_input.pop();
                self.draft.exercises[ex].sets[set].weight = parse_weight(&self.weight_input);
            }
        }
    }

    /// The draft as it should be persisted: a blank label is stored as absent.
    pub(crate) fn to_workout_draft(&self) -> WorkoutDraft {
        let mut draft = self.draft.clone();
        if draft
            .label
            .as_deref()
            .map(|label| label.trim().is_empty())
            .unwrap_or(false)
        {
            draft.label = None;
        }
        draft
    }

    /// Render one field as `Name: value`, highlighting the active field.
    pub(crate) fn build_line(&self, field: DraftField) -> Line<'static> {
        let is_active = self.active() == field;
        let (name, value, placeholder) = match field {
            DraftField::Label => (
                "Label".to_string(),
                self.draft.label.clone().unwrap_or_default(),
                "<optional>",
            ),
            DraftField::ExerciseName(ex) => (
                format!("Exercise {}", ex + 1),
                self.draft.exercises[ex].name.clone(),
                "<name>",
            ),
            DraftField::Reps(ex, set) => (
                format!("    Set {} reps", set + 1),
                self.draft.exercises[ex].sets[set].reps.to_string(),
                "0",
            ),
            DraftField::Weight(ex, set) => {
                let value = if is_active {
                    self.weight_input.clone()
                } else {
                    self.draft.exercises[ex].sets[set].weight.to_string()
                };
                (format!("    Set {} weight (lbs)", set + 1), value, "0")
            }
            DraftField::Notes(ex, set) => (
                format!("    Set {} notes", set + 1),
                self.draft.exercises[ex].sets[set].notes.clone(),
                "",
            ),
        };

        let display = if value.is_empty() {
            placeholder.to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{name}: ")),
            Span::styled(display, style),
        ])
    }

    fn focus(&mut self, field: DraftField) {
        if let Some(idx) = self.fields().iter().position(|candidate| *candidate == field) {
            self.cursor = idx;
        }
        self.sync_input();
    }

    /// Re-seed the weight buffer from the draft whenever the cursor lands on a
    /// new field.
    fn sync_input(&mut self) {
        self.weight_input = match self.active() {
            DraftField::Weight(ex, set) => self.draft.exercises[ex].sets[set].weight.to_string(),
            _ => String::new(),
        };
    }
}

fn parse_weight(raw: &str) -> f64 {
    raw.parse::<f64>().unwrap_or(0.0)
}

/// Modal prompt for jumping straight to a date.
#[derive(Default, Clone)]
pub(crate) struct DateForm {
    pub(crate) input: String,
    pub(crate) error: Option<String>,
}

impl DateForm {
    pub(crate) fn with_date(date: NaiveDate) -> Self {
        Self {
            input: date.format(DATE_FORMAT).to_string(),
            error: None,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if (ch.is_ascii_digit() || ch == '-') && self.input.len() < 10 {
            self.input.push(ch);
            true
        } else {
            false
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.input.pop();
    }

    pub(crate) fn parse_inputs(&self) -> Result<NaiveDate> {
        let raw = self.input.trim();
        if raw.is_empty() {
            return Err(anyhow!("Date is required."));
        }
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|_| anyhow!("Date must be a real day written as YYYY-MM-DD."))
    }

    pub(crate) fn build_line(&self) -> Line<'static> {
        let display = if self.input.is_empty() {
            "YYYY-MM-DD".to_string()
        } else {
            self.input.clone()
        };
        let style = if self.input.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Yellow)
        };
        Line::from(vec![Span::raw("Date: "), Span::styled(display, style)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> DraftForm {
        DraftForm::empty(NaiveDate::from_ymd_opt(2025, 5, 25).unwrap())
    }

    fn type_text(form: &mut DraftForm, text: &str) {
        for ch in text.chars() {
            form.push_char(ch);
        }
    }

    #[test]
    fn add_exercise_appends_blank_and_focuses_name() {
        let mut form = form();
        form.add_exercise();
        assert_eq!(form.draft.exercises, vec![ExerciseDraft::default()]);
        assert_eq!(form.active(), DraftField::ExerciseName(0));
    }

    #[test]
    fn add_set_needs_an_exercise_under_the_cursor() {
        let mut form = form();
        assert!(!form.add_set());

        form.add_exercise();
        assert!(form.add_set());
        assert_eq!(form.draft.exercises[0].sets, vec![SetDraft::default()]);
        assert_eq!(form.active(), DraftField::Reps(0, 0));
    }

    #[test]
    fn typing_fills_every_field_in_place() {
        let mut form = form();
        type_text(&mut form, "Push Day");
        form.add_exercise();
        type_text(&mut form, "Bench");
        form.add_set();
        type_text(&mut form, "8x");
        form.move_cursor(1);
        type_text(&mut form, "-62.5.5");
        form.move_cursor(1);
        type_text(&mut form, "paused");

        let set = &form.draft.exercises[0].sets[0];
        assert_eq!(form.draft.label.as_deref(), Some("Push Day"));
        assert_eq!(form.draft.exercises[0].name, "Bench");
        assert_eq!(set.reps, 8);
        assert_eq!(set.weight, 62.55);
        assert_eq!(set.notes, "paused");
    }

    #[test]
    fn numeric_backspace_and_zero_replacement() {
        let mut form = form();
        form.add_exercise();
        form.add_set();
        type_text(&mut form, "12");
        form.backspace();
        assert_eq!(form.draft.exercises[0].sets[0].reps, 1);

        form.move_cursor(1);
        type_text(&mut form, "7.");
        assert_eq!(form.draft.exercises[0].sets[0].weight, 7.0);
        form.backspace();
        form.backspace();
        assert_eq!(form.draft.exercises[0].sets[0].weight, 0.0);
    }

    #[test]
    fn reps_ignore_overflow() {
        let mut form = form();
        form.add_exercise();
        form.add_set();
        type_text(&mut form, "99999999999");
        assert_eq!(form.draft.exercises[0].sets[0].reps, 999_999_999);
    }

    #[test]
    fn cursor_is_clamped_to_the_field_list() {
        let mut form = form();
        form.move_cursor(-3);
        assert_eq!(form.active(), DraftField::Label);
        form.add_exercise();
        form.add_set();
        form.move_cursor(10);
        assert_eq!(form.active(), DraftField::Notes(0, 0));
    }

    #[test]
    fn blank_label_is_saved_as_absent() {
        let mut form = form();
        type_text(&mut form, "  ");
        assert_eq!(form.to_workout_draft().label, None);
    }

    #[test]
    fn date_form_validates_calendar_days() {
        let mut date = DateForm::default();
        for ch in "2024-02-29x".chars() {
            date.push_char(ch);
        }
        assert_eq!(
            date.parse_inputs().unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );

        let bad = DateForm {
            input: "2025-02-29".into(),
            error: None,
        };
        assert!(bad.parse_inputs().is_err());
    }
}
