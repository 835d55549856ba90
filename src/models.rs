//! Domain models that mirror the SQLite schema and get passed between the
//! persistence layer, the terminal form, and the REST handlers. Stored types
//! carry their primary keys; the `*Draft` types describe a tree that has not
//! been written yet and therefore has no ids.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Format used for every date crossing a boundary (SQLite text, JSON, UI).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A dated training session together with everything it owns.
pub struct Workout {
    /// Primary key. Ids only grow, so they double as the creation order.
    pub id: i64,
    pub date: NaiveDate,
    /// Free-text label such as "Push Day". `None` when the user left it blank.
    pub label: Option<String>,
    pub exercises: Vec<Exercise>,
}

impl Workout {
    /// Label shown in listings, falling back to a placeholder for blank labels.
    pub fn display_label(&self) -> &str {
        match self.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label,
            _ => "Unnamed",
        }
    }

    /// Convert a stored tree back into an editable draft, dropping ids.
    pub fn to_draft(&self) -> WorkoutDraft {
        WorkoutDraft {
            date: self.date,
            label: self.label.clone(),
            exercises: self
                .exercises
                .iter()
                .map(|exercise| ExerciseDraft {
                    name: exercise.name.clone(),
                    sets: exercise
                        .sets
                        .iter()
                        .map(|set| SetDraft {
                            reps: set.reps,
                            weight: set.weight,
                            notes: set.notes.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for Workout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} — {}",
            self.display_label(),
            self.date.format(DATE_FORMAT)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A named movement inside a workout.
pub struct Exercise {
    pub id: i64,
    pub workout_id: i64,
    pub name: String,
    pub sets: Vec<WorkoutSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// One performance unit of an exercise. Named `WorkoutSet` so it does not
/// shadow the collection types.
pub struct WorkoutSet {
    pub id: i64,
    pub exercise_id: i64,
    pub reps: u32,
    pub weight: f64,
    pub notes: String,
}

impl fmt::Display for WorkoutSet {
    /// The one-line rendering used by the saved workout listing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- {} reps @ {} lbs — {}", self.reps, self.weight, self.notes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A workout tree that has not been persisted yet. The form surface mutates
/// one of these in place; the REST surface builds one from a request body.
pub struct WorkoutDraft {
    pub date: NaiveDate,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub exercises: Vec<ExerciseDraft>,
}

impl WorkoutDraft {
    /// An empty draft scoped to `date`.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            label: None,
            exercises: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDraft {
    pub name: String,
    #[serde(default)]
    pub sets: Vec<SetDraft>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Set fields default to zero/empty so partially filled payloads still load.
pub struct SetDraft {
    #[serde(default)]
    pub reps: u32,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub notes: String,
}
