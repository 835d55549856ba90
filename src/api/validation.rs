use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};

use super::error::ApiError;
use crate::models::{ExerciseDraft, SetDraft, Workout, WorkoutDraft, DATE_FORMAT};

/// Whether `raw` has the `YYYY-MM-DD` digit layout. Says nothing about
/// whether the date exists on the calendar.
pub fn is_date_shaped(raw: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"))
        .is_match(raw)
}

/// Parse a request body. Absent, unparseable, and `null` bodies all count as
/// "no data".
pub fn parse_body(body: &[u8]) -> Result<Value, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Null) | Err(_) => Err(ApiError::bad_request("No data provided")),
        Ok(value) => Ok(value),
    }
}

/// Validate a `POST /workouts` payload into a draft.
pub fn validate_new_workout(body: &Value) -> Result<WorkoutDraft, ApiError> {
    let fields = as_object(body)?;
    let date = match fields.get("date") {
        Some(value) => parse_date(value)?,
        None => return Err(ApiError::bad_request("Date is required")),
    };
    let label = parse_label(fields.get("label"))?;
    let exercises = parse_exercises(fields.get("exercises"))?;
    Ok(WorkoutDraft {
        date,
        label,
        exercises,
    })
}

/// A validated `PUT /workouts/{id}` payload. Date and label are optional and
/// fall back to the stored workout; the exercise list always replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutReplacement {
    pub date: Option<NaiveDate>,
    /// `None` keeps the stored label, `Some(None)` clears it.
    pub label: Option<Option<String>>,
    pub exercises: Vec<ExerciseDraft>,
}

impl WorkoutReplacement {
    pub fn into_draft(self, current: &Workout) -> WorkoutDraft {
        WorkoutDraft {
            date: self.date.unwrap_or(current.date),
            label: self.label.unwrap_or_else(|| current.label.clone()),
            exercises: self.exercises,
        }
    }
}

pub fn validate_replacement(body: &Value) -> Result<WorkoutReplacement, ApiError> {
    let fields = as_object(body)?;
    let date = fields.get("date").map(parse_date).transpose()?;
    let label = match fields.get("label") {
        Some(value) => Some(parse_label(Some(value))?),
        None => None,
    };
    let exercises = parse_exercises(fields.get("exercises"))?;
    Ok(WorkoutReplacement {
        date,
        label,
        exercises,
    })
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ApiError> {
    body.as_object()
        .ok_or_else(|| ApiError::bad_request("Request body must be a JSON object"))
}

fn parse_date(value: &Value) -> Result<NaiveDate, ApiError> {
    let invalid = || ApiError::bad_request("Invalid date format");
    let raw = value.as_str().ok_or_else(invalid)?;
    if !is_date_shaped(raw) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| invalid())
}

fn parse_label(value: Option<&Value>) -> Result<Option<String>, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(label)) => Ok(Some(label.clone())),
        Some(_) => Err(ApiError::bad_request("Label must be a string")),
    }
}

fn parse_exercises(value: Option<&Value>) -> Result<Vec<ExerciseDraft>, ApiError> {
    let Some(Value::Array(items)) = value else {
        return Err(ApiError::bad_request("Exercises array is required"));
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| parse_exercise(idx + 1, item))
        .collect()
}

fn parse_exercise(number: usize, item: &Value) -> Result<ExerciseDraft, ApiError> {
    let name = match item.get("name") {
        Some(Value::String(name)) => name.clone(),
        Some(_) => {
            return Err(ApiError::bad_request(format!(
                "Exercise {number} name must be a string"
            )))
        }
        None => {
            return Err(ApiError::bad_request(format!(
                "Exercise {number} missing name"
            )))
        }
    };

    let Some(Value::Array(raw_sets)) = item.get("sets") else {
        return Err(ApiError::bad_request(format!(
            "Exercise {number} has invalid sets"
        )));
    };

    let sets = raw_sets
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            if !raw.is_object() {
                return Err(invalid_set(number, idx + 1));
            }
            let set = serde_json::from_value::<SetDraft>(raw.clone())
                .map_err(|_| invalid_set(number, idx + 1))?;
            // Weight shares the non-negative rule that `u32` already gives reps.
            if !set.weight.is_finite() || set.weight < 0.0 {
                return Err(invalid_set(number, idx + 1));
            }
            Ok(set)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ExerciseDraft { name, sets })
}

fn invalid_set(exercise: usize, set: usize) -> ApiError {
    ApiError::bad_request(format!("Exercise {exercise} set {set} is invalid"))
}
