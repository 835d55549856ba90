//! Workout logger: a SQLite-backed log of dated workouts, each a tree of
//! exercises and sets, reachable from a terminal form and a JSON REST API.
pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod ui;

pub use db::{
    delete_workout_by_id, fetch_workout, list_workouts_by_date, replace_workout, save_workout,
    Database,
};

pub use models::{Exercise, ExerciseDraft, SetDraft, Workout, WorkoutDraft, WorkoutSet};

pub use ui::{run_app, App};
