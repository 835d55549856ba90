//! Persistence module split across logical submodules.

mod connection;
mod workouts;

pub use connection::{data_dir, default_db_path, init_schema, Database};
pub use workouts::{
    delete_workout_by_id, fetch_workout, list_workouts_by_date, replace_workout, save_workout,
};
