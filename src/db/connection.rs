use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::Connection;
use tracing::debug;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".workout-logger";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "workouts.sqlite";

/// Handle to the on-disk store. It owns only the path; every caller asks for
/// its own connection and drops it when done, so nothing holds a process-wide
/// handle.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Create the parent directory if needed, make sure the schema exists, and
    /// return a handle ready to hand out connections.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("failed to create data directory")?;
            }
        }

        let database = Self { path };
        let conn = database.connect()?;
        init_schema(&conn)?;
        debug!(path = %database.path.display(), "database ready");
        Ok(database)
    }

    /// Open a fresh connection with foreign keys enforced.
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).context("failed to open SQLite database")?;
        conn.execute("PRAGMA foreign_keys = ON", [])
            .context("failed to enable foreign keys")?;
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Idempotently create the three tables and their lookup indexes. The
/// references are declared without `ON DELETE CASCADE`: the persistence
/// functions delete children explicitly, and the enforced keys make an
/// out-of-order delete fail instead of leaving orphans.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS workouts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            label TEXT
        )",
        [],
    )
    .context("failed to create workouts table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS exercises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workout_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            FOREIGN KEY(workout_id) REFERENCES workouts(id)
        )",
        [],
    )
    .context("failed to create exercises table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            exercise_id INTEGER NOT NULL,
            reps INTEGER NOT NULL DEFAULT 0,
            weight REAL NOT NULL DEFAULT 0,
            notes TEXT NOT NULL DEFAULT '',
            FOREIGN KEY(exercise_id) REFERENCES exercises(id)
        )",
        [],
    )
    .context("failed to create sets table")?;

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_workouts_date ON workouts(date);
         CREATE INDEX IF NOT EXISTS idx_exercises_workout ON exercises(workout_id);
         CREATE INDEX IF NOT EXISTS idx_sets_exercise ON sets(exercise_id);",
    )
    .context("failed to create lookup indexes")?;

    Ok(())
}

/// Resolve the default database location inside the user's home.
pub fn default_db_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(DB_FILE_NAME))
}

/// Directory holding the database and the terminal session log.
pub fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}
