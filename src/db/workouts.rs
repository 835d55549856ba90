use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::models::{Exercise, Workout, WorkoutDraft, WorkoutSet};

/// Persist a whole workout tree and return the new workout id. The workout,
/// its exercises, and their sets are written inside one transaction, so a
/// failure on any row leaves nothing behind.
pub fn save_workout(conn: &mut Connection, draft: &WorkoutDraft) -> Result<i64> {
    let tx = conn
        .transaction()
        .context("failed to start save transaction")?;
    let id = insert_tree(&tx, draft)?;
    tx.commit().context("failed to commit workout")?;

    info!(id, date = %draft.date, exercises = draft.exercises.len(), "saved workout");
    Ok(id)
}

/// Every workout recorded on `date` with its exercises and sets filled in.
/// Most recently created workouts come first; exercises and sets keep their
/// insertion order.
pub fn list_workouts_by_date(conn: &Connection, date: NaiveDate) -> Result<Vec<Workout>> {
    let mut stmt = conn
        .prepare("SELECT id, date, label FROM workouts WHERE date = ?1 ORDER BY id DESC")
        .context("failed to prepare workout query")?;

    let headers = stmt
        .query_map([date], |row| {
            Ok(Workout {
                id: row.get(0)?,
                date: row.get(1)?,
                label: row.get(2)?,
                exercises: Vec::new(),
            })
        })
        .context("failed to load workouts")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect workouts")?;

    let mut workouts = Vec::with_capacity(headers.len());
    for mut workout in headers {
        workout.exercises = fetch_exercises(conn, workout.id)?;
        workouts.push(workout);
    }

    debug!(%date, count = workouts.len(), "listed workouts");
    Ok(workouts)
}

/// Load a single workout tree, or `None` when the id is unknown.
pub fn fetch_workout(conn: &Connection, id: i64) -> Result<Option<Workout>> {
    let header = conn
        .query_row(
            "SELECT id, date, label FROM workouts WHERE id = ?1",
            [id],
            |row| {
                Ok(Workout {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    label: row.get(2)?,
                    exercises: Vec::new(),
                })
            },
        )
        .optional()
        .context("failed to load workout")?;

    match header {
        Some(mut workout) => {
            workout.exercises = fetch_exercises(conn, workout.id)?;
            Ok(Some(workout))
        }
        None => Ok(None),
    }
}

/// Delete a workout with all of its exercises and sets. Returns whether the
/// workout existed; an unknown id is not an error.
pub fn delete_workout_by_id(conn: &mut Connection, id: i64) -> Result<bool> {
    let tx = conn
        .transaction()
        .context("failed to start delete transaction")?;
    let existed = delete_tree(&tx, id)?;
    tx.commit().context("failed to commit workout deletion")?;

    if existed {
        info!(id, "deleted workout");
    }
    Ok(existed)
}

/// Swap the tree stored under `id` for `draft` in one transaction. The
/// replacement gets a fresh id, which is returned. Nothing is written when
/// `id` does not exist.
pub fn replace_workout(conn: &mut Connection, id: i64, draft: &WorkoutDraft) -> Result<Option<i64>> {
    let tx = conn
        .transaction()
        .context("failed to start replace transaction")?;
    if !delete_tree(&tx, id)? {
        return Ok(None);
    }
    let new_id = insert_tree(&tx, draft)?;
    tx.commit().context("failed to commit workout replacement")?;

    info!(old_id = id, new_id, "replaced workout");
    Ok(Some(new_id))
}

fn insert_tree(conn: &Connection, draft: &WorkoutDraft) -> Result<i64> {
    conn.execute(
        "INSERT INTO workouts (date, label) VALUES (?1, ?2)",
        params![draft.date, draft.label],
    )
    .context("failed to insert workout")?;
    let workout_id = conn.last_insert_rowid();

    let mut insert_exercise = conn
        .prepare("INSERT INTO exercises (workout_id, name) VALUES (?1, ?2)")
        .context("failed to prepare exercise insert")?;
    let mut insert_set = conn
        .prepare("INSERT INTO sets (exercise_id, reps, weight, notes) VALUES (?1, ?2, ?3, ?4)")
        .context("failed to prepare set insert")?;

    for exercise in &draft.exercises {
        let exercise_id = insert_exercise
            .insert(params![workout_id, exercise.name])
            .context("failed to insert exercise")?;

        for set in &exercise.sets {
            insert_set
                .execute(params![exercise_id, set.reps, set.weight, set.notes])
                .context("failed to insert set")?;
        }
    }

    Ok(workout_id)
}

/// Children first: sets, then exercises, then the workout row.
fn delete_tree(conn: &Connection, id: i64) -> Result<bool> {
    conn.execute(
        "DELETE FROM sets WHERE exercise_id IN (SELECT id FROM exercises WHERE workout_id = ?1)",
        [id],
    )
    .context("failed to delete sets")?;
    conn.execute("DELETE FROM exercises WHERE workout_id = ?1", [id])
        .context("failed to delete exercises")?;
    let deleted = conn
        .execute("DELETE FROM workouts WHERE id = ?1", [id])
        .context("failed to delete workout")?;
    Ok(deleted > 0)
}

fn fetch_exercises(conn: &Connection, workout_id: i64) -> Result<Vec<Exercise>> {
    let mut stmt = conn
        .prepare("SELECT id, workout_id, name FROM exercises WHERE workout_id = ?1 ORDER BY id")
        .context("failed to prepare exercise query")?;

    let mut exercises = stmt
        .query_map([workout_id], |row| {
            Ok(Exercise {
                id: row.get(0)?,
                workout_id: row.get(1)?,
                name: row.get(2)?,
                sets: Vec::new(),
            })
        })
        .context("failed to load exercises")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect exercises")?;

    for exercise in &mut exercises {
        exercise.sets = fetch_sets(conn, exercise.id)?;
    }
    Ok(exercises)
}

fn fetch_sets(conn: &Connection, exercise_id: i64) -> Result<Vec<WorkoutSet>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, exercise_id, reps, weight, notes
             FROM sets
             WHERE exercise_id = ?1
             ORDER BY id",
        )
        .context("failed to prepare set query")?;

    let sets = stmt
        .query_map([exercise_id], |row| {
            Ok(WorkoutSet {
                id: row.get(0)?,
                exercise_id: row.get(1)?,
                reps: row.get(2)?,
                weight: row.get(3)?,
                notes: row.get(4)?,
            })
        })
        .context("failed to load sets")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect sets")?;

    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::models::{ExerciseDraft, SetDraft};

    fn memory_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn set(reps: u32, weight: f64, notes: &str) -> SetDraft {
        SetDraft {
            reps,
            weight,
            notes: notes.to_string(),
        }
    }

    fn leg_day(date: NaiveDate) -> WorkoutDraft {
        WorkoutDraft {
            date,
            label: Some("Leg Day".to_string()),
            exercises: vec![
                ExerciseDraft {
                    name: "Squat".to_string(),
                    sets: vec![set(5, 102.5, "belt"), set(5, 107.5, ""), set(3, 112.25, "grind")],
                },
                ExerciseDraft {
                    name: "Lunge".to_string(),
                    sets: vec![set(12, 20.0, "each leg")],
                },
                ExerciseDraft {
                    name: "Stretch".to_string(),
                    sets: Vec::new(),
                },
            ],
        }
    }

    fn row_count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn saved_tree_round_trips_exactly() {
        let mut conn = memory_conn();
        let draft = leg_day(day(25));
        let id = save_workout(&mut conn, &draft).unwrap();

        let listed = list_workouts_by_date(&conn, day(25)).unwrap();
        assert_eq!(listed.len(), 1);
        let workout = &listed[0];
        assert_eq!(workout.id, id);
        assert_eq!(workout.to_draft(), draft);

        let set_counts: Vec<usize> = workout.exercises.iter().map(|e| e.sets.len()).collect();
        assert_eq!(set_counts, vec![3, 1, 0]);
        assert!(workout
            .exercises
            .iter()
            .all(|exercise| exercise.workout_id == id));
    }

    #[test]
    fn workout_without_exercises_is_persisted() {
        let mut conn = memory_conn();
        let id = save_workout(&mut conn, &WorkoutDraft::empty(day(1))).unwrap();
        let listed = list_workouts_by_date(&conn, day(1)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].label, None);
        assert!(listed[0].exercises.is_empty());
    }

    #[test]
    fn listing_is_scoped_to_one_date() {
        let mut conn = memory_conn();
        save_workout(&mut conn, &leg_day(day(24))).unwrap();
        save_workout(&mut conn, &leg_day(day(26))).unwrap();

        assert!(list_workouts_by_date(&conn, day(25)).unwrap().is_empty());
        let listed = list_workouts_by_date(&conn, day(24)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].date, day(24));
    }

    #[test]
    fn newest_workout_is_listed_first() {
        let mut conn = memory_conn();
        let first = save_workout(&mut conn, &WorkoutDraft::empty(day(25))).unwrap();
        let second = save_workout(&mut conn, &leg_day(day(25))).unwrap();
        let third = save_workout(&mut conn, &WorkoutDraft::empty(day(25))).unwrap();

        let ids: Vec<i64> = list_workouts_by_date(&conn, day(25))
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[test]
    fn delete_removes_whole_tree_and_reports_existence() {
        let mut conn = memory_conn();
        let doomed = save_workout(&mut conn, &leg_day(day(25))).unwrap();
        let kept = save_workout(&mut conn, &leg_day(day(25))).unwrap();

        assert!(delete_workout_by_id(&mut conn, doomed).unwrap());
        assert!(!delete_workout_by_id(&mut conn, doomed).unwrap());

        let listed = list_workouts_by_date(&conn, day(25)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, kept);

        let orphans: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM exercises WHERE workout_id = ?1",
                [doomed],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
        assert_eq!(row_count(&conn, "exercises"), 3);
        assert_eq!(row_count(&conn, "sets"), 4);
    }

    #[test]
    fn delete_of_unknown_id_is_not_an_error() {
        let mut conn = memory_conn();
        assert!(!delete_workout_by_id(&mut conn, 404).unwrap());
    }

    #[test]
    fn replace_issues_new_identity() {
        let mut conn = memory_conn();
        let old = save_workout(&mut conn, &leg_day(day(25))).unwrap();

        let mut edited = leg_day(day(25));
        edited.exercises.truncate(1);
        let new = replace_workout(&mut conn, old, &edited).unwrap().unwrap();
        assert_ne!(new, old);

        assert!(fetch_workout(&conn, old).unwrap().is_none());
        let stored = fetch_workout(&conn, new).unwrap().unwrap();
        assert_eq!(stored.to_draft(), edited);
        assert_eq!(row_count(&conn, "workouts"), 1);
        assert_eq!(row_count(&conn, "sets"), 3);
    }

    #[test]
    fn replace_of_unknown_id_writes_nothing() {
        let mut conn = memory_conn();
        assert_eq!(replace_workout(&mut conn, 9, &leg_day(day(25))).unwrap(), None);
        assert_eq!(row_count(&conn, "workouts"), 0);
    }

    #[test]
    fn failed_insert_leaves_no_partial_tree() {
        let mut conn = memory_conn();
        conn.execute_batch(
            "CREATE TRIGGER reject_heavy BEFORE INSERT ON sets
             WHEN NEW.weight > 110 BEGIN SELECT RAISE(ABORT, 'too heavy'); END;",
        )
        .unwrap();

        let err = save_workout(&mut conn, &leg_day(day(25))).unwrap_err();
        assert!(format!("{err:#}").contains("too heavy"));
        assert_eq!(row_count(&conn, "workouts"), 0);
        assert_eq!(row_count(&conn, "exercises"), 0);
        assert_eq!(row_count(&conn, "sets"), 0);
    }
}
