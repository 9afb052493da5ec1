// SPDX-License-Identifier: MIT

//! Workout queries, including the Strava dedup lookups used by the
//! sync engine.

use super::Db;
use crate::error::AppError;
use crate::models::{NewWorkout, Workout};
use crate::time_utils::now_rfc3339;

impl Db {
    /// Insert a workout. `strava_activity_id` and `strava_data` are set
    /// only for imported workouts.
    ///
    /// The UNIQUE constraint on `strava_activity_id` is the dedup key: a
    /// concurrent sync inserting the same activity makes this fail, which
    /// the sync loop treats as non-fatal.
    pub async fn insert_workout(
        &self,
        user_id: i64,
        workout: &NewWorkout,
        strava_activity_id: Option<i64>,
        strava_data: Option<&str>,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            r"INSERT INTO workouts (user_id, date, workout_type, distance_km, duration_min, avg_pace,
                                    avg_heart_rate, avg_power, cadence, elevation_gain, calories,
                                    notes, feeling, strava_activity_id, strava_data, created_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&workout.date)
        .bind(&workout.workout_type)
        .bind(workout.distance_km)
        .bind(workout.duration_min)
        .bind(&workout.avg_pace)
        .bind(workout.avg_heart_rate)
        .bind(workout.avg_power)
        .bind(workout.cadence)
        .bind(workout.elevation_gain)
        .bind(workout.calories)
        .bind(&workout.notes)
        .bind(&workout.feeling)
        .bind(strava_activity_id)
        .bind(strava_data)
        .bind(now_rfc3339())
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// List a user's workouts, most recent first. The cached Strava
    /// detail blob is left out of list rows; it is only surfaced on the
    /// single-workout lookup.
    pub async fn list_workouts(&self, user_id: i64) -> Result<Vec<Workout>, AppError> {
        let workouts = sqlx::query_as::<_, Workout>(
            r"SELECT id, user_id, date, workout_type, distance_km, duration_min, avg_pace,
                     avg_heart_rate, avg_power, cadence, elevation_gain, calories,
                     notes, feeling, strava_activity_id, NULL AS strava_data, created_at
              FROM workouts WHERE user_id = ? ORDER BY date DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(workouts)
    }

    /// Get one workout, scoped to its owner.
    pub async fn get_workout(&self, user_id: i64, id: i64) -> Result<Option<Workout>, AppError> {
        let workout =
            sqlx::query_as::<_, Workout>("SELECT * FROM workouts WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(workout)
    }

    /// Delete a workout. Returns whether a row was removed.
    pub async fn delete_workout(&self, user_id: i64, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM workouts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find the workout a Strava activity was imported into, if any.
    /// Scoped by owner in addition to the globally-unique activity ID.
    pub async fn find_workout_by_strava_activity(
        &self,
        user_id: i64,
        strava_activity_id: i64,
    ) -> Result<Option<Workout>, AppError> {
        let workout = sqlx::query_as::<_, Workout>(
            "SELECT * FROM workouts WHERE user_id = ? AND strava_activity_id = ?",
        )
        .bind(user_id)
        .bind(strava_activity_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(workout)
    }

    /// Attach (or replace) the cached Strava detail payload on a workout.
    pub async fn update_workout_strava_data(
        &self,
        workout_id: i64,
        strava_data: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE workouts SET strava_data = ? WHERE id = ?")
            .bind(strava_data)
            .bind(workout_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Start date of the most recently dated imported workout, as the raw
    /// stored string. `None` when the user has no imported workouts yet.
    pub async fn last_imported_date(&self, user_id: i64) -> Result<Option<String>, AppError> {
        let date: Option<String> = sqlx::query_scalar(
            "SELECT MAX(date) FROM workouts WHERE user_id = ? AND strava_activity_id IS NOT NULL",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;
        Ok(date)
    }
}
