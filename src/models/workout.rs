// SPDX-License-Identifier: MIT

//! Workout model for storage and API.

use serde::{Deserialize, Serialize};

/// Stored workout record.
///
/// Manually entered workouts have `strava_activity_id = NULL`; imported
/// ones carry the Strava activity ID (unique across all workouts) and,
/// when the detail fetch succeeded, the raw detail payload.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workout {
    pub id: i64,
    pub user_id: i64,
    /// Start date/time (ISO 8601)
    pub date: String,
    /// easy, interval, tempo, long_run or race
    pub workout_type: String,
    /// Distance in kilometers
    pub distance_km: f64,
    /// Duration in whole minutes
    pub duration_min: i64,
    /// Average pace as "M:SS" per km; empty when unknown
    pub avg_pace: String,
    /// Average heart rate in bpm (0 when absent)
    pub avg_heart_rate: i64,
    /// Average power in watts (0 when absent)
    pub avg_power: i64,
    /// Cadence in steps per minute (0 when absent)
    pub cadence: i64,
    /// Elevation gain in meters (0 when absent)
    pub elevation_gain: i64,
    pub calories: i64,
    pub notes: String,
    /// great, good, ok, tired or exhausted
    pub feeling: String,
    /// Strava activity ID this workout was imported from, if any
    pub strava_activity_id: Option<i64>,
    /// Cached raw Strava detail payload (JSON), if the detail fetch succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strava_data: Option<String>,
    /// When this row was created (ISO 8601)
    pub created_at: String,
}

/// Fields for creating a workout, either from the API or from a
/// converted Strava activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkout {
    pub date: String,
    pub workout_type: String,
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub duration_min: i64,
    #[serde(default)]
    pub avg_pace: String,
    #[serde(default)]
    pub avg_heart_rate: i64,
    #[serde(default)]
    pub avg_power: i64,
    #[serde(default)]
    pub cadence: i64,
    #[serde(default)]
    pub elevation_gain: i64,
    #[serde(default)]
    pub calories: i64,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_feeling")]
    pub feeling: String,
}

fn default_feeling() -> String {
    "good".to_string()
}
