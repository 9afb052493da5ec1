// SPDX-License-Identifier: MIT

//! Activity sync engine.
//!
//! Pulls a page of Strava activities at or after the sync watermark and
//! reconciles each against stored workouts:
//! 1. Resolve the watermark (last imported date minus one day, or the
//!    configured lookback window on first sync)
//! 2. Fetch the activity list (a failure here aborts the sync)
//! 3. Per activity: filter to runs, dedup against the Strava activity
//!    ID, import new ones with a best-effort detail fetch
//! 4. Stamp `last_sync` and report counts
//!
//! There is no surrounding transaction: every insert stands alone, so a
//! crash mid-loop leaves a partially-synced set that the next sync picks
//! up again (the one-day watermark overlap re-covers the tail).

use crate::db::Db;
use crate::error::AppError;
use crate::models::NewWorkout;
use crate::services::strava::StravaActivity;
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// The only activity type imported; everything else is ignored.
const TRACKED_ACTIVITY_TYPE: &str = "Run";

/// Workout type assigned to every import. No content-based
/// sub-classification (interval vs tempo) is attempted.
const IMPORTED_WORKOUT_TYPE: &str = "easy";

/// Strava has no subjective-effort field, so imports get a fixed one.
const IMPORTED_FEELING: &str = "good";

/// What the sync engine needs from the activity source. `StravaService`
/// is the production implementation; tests substitute a stub.
#[async_trait]
pub trait ActivityProvider: Send + Sync {
    /// List activity summaries starting at or after a Unix timestamp.
    async fn list_activities(
        &self,
        user_id: i64,
        after: i64,
        per_page: u32,
    ) -> Result<Vec<StravaActivity>, AppError>;

    /// Fetch the full detail payload for one activity.
    async fn activity_detail(
        &self,
        user_id: i64,
        activity_id: i64,
    ) -> Result<StravaActivity, AppError>;
}

/// Outcome of importing one new activity.
///
/// The detail fetch is optional enrichment: when it fails the activity
/// is still imported from its summary fields, but callers can tell the
/// two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Imported with the full detail payload cached.
    FullDetail,
    /// Imported from the list summary only; the detail fetch failed.
    SummaryOnly,
}

/// Summary returned by a sync call.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Newly imported workouts
    pub imported: u32,
    /// Activities that already had a local workout
    pub skipped: u32,
    /// Activities returned by Strava, before the run filter
    pub total: u32,
    /// Detail fetches that failed (imports degraded to summary fields,
    /// or backfills of cached detail that did not happen)
    pub detail_fetch_failures: u32,
    pub message: String,
}

/// The sync engine. Cheap to construct per request from shared handles.
pub struct SyncEngine<P: ActivityProvider> {
    db: Db,
    provider: P,
    lookback_days: i64,
    per_page: u32,
}

impl<P: ActivityProvider> SyncEngine<P> {
    pub fn new(db: Db, provider: P, lookback_days: i64, per_page: u32) -> Self {
        Self {
            db,
            provider,
            lookback_days,
            per_page,
        }
    }

    /// Run one synchronization for a user.
    ///
    /// A list-fetch failure aborts the whole attempt; per-activity
    /// failures (detail fetch, insert race) are logged and the loop
    /// continues, so one bad activity never poisons the batch.
    pub async fn sync(&self, user_id: i64) -> Result<SyncReport, AppError> {
        let last_imported = self.db.last_imported_date(user_id).await?;
        let after = resolve_watermark(last_imported.as_deref(), Utc::now(), self.lookback_days);

        tracing::info!(
            user_id,
            after = %format_utc_rfc3339(DateTime::from_timestamp(after, 0).unwrap_or_default()),
            "Syncing Strava activities"
        );

        let activities = self
            .provider
            .list_activities(user_id, after, self.per_page)
            .await?;

        let total = activities.len() as u32;
        let mut imported = 0u32;
        let mut skipped = 0u32;
        let mut detail_fetch_failures = 0u32;

        for activity in &activities {
            if activity.activity_type != TRACKED_ACTIVITY_TYPE {
                continue;
            }

            match self.reconcile_activity(user_id, activity).await {
                Ok(Reconciled::AlreadyPresent { detail_backfilled }) => {
                    skipped += 1;
                    if matches!(detail_backfilled, Some(false)) {
                        detail_fetch_failures += 1;
                    }
                }
                Ok(Reconciled::Imported(ImportOutcome::FullDetail)) => {
                    imported += 1;
                    tracing::info!(user_id, activity_id = activity.id, "Imported activity");
                }
                Ok(Reconciled::Imported(ImportOutcome::SummaryOnly)) => {
                    imported += 1;
                    detail_fetch_failures += 1;
                    tracing::info!(
                        user_id,
                        activity_id = activity.id,
                        "Imported activity (summary fields only)"
                    );
                }
                Err(e) => {
                    // Most likely a uniqueness race with a concurrent
                    // sync inserting the same activity.
                    tracing::warn!(
                        user_id,
                        activity_id = activity.id,
                        error = %e,
                        "Failed to import activity, continuing"
                    );
                }
            }
        }

        // Stamped even when nothing was imported; a failure here does
        // not invalidate the work already done.
        if let Err(e) = self.db.touch_last_sync(user_id).await {
            tracing::warn!(user_id, error = %e, "Failed to update last_sync");
        }

        Ok(SyncReport {
            imported,
            skipped,
            total,
            detail_fetch_failures,
            message: format!("Sync complete: {imported} new, {skipped} already present"),
        })
    }

    /// Reconcile one run activity against local state.
    async fn reconcile_activity(
        &self,
        user_id: i64,
        activity: &StravaActivity,
    ) -> Result<Reconciled, AppError> {
        if let Some(existing) = self
            .db
            .find_workout_by_strava_activity(user_id, activity.id)
            .await?
        {
            // Already imported. Backfill the cached detail payload if an
            // earlier sync did not manage to store one.
            if existing.strava_data.is_some() {
                return Ok(Reconciled::AlreadyPresent {
                    detail_backfilled: None,
                });
            }

            let backfilled = match self.provider.activity_detail(user_id, activity.id).await {
                Ok(detail) => {
                    let json = serde_json::to_string(&detail)
                        .map_err(|e| AppError::Internal(e.into()))?;
                    self.db
                        .update_workout_strava_data(existing.id, &json)
                        .await?;
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        activity_id = activity.id,
                        error = %e,
                        "Detail backfill failed for existing workout"
                    );
                    false
                }
            };

            return Ok(Reconciled::AlreadyPresent {
                detail_backfilled: Some(backfilled),
            });
        }

        // New activity. Detail is optional enrichment; the summary
        // fields are enough to import.
        let detail = match self.provider.activity_detail(user_id, activity.id).await {
            Ok(detail) => Some(detail),
            Err(e) => {
                tracing::warn!(
                    user_id,
                    activity_id = activity.id,
                    error = %e,
                    "Detail fetch failed, importing from summary"
                );
                None
            }
        };

        let workout = workout_from_activity(detail.as_ref().unwrap_or(activity));
        let detail_json = detail
            .as_ref()
            .and_then(|d| serde_json::to_string(d).ok());

        self.db
            .insert_workout(user_id, &workout, Some(activity.id), detail_json.as_deref())
            .await?;

        Ok(Reconciled::Imported(if detail.is_some() {
            ImportOutcome::FullDetail
        } else {
            ImportOutcome::SummaryOnly
        }))
    }
}

/// Result of reconciling one activity.
enum Reconciled {
    /// A workout for this activity already exists. `detail_backfilled`
    /// is `None` when it already had cached detail, otherwise whether
    /// the backfill fetch succeeded.
    AlreadyPresent { detail_backfilled: Option<bool> },
    Imported(ImportOutcome),
}

/// Resolve the lower time bound for the activity list call.
///
/// With prior imports the watermark is the most recent imported start
/// date shifted one day earlier, so clock skew or late-arriving
/// activities are re-covered. Without prior imports (or when the stored
/// date string does not parse) it falls back to the lookback window.
pub fn resolve_watermark(
    last_imported: Option<&str>,
    now: DateTime<Utc>,
    lookback_days: i64,
) -> i64 {
    match last_imported.and_then(|raw| DateTime::parse_from_rfc3339(raw).ok()) {
        Some(last) => (last.with_timezone(&Utc) - Duration::days(1)).timestamp(),
        None => (now - Duration::days(lookback_days)).timestamp(),
    }
}

/// Convert a Strava activity to workout fields.
pub fn workout_from_activity(activity: &StravaActivity) -> NewWorkout {
    NewWorkout {
        date: activity.start_date.clone(),
        workout_type: IMPORTED_WORKOUT_TYPE.to_string(),
        distance_km: activity.distance / 1000.0,
        duration_min: activity.moving_time / 60,
        avg_pace: format_pace(activity.average_speed),
        avg_heart_rate: activity.average_heartrate as i64,
        avg_power: activity.average_watts as i64,
        cadence: activity.average_cadence as i64,
        elevation_gain: activity.total_elevation_gain as i64,
        calories: activity.calories as i64,
        notes: format!("Imported from Strava: {}", activity.name),
        feeling: IMPORTED_FEELING.to_string(),
    }
}

/// Convert an average speed in m/s to a "M:SS" min/km pace string.
/// Zero or negative speed yields an empty string, not an error.
pub fn format_pace(speed_m_s: f64) -> String {
    if speed_m_s <= 0.0 {
        return String::new();
    }

    let pace_min_per_km = 60.0 / (speed_m_s * 3.6);
    let mut minutes = pace_min_per_km as i64;
    let mut seconds = ((pace_min_per_km - minutes as f64) * 60.0).round() as i64;
    if seconds == 60 {
        minutes += 1;
        seconds = 0;
    }

    format!("{minutes}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn activity(id: i64) -> StravaActivity {
        StravaActivity {
            id,
            name: "Morning Run".to_string(),
            activity_type: "Run".to_string(),
            start_date: "2024-05-01T08:00:00Z".to_string(),
            distance: 10000.0,
            moving_time: 3000,
            elapsed_time: 3120,
            total_elevation_gain: 85.4,
            average_speed: 3.0,
            max_speed: 4.2,
            average_heartrate: 152.8,
            max_heartrate: 171.0,
            average_cadence: 170.3,
            average_watts: 280.9,
            calories: 650.2,
        }
    }

    #[test]
    fn test_pace_three_meters_per_second() {
        // 60 / (3.0 * 3.6) = 5.555... min/km -> 5 min 33 sec
        assert_eq!(format_pace(3.0), "5:33");
    }

    #[test]
    fn test_pace_zero_speed_is_empty() {
        assert_eq!(format_pace(0.0), "");
    }

    #[test]
    fn test_pace_seconds_zero_padded() {
        // 60 / (2.0 * 3.6) = 8.333... -> 8:20
        assert_eq!(format_pace(2.0), "8:20");
    }

    #[test]
    fn test_pace_rounding_carries_into_minutes() {
        // 4.9959 min/km: the fractional 59.75 s rounds to 60 and must
        // carry instead of printing "4:60".
        let speed = 60.0 / (4.9959 * 3.6);
        assert_eq!(format_pace(speed), "5:00");
    }

    #[test]
    fn test_conversion_units() {
        let workout = workout_from_activity(&activity(1));

        assert_eq!(workout.distance_km, 10.0);
        assert_eq!(workout.duration_min, 50);
        assert_eq!(workout.avg_pace, "5:33");
        assert_eq!(workout.avg_heart_rate, 152); // truncated, not rounded
        assert_eq!(workout.avg_power, 280);
        assert_eq!(workout.cadence, 170);
        assert_eq!(workout.elevation_gain, 85);
        assert_eq!(workout.calories, 650);
        assert_eq!(workout.workout_type, "easy");
        assert_eq!(workout.feeling, "good");
        assert_eq!(workout.notes, "Imported from Strava: Morning Run");
    }

    #[test]
    fn test_conversion_absent_metrics_default_to_zero() {
        let mut sparse = activity(2);
        sparse.average_heartrate = 0.0;
        sparse.average_watts = 0.0;
        sparse.average_speed = 0.0;
        sparse.calories = 0.0;

        let workout = workout_from_activity(&sparse);

        assert_eq!(workout.avg_heart_rate, 0);
        assert_eq!(workout.avg_power, 0);
        assert_eq!(workout.calories, 0);
        assert_eq!(workout.avg_pace, "");
    }

    #[test]
    fn test_duration_truncates_to_whole_minutes() {
        let mut a = activity(3);
        a.moving_time = 3599;
        assert_eq!(workout_from_activity(&a).duration_min, 59);
    }

    #[test]
    fn test_watermark_first_sync_uses_lookback() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let expected = (now - Duration::days(180)).timestamp();
        assert_eq!(resolve_watermark(None, now, 180), expected);
    }

    #[test]
    fn test_watermark_shifts_last_import_one_day_back() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let after = resolve_watermark(Some("2024-05-20T09:30:00Z"), now, 180);
        let expected = Utc
            .with_ymd_and_hms(2024, 5, 19, 9, 30, 0)
            .unwrap()
            .timestamp();
        assert_eq!(after, expected);
    }

    #[test]
    fn test_watermark_unparseable_date_falls_back() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let expected = (now - Duration::days(30)).timestamp();
        assert_eq!(resolve_watermark(Some("not-a-date"), now, 30), expected);
    }

    #[test]
    fn test_watermark_respects_configured_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(
            resolve_watermark(None, now, 30),
            (now - Duration::days(30)).timestamp()
        );
        assert_eq!(
            resolve_watermark(None, now, 180),
            (now - Duration::days(180)).timestamp()
        );
    }
}
