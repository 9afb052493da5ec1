// SPDX-License-Identifier: MIT

//! API routes for authenticated users: profile, workouts and coach
//! operations.

use crate::db::users::ProfileFields;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{NewWorkout, User, Workout};
use crate::time_utils::{format_utc_rfc3339, now_rfc3339};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/workouts", get(list_workouts).post(create_workout))
        .route(
            "/api/workouts/{id}",
            get(get_workout).delete(delete_workout),
        )
        .route("/api/workouts/{id}/analysis", post(analyze_workout))
        .route("/api/plans", post(create_plan))
        .route("/api/plans/weekly", post(weekly_plan))
        .route("/api/reports", post(progress_report))
}

// ─── Profile ─────────────────────────────────────────────────

/// Get the current user's profile.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>> {
    let profile = state
        .db
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user.user_id)))?;

    Ok(Json(profile))
}

#[derive(Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[serde(default)]
    age: i64,
    #[serde(default)]
    weight_kg: f64,
    #[serde(default)]
    height_cm: f64,
    fitness_level: String,
}

/// Update the current user's profile.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let profile = ProfileFields {
        name: req.name,
        age: req.age,
        weight_kg: req.weight_kg,
        height_cm: req.height_cm,
        fitness_level: req.fitness_level,
    };

    state.db.update_profile(user.user_id, &profile).await?;

    let updated = state
        .db
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user.user_id)))?;

    Ok(Json(updated))
}

// ─── Workouts ────────────────────────────────────────────────

/// List the user's workouts, most recent first.
async fn list_workouts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Workout>>> {
    let workouts = state.db.list_workouts(user.user_id).await?;
    Ok(Json(workouts))
}

/// Create a manually-entered workout.
async fn create_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(workout): Json<NewWorkout>,
) -> Result<Json<Workout>> {
    if chrono::DateTime::parse_from_rfc3339(&workout.date).is_err() {
        return Err(AppError::BadRequest(
            "Invalid 'date': must be RFC3339 datetime".to_string(),
        ));
    }

    let id = state
        .db
        .insert_workout(user.user_id, &workout, None, None)
        .await?;

    let created = state
        .db
        .get_workout(user.user_id, id)
        .await?
        .ok_or_else(|| AppError::Database("Workout vanished after insert".to_string()))?;

    Ok(Json(created))
}

#[derive(Serialize)]
pub struct WorkoutDetailResponse {
    pub workout: Workout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<crate::models::WorkoutAnalysis>,
}

/// Get one workout, including the cached Strava detail payload and the
/// coach analysis when present.
async fn get_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<WorkoutDetailResponse>> {
    let workout = state
        .db
        .get_workout(user.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Workout {id}")))?;

    let analysis = state.db.get_workout_analysis(workout.id).await?;

    Ok(Json(WorkoutDetailResponse { workout, analysis }))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// Delete a workout.
async fn delete_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>> {
    let deleted = state.db.delete_workout(user.user_id, id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Workout {id}")));
    }

    Ok(Json(DeleteResponse { success: true }))
}

// ─── Coach ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreatePlanRequest {
    goal: String,
}

#[derive(Serialize)]
pub struct PlanResponse {
    pub id: i64,
    pub plan: String,
}

/// Default training-plan horizon: three months.
const PLAN_HORIZON_DAYS: i64 = 90;

/// Ask the coach for a training plan and store it.
async fn create_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreatePlanRequest>,
) -> Result<Json<PlanResponse>> {
    let profile = state
        .db
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user.user_id)))?;

    let plan = state.coach.create_training_plan(&profile, &req.goal).await?;

    let start = now_rfc3339();
    let end = format_utc_rfc3339(chrono::Utc::now() + chrono::Duration::days(PLAN_HORIZON_DAYS));
    let id = state
        .db
        .insert_training_plan(user.user_id, &req.goal, &start, &end, &plan)
        .await?;

    Ok(Json(PlanResponse { id, plan }))
}

#[derive(Deserialize, Default)]
pub struct WeeklyPlanRequest {
    #[serde(default)]
    question: Option<String>,
}

#[derive(Serialize)]
pub struct WeeklyPlanResponse {
    pub plan: String,
}

/// Weekly plan, or a follow-up question in the ongoing conversation.
async fn weekly_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<WeeklyPlanRequest>,
) -> Result<Json<WeeklyPlanResponse>> {
    let plan = state
        .coach
        .weekly_plan(user.user_id, req.question.as_deref())
        .await?;

    Ok(Json(WeeklyPlanResponse { plan }))
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    pub id: i64,
    pub analysis: String,
}

/// Ask the coach to analyze a workout and store the analysis.
async fn analyze_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<AnalysisResponse>> {
    let workout = state
        .db
        .get_workout(user.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Workout {id}")))?;

    let analysis = state.coach.analyze_workout(user.user_id, &workout).await?;

    state
        .db
        .insert_workout_analysis(workout.id, &analysis, "")
        .await?;

    Ok(Json(AnalysisResponse { id, analysis }))
}

#[derive(Deserialize)]
pub struct ProgressReportRequest {
    period_start: String,
    period_end: String,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub id: i64,
    pub report: String,
}

/// Ask the coach for a progress report over a period and store it.
async fn progress_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ProgressReportRequest>,
) -> Result<Json<ReportResponse>> {
    for raw in [&req.period_start, &req.period_end] {
        if chrono::DateTime::parse_from_rfc3339(raw).is_err() {
            return Err(AppError::BadRequest(
                "Invalid period bound: must be RFC3339 datetime".to_string(),
            ));
        }
    }

    // Stored dates are uniform RFC3339 UTC, so the range filter can
    // compare lexicographically.
    let workouts: Vec<_> = state
        .db
        .list_workouts(user.user_id)
        .await?
        .into_iter()
        .filter(|w| w.date.as_str() >= req.period_start.as_str() && w.date.as_str() <= req.period_end.as_str())
        .collect();

    let period = format!("{} to {}", req.period_start, req.period_end);
    let report = state
        .coach
        .progress_report(user.user_id, &period, &workouts)
        .await?;

    let id = state
        .db
        .insert_progress_report(user.user_id, &req.period_start, &req.period_end, &report)
        .await?;

    Ok(Json(ReportResponse { id, report }))
}
