// SPDX-License-Identifier: MIT

use std::sync::Arc;
use stride_coach::config::Config;
use stride_coach::db::users::ProfileFields;
use stride_coach::db::Db;
use stride_coach::routes::create_router;
use stride_coach::services::{CoachClient, CoachService, StravaService};
use stride_coach::AppState;

/// Create a fresh in-memory test database.
#[allow(dead_code)]
pub async fn test_db() -> Db {
    Db::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database")
}

/// Insert a test user and return its ID.
#[allow(dead_code)]
pub async fn seed_user(db: &Db, email: &str) -> i64 {
    let profile = ProfileFields {
        name: "Test Runner".to_string(),
        age: 33,
        weight_kg: 72.0,
        height_cm: 180.0,
        fitness_level: "advanced".to_string(),
    };
    db.create_user(email, "not-a-real-hash", &profile)
        .await
        .expect("Failed to seed user")
        .id
}

/// Create a test app backed by an in-memory database. The Strava and
/// coach services are wired with test credentials and never reach the
/// network unless a test drives them there.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let db = test_db().await;

    let strava = StravaService::new(
        config.strava_client_id.clone(),
        config.strava_client_secret.clone(),
        db.clone(),
    );

    let coach_client = CoachClient::new(
        config.coach_base_url.clone(),
        config.coach_api_key.clone(),
        config.coach_model.clone(),
    );
    let coach = CoachService::new(coach_client, db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        strava,
        coach,
    });

    (create_router(state.clone()), state)
}
