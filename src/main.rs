// SPDX-License-Identifier: MIT

//! stride-coach API Server
//!
//! Tracks running workouts, imports activity history from Strava and
//! delegates training intelligence to a chat-completion coach.

use std::sync::Arc;
use stride_coach::{
    config::Config,
    db::Db,
    services::{CoachClient, CoachService, StravaService},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting stride-coach API");

    // Open and migrate the database
    let db = Db::connect(&config.database_url)
        .await
        .expect("Failed to open database");

    // Initialize Strava service (token lifecycle + API calls)
    let strava = StravaService::new(
        config.strava_client_id.clone(),
        config.strava_client_secret.clone(),
        db.clone(),
    );

    // Initialize coach service
    let coach_client = CoachClient::new(
        config.coach_base_url.clone(),
        config.coach_api_key.clone(),
        config.coach_model.clone(),
    );
    let coach = CoachService::new(coach_client, db.clone());
    tracing::info!(model = %config.coach_model, "Coach service initialized");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        strava,
        coach,
    });

    // Build router
    let app = stride_coach::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stride_coach=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
