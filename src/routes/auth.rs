// SPDX-License-Identifier: MIT

//! Registration and login routes.

use crate::db::users::ProfileFields;
use crate::error::{AppError, Result};
use crate::middleware::auth::create_jwt;
use crate::models::User;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    password: String,
    #[serde(default)]
    age: i64,
    #[serde(default)]
    weight_kg: f64,
    #[serde(default)]
    height_cm: f64,
    #[serde(default = "default_fitness_level")]
    fitness_level: String,
}

fn default_fitness_level() -> String {
    "beginner".to_string()
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Create an account and return a session token.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {e}")))?;

    let profile = ProfileFields {
        name: req.name,
        age: req.age,
        weight_kg: req.weight_kg,
        height_cm: req.height_cm,
        fitness_level: req.fitness_level,
    };

    let user = match state
        .db
        .create_user(&req.email, &password_hash, &profile)
        .await
    {
        Ok(user) => user,
        Err(AppError::Database(msg)) if msg.contains("UNIQUE") => {
            return Err(AppError::BadRequest("Email already registered".to_string()));
        }
        Err(e) => return Err(e),
    };

    tracing::info!(user_id = user.id, "User registered");

    let token = create_jwt(user.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {e}")))?;

    Ok(Json(AuthResponse { token, user }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// Verify credentials and return a session token.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = state
        .db
        .get_user_by_email(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let valid = bcrypt::verify(&req.password, &user.password_hash).unwrap_or(false);
    if !valid {
        return Err(AppError::Unauthorized);
    }

    let token = create_jwt(user.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {e}")))?;

    Ok(Json(AuthResponse { token, user }))
}
