//! User model and linked Strava credential record.

use serde::{Deserialize, Serialize};

/// Application user stored in SQLite.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Email address (unique, used for login)
    pub email: String,
    /// bcrypt hash, never serialized out
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub age: i64,
    /// Weight in kg
    pub weight_kg: f64,
    /// Height in cm
    pub height_cm: f64,
    /// beginner, intermediate or advanced
    pub fitness_level: String,
    /// When the account was created (ISO 8601)
    pub created_at: String,
    /// Last profile update (ISO 8601)
    pub updated_at: String,
}

/// Stored OAuth token set for a user's linked Strava account.
///
/// At most one row per user; replaced wholesale on every token refresh.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StravaTokens {
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry as Unix epoch seconds
    pub expires_at: i64,
    /// Strava athlete ID for this account
    pub athlete_id: i64,
    /// When the last activity sync completed (ISO 8601), if ever
    pub last_sync: Option<String>,
}
