// SPDX-License-Identifier: MIT

//! Strava credential record: one OAuth token set per user.

use super::Db;
use crate::error::AppError;
use crate::models::StravaTokens;
use crate::time_utils::now_rfc3339;

impl Db {
    /// Insert or replace the credential record for a user.
    ///
    /// Called on every successful authorization; overwrites all token
    /// fields and bumps `updated_at`, preserving `last_sync`.
    pub async fn upsert_strava_tokens(
        &self,
        user_id: i64,
        access_token: &str,
        refresh_token: &str,
        expires_at: i64,
        athlete_id: i64,
    ) -> Result<(), AppError> {
        let now = now_rfc3339();
        sqlx::query(
            r"INSERT INTO strava_tokens (user_id, access_token, refresh_token, expires_at, athlete_id, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?)
              ON CONFLICT(user_id) DO UPDATE SET
                  access_token = excluded.access_token,
                  refresh_token = excluded.refresh_token,
                  expires_at = excluded.expires_at,
                  athlete_id = excluded.athlete_id,
                  updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .bind(athlete_id)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Read the credential record for a user.
    pub async fn get_strava_tokens(&self, user_id: i64) -> Result<Option<StravaTokens>, AppError> {
        let tokens = sqlx::query_as::<_, StravaTokens>(
            "SELECT user_id, access_token, refresh_token, expires_at, athlete_id, last_sync
             FROM strava_tokens WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(tokens)
    }

    /// Replace the token fields after a refresh.
    pub async fn update_strava_tokens(
        &self,
        user_id: i64,
        access_token: &str,
        refresh_token: &str,
        expires_at: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r"UPDATE strava_tokens
              SET access_token = ?, refresh_token = ?, expires_at = ?, updated_at = ?
              WHERE user_id = ?",
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .bind(now_rfc3339())
        .bind(user_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Record that a sync completed now. Runs unconditionally at the end
    /// of every sync, even when nothing was imported.
    pub async fn touch_last_sync(&self, user_id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE strava_tokens SET last_sync = ? WHERE user_id = ?")
            .bind(now_rfc3339())
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
