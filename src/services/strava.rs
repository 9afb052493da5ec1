// SPDX-License-Identifier: MIT

//! Strava API client and token lifecycle management.
//!
//! Handles:
//! - OAuth code exchange and credential storage
//! - Token refresh when expired, serialized per user
//! - Activity list and detail fetching

use crate::db::Db;
use crate::error::AppError;
use crate::services::sync::ActivityProvider;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Timeout applied to every outbound Strava call. A slow provider
/// response blocks the calling request until this elapses; there is no
/// retry.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://www.strava.com/api/v3".to_string(),
            token_url: "https://www.strava.com/oauth/token".to_string(),
            client_id,
            client_secret,
        }
    }

    /// Exchange a one-time authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .timeout(REQUEST_TIMEOUT)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalAuth(format!("Token exchange failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token exchange failed");
            return Err(AppError::ExternalAuth(body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalAuth(format!("Failed to parse token response: {e}")))
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .timeout(REQUEST_TIMEOUT)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalAuth(format!("Token refresh request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token refresh failed");
            return Err(AppError::ExternalAuth(body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalAuth(format!("Failed to parse refresh response: {e}")))
    }

    /// List activity summaries starting at or after a Unix timestamp.
    pub async fn list_activities(
        &self,
        access_token: &str,
        after: i64,
        per_page: u32,
    ) -> Result<Vec<StravaActivity>, AppError> {
        let url = format!("{}/athlete/activities", self.base_url);

        let response = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(access_token)
            .query(&[
                ("after", after.to_string()),
                ("per_page", per_page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Get a single activity with full detail fields.
    pub async fn get_activity(
        &self,
        access_token: &str,
        activity_id: i64,
    ) -> Result<StravaActivity, AppError> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);

        let response = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StravaApi(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {e}")))
    }
}

/// Activity as returned by Strava. The list endpoint omits some fields
/// (notably calories), so everything numeric defaults to zero; the
/// detail endpoint fills in the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StravaActivity {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Run, Ride, Hike, ...
    #[serde(rename = "type", default)]
    pub activity_type: String,
    /// Start date/time (ISO 8601)
    pub start_date: String,
    /// Distance in meters
    #[serde(default)]
    pub distance: f64,
    /// Moving time in seconds
    #[serde(default)]
    pub moving_time: i64,
    /// Elapsed time in seconds
    #[serde(default)]
    pub elapsed_time: i64,
    /// Elevation gain in meters
    #[serde(default)]
    pub total_elevation_gain: f64,
    /// Average speed in m/s
    #[serde(default)]
    pub average_speed: f64,
    /// Max speed in m/s
    #[serde(default)]
    pub max_speed: f64,
    /// Average heart rate in bpm
    #[serde(default)]
    pub average_heartrate: f64,
    /// Max heart rate in bpm
    #[serde(default)]
    pub max_heartrate: f64,
    /// Average cadence in steps per minute
    #[serde(default)]
    pub average_cadence: f64,
    /// Average power in watts
    #[serde(default)]
    pub average_watts: f64,
    #[serde(default)]
    pub calories: f64,
}

/// Token exchange response from Strava OAuth (includes athlete info).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub athlete: StravaAthlete,
}

/// Athlete info from OAuth token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    pub id: i64,
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaService - High-level service with token management
// ─────────────────────────────────────────────────────────────────────────────

/// Shared refresh locks type.
pub type RefreshLocks = Arc<DashMap<i64, Arc<Mutex<()>>>>;

/// Whether the stored token must be refreshed before use.
fn needs_refresh(expires_at: i64, now: i64) -> bool {
    now >= expires_at
}

/// High-level Strava service that manages the token lifecycle.
///
/// Encapsulates:
/// - Credential retrieval from the database
/// - Token refresh when expired, with per-user locking so concurrent
///   requests perform at most one refresh call
/// - OAuth callback handling (code exchange + credential upsert)
/// - Authenticated Strava API calls
#[derive(Clone)]
pub struct StravaService {
    client: StravaClient,
    db: Db,
    /// Per-user mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
}

impl StravaService {
    /// Create a new Strava service. Clones share the refresh locks.
    pub fn new(client_id: String, client_secret: String, db: Db) -> Self {
        Self {
            client: StravaClient::new(client_id, client_secret),
            db,
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    /// Handle the OAuth callback: exchange the code and upsert the
    /// credential record for the user. A credential upsert failure here
    /// is fatal to the connect operation.
    pub async fn handle_callback(&self, user_id: i64, code: &str) -> Result<(), AppError> {
        let token_response = self.client.exchange_code(code).await?;

        self.db
            .upsert_strava_tokens(
                user_id,
                &token_response.access_token,
                &token_response.refresh_token,
                token_response.expires_at,
                token_response.athlete.id,
            )
            .await?;

        tracing::info!(
            user_id,
            athlete_id = token_response.athlete.id,
            "Strava connected, tokens stored"
        );

        Ok(())
    }

    /// Get a valid (non-expired) access token for the given user,
    /// refreshing with Strava first when the stored one has expired.
    ///
    /// The refresh path is serialized per user: waiters re-read the
    /// credential after acquiring the lock, so whichever request wins
    /// refreshes once and the rest reuse its result.
    pub async fn valid_access_token(&self, user_id: i64) -> Result<String, AppError> {
        let tokens = self
            .db
            .get_strava_tokens(user_id)
            .await?
            .ok_or(AppError::NotConnected)?;

        if !needs_refresh(tokens.expires_at, Utc::now().timestamp()) {
            return Ok(tokens.access_token);
        }

        let lock = self
            .refresh_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _guard = lock.lock().await;

        // Re-read after acquiring the lock: another request may have
        // refreshed while we were waiting.
        let tokens = self
            .db
            .get_strava_tokens(user_id)
            .await?
            .ok_or(AppError::NotConnected)?;

        if !needs_refresh(tokens.expires_at, Utc::now().timestamp()) {
            return Ok(tokens.access_token);
        }

        tracing::info!(user_id, "Access token expired, refreshing");

        let refreshed = self.client.refresh_token(&tokens.refresh_token).await?;

        self.db
            .update_strava_tokens(
                user_id,
                &refreshed.access_token,
                &refreshed.refresh_token,
                refreshed.expires_at,
            )
            .await?;

        Ok(refreshed.access_token)
    }
}

#[async_trait]
impl ActivityProvider for StravaService {
    /// List activities for a user. The token is validated (and refreshed
    /// if needed) before the data call goes out.
    async fn list_activities(
        &self,
        user_id: i64,
        after: i64,
        per_page: u32,
    ) -> Result<Vec<StravaActivity>, AppError> {
        let access_token = self.valid_access_token(user_id).await?;
        self.client
            .list_activities(&access_token, after, per_page)
            .await
    }

    async fn activity_detail(
        &self,
        user_id: i64,
        activity_id: i64,
    ) -> Result<StravaActivity, AppError> {
        let access_token = self.valid_access_token(user_id).await?;
        self.client.get_activity(&access_token, activity_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_refresh_when_expired() {
        assert!(needs_refresh(1000, 2000));
    }

    #[test]
    fn test_needs_refresh_at_exact_expiry() {
        // Expiry is inclusive: a token at exactly expires_at is stale.
        assert!(needs_refresh(1000, 1000));
    }

    #[test]
    fn test_no_refresh_while_valid() {
        assert!(!needs_refresh(2000, 1000));
    }

    #[test]
    fn test_activity_deserializes_with_sparse_fields() {
        // The list endpoint omits calories and heart rate entirely for
        // some activities; those must default to zero, not fail.
        let json = r#"{"id": 123, "name": "Morning Run", "type": "Run",
                       "start_date": "2024-05-01T08:00:00Z", "distance": 8012.5,
                       "moving_time": 2400}"#;
        let activity: StravaActivity = serde_json::from_str(json).unwrap();

        assert_eq!(activity.id, 123);
        assert_eq!(activity.activity_type, "Run");
        assert_eq!(activity.calories, 0.0);
        assert_eq!(activity.average_heartrate, 0.0);
        assert_eq!(activity.moving_time, 2400);
    }
}
