// SPDX-License-Identifier: MIT

//! Strava connect, OAuth callback, sync and status routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::{SyncEngine, SyncReport};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Routes behind the auth middleware.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/strava/connect", get(connect))
        .route("/api/strava/sync", post(sync_now))
        .route("/api/strava/status", get(status))
}

/// Public routes: the OAuth callback carries no session, the initiating
/// user is recovered from the signed state parameter.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/strava/callback", get(callback))
}

/// Start the OAuth flow - redirect to Strava authorization.
async fn connect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: axum::http::HeaderMap,
) -> Result<Redirect> {
    let oauth_state = sign_state(user.user_id, &state.config.oauth_state_key)?;
    let callback_url = format!("{}/api/strava/callback", request_base_url(&headers));

    let auth_url = format!(
        "https://www.strava.com/oauth/authorize?\
         client_id={}&\
         redirect_uri={}&\
         response_type=code&\
         scope=activity:read_all,profile:read_all&\
         state={}",
        state.config.strava_client_id,
        urlencoding::encode(&callback_url),
        oauth_state
    );

    tracing::info!(user_id = user.user_id, "Starting Strava OAuth flow");

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens, store the credential
/// record and bounce back to the frontend.
async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let frontend_url = &state.config.frontend_url;

    let Some(user_id) = verify_state(&params.state, &state.config.oauth_state_key) else {
        tracing::warn!("Invalid or tampered OAuth state parameter");
        return Err(AppError::BadRequest("Invalid state parameter".to_string()));
    };

    if let Some(error) = params.error {
        tracing::warn!(user_id, error = %error, "OAuth error from Strava");
        let redirect = format!("{frontend_url}/?strava=error&reason={error}");
        return Ok(Redirect::temporary(&redirect));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    state.strava.handle_callback(user_id, &code).await?;

    Ok(Redirect::temporary(&format!(
        "{frontend_url}/?strava=connected"
    )))
}

/// Trigger a synchronization now. Blocks until the page is processed.
async fn sync_now(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SyncReport>> {
    let engine = SyncEngine::new(
        state.db.clone(),
        state.strava.clone(),
        state.config.sync_lookback_days,
        state.config.sync_page_size,
    );

    let report = engine.sync(user.user_id).await?;

    tracing::info!(
        user_id = user.user_id,
        imported = report.imported,
        skipped = report.skipped,
        total = report.total,
        "Strava sync finished"
    );

    Ok(Json(report))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub athlete_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
}

/// Report whether the user's Strava account is connected.
async fn status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StatusResponse>> {
    let response = match state.db.get_strava_tokens(user.user_id).await? {
        Some(tokens) => StatusResponse {
            connected: true,
            athlete_id: Some(tokens.athlete_id),
            last_sync: tokens.last_sync,
        },
        None => StatusResponse {
            connected: false,
            athlete_id: None,
            last_sync: None,
        },
    };

    Ok(Json(response))
}

/// Derive the externally-visible base URL from the Host header.
fn request_base_url(headers: &axum::http::HeaderMap) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:8080");

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    format!("{scheme}://{host}")
}

/// Sign the initiating user's identity into the OAuth state parameter:
/// "user_id|timestamp_hex|signature_hex", base64url-encoded. The
/// callback can then be matched back to the user without server-side
/// session state.
fn sign_state(user_id: i64, secret: &[u8]) -> Result<String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {e}")))?
        .as_millis();

    let payload = format!("{}|{:x}", user_id, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {e}")))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the HMAC signature and decode the user ID from the OAuth
/// state parameter.
fn verify_state(state: &str, secret: &[u8]) -> Option<i64> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "user_id|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let user_id = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    // Reconstruct payload and verify signature
    let payload = format!("{}|{}", user_id, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    user_id.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_state() {
        let secret = b"secret_key";
        let state = sign_state(42, secret).unwrap();
        assert_eq!(verify_state(&state, secret), Some(42));
    }

    #[test]
    fn test_verify_state_invalid_signature() {
        let secret = b"secret_key";
        let payload = "42|abc123";
        let state_data = format!("{}|{}", payload, "invalid_signature");
        let encoded = URL_SAFE_NO_PAD.encode(state_data.as_bytes());

        assert_eq!(verify_state(&encoded, secret), None);
    }

    #[test]
    fn test_verify_state_wrong_secret() {
        let state = sign_state(42, b"secret_key").unwrap();
        assert_eq!(verify_state(&state, b"wrong_key"), None);
    }

    #[test]
    fn test_verify_state_malformed() {
        let secret = b"secret_key";
        let encoded = URL_SAFE_NO_PAD.encode("invalid|format");
        assert_eq!(verify_state(&encoded, secret), None);
    }

    #[test]
    fn test_verify_state_non_numeric_user() {
        let secret = b"secret_key";
        let payload = "abc|123";
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        let encoded = URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature).as_bytes());

        assert_eq!(verify_state(&encoded, secret), None);
    }
}
