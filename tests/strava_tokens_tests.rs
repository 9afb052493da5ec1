// SPDX-License-Identifier: MIT

//! Credential record and token lifecycle tests.

mod common;

use stride_coach::error::AppError;
use stride_coach::services::StravaService;

#[tokio::test]
async fn test_upsert_creates_then_overwrites() {
    let db = common::test_db().await;
    let user_id = common::seed_user(&db, "runner@example.com").await;

    db.upsert_strava_tokens(user_id, "access1", "refresh1", 1000, 42)
        .await
        .unwrap();

    let tokens = db.get_strava_tokens(user_id).await.unwrap().unwrap();
    assert_eq!(tokens.access_token, "access1");
    assert_eq!(tokens.athlete_id, 42);

    // Re-authorizing replaces every token field in place.
    db.upsert_strava_tokens(user_id, "access2", "refresh2", 2000, 42)
        .await
        .unwrap();

    let tokens = db.get_strava_tokens(user_id).await.unwrap().unwrap();
    assert_eq!(tokens.access_token, "access2");
    assert_eq!(tokens.refresh_token, "refresh2");
    assert_eq!(tokens.expires_at, 2000);
}

#[tokio::test]
async fn test_upsert_preserves_last_sync() {
    let db = common::test_db().await;
    let user_id = common::seed_user(&db, "runner@example.com").await;

    db.upsert_strava_tokens(user_id, "access1", "refresh1", 1000, 42)
        .await
        .unwrap();
    db.touch_last_sync(user_id).await.unwrap();

    db.upsert_strava_tokens(user_id, "access2", "refresh2", 2000, 42)
        .await
        .unwrap();

    let tokens = db.get_strava_tokens(user_id).await.unwrap().unwrap();
    assert!(tokens.last_sync.is_some());
}

#[tokio::test]
async fn test_refresh_update_replaces_all_three_fields() {
    let db = common::test_db().await;
    let user_id = common::seed_user(&db, "runner@example.com").await;

    db.upsert_strava_tokens(user_id, "old_access", "old_refresh", 1000, 42)
        .await
        .unwrap();

    db.update_strava_tokens(user_id, "new_access", "new_refresh", 9999)
        .await
        .unwrap();

    let tokens = db.get_strava_tokens(user_id).await.unwrap().unwrap();
    assert_eq!(tokens.access_token, "new_access");
    assert_eq!(tokens.refresh_token, "new_refresh");
    assert_eq!(tokens.expires_at, 9999);
    assert_eq!(tokens.athlete_id, 42);
}

#[tokio::test]
async fn test_missing_credential_is_not_connected() {
    let db = common::test_db().await;
    let user_id = common::seed_user(&db, "runner@example.com").await;

    let service = StravaService::new("id".to_string(), "secret".to_string(), db);

    let err = service.valid_access_token(user_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotConnected));
}

#[tokio::test]
async fn test_valid_token_returned_without_refresh() {
    let db = common::test_db().await;
    let user_id = common::seed_user(&db, "runner@example.com").await;

    // Far-future expiry: no refresh call can happen, so this never
    // touches the network.
    db.upsert_strava_tokens(user_id, "still_valid", "refresh", i64::MAX, 42)
        .await
        .unwrap();

    let service = StravaService::new("id".to_string(), "secret".to_string(), db);

    let token = service.valid_access_token(user_id).await.unwrap();
    assert_eq!(token, "still_valid");
}

#[tokio::test]
async fn test_expired_token_triggers_refresh_before_any_data_call() {
    let db = common::test_db().await;
    let user_id = common::seed_user(&db, "runner@example.com").await;

    // Expired long ago; the service must attempt the refresh exchange
    // first. The stub refresh token can never succeed (rejected by the
    // provider, or unreachable entirely), and either way the failure
    // surfaces as an authorization error before any data call is made.
    db.upsert_strava_tokens(user_id, "expired", "bogus_refresh", 1, 42)
        .await
        .unwrap();

    let service = StravaService::new("id".to_string(), "secret".to_string(), db.clone());

    let err = service.valid_access_token(user_id).await.unwrap_err();
    assert!(matches!(err, AppError::ExternalAuth(_)));

    // The failed refresh must not clobber the stored credential.
    let tokens = db.get_strava_tokens(user_id).await.unwrap().unwrap();
    assert_eq!(tokens.refresh_token, "bogus_refresh");
}
