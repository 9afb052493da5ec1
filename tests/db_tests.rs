// SPDX-License-Identifier: MIT

//! Database layer tests: user and workout queries, dedup lookups and
//! the uniqueness constraint the sync engine relies on.

mod common;

use stride_coach::models::NewWorkout;

fn workout(date: &str) -> NewWorkout {
    NewWorkout {
        date: date.to_string(),
        workout_type: "easy".to_string(),
        distance_km: 10.0,
        duration_min: 50,
        avg_pace: "5:00".to_string(),
        avg_heart_rate: 150,
        avg_power: 250,
        cadence: 172,
        elevation_gain: 40,
        calories: 600,
        notes: "test".to_string(),
        feeling: "good".to_string(),
    }
}

#[tokio::test]
async fn test_user_lookup_by_email() {
    let db = common::test_db().await;
    let user_id = common::seed_user(&db, "runner@example.com").await;

    let user = db
        .get_user_by_email("runner@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.id, user_id);
    assert_eq!(user.fitness_level, "advanced");

    assert!(db
        .get_user_by_email("nobody@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let db = common::test_db().await;
    common::seed_user(&db, "runner@example.com").await;

    let profile = stride_coach::db::users::ProfileFields {
        name: "Other".to_string(),
        age: 28,
        weight_kg: 65.0,
        height_cm: 170.0,
        fitness_level: "beginner".to_string(),
    };
    let result = db.create_user("runner@example.com", "hash", &profile).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_workout_crud_scoped_by_owner() {
    let db = common::test_db().await;
    let alice = common::seed_user(&db, "alice@example.com").await;
    let bob = common::seed_user(&db, "bob@example.com").await;

    let id = db
        .insert_workout(alice, &workout("2024-05-01T08:00:00Z"), None, None)
        .await
        .unwrap();

    // Owner sees it; someone else does not.
    assert!(db.get_workout(alice, id).await.unwrap().is_some());
    assert!(db.get_workout(bob, id).await.unwrap().is_none());

    // Deleting as the wrong user is a no-op.
    assert!(!db.delete_workout(bob, id).await.unwrap());
    assert!(db.delete_workout(alice, id).await.unwrap());
    assert!(db.get_workout(alice, id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_workouts_listed_most_recent_first() {
    let db = common::test_db().await;
    let user_id = common::seed_user(&db, "runner@example.com").await;

    db.insert_workout(user_id, &workout("2024-05-01T08:00:00Z"), None, None)
        .await
        .unwrap();
    db.insert_workout(user_id, &workout("2024-05-10T08:00:00Z"), None, None)
        .await
        .unwrap();
    db.insert_workout(user_id, &workout("2024-05-05T08:00:00Z"), None, None)
        .await
        .unwrap();

    let workouts = db.list_workouts(user_id).await.unwrap();
    let dates: Vec<&str> = workouts.iter().map(|w| w.date.as_str()).collect();
    assert_eq!(
        dates,
        vec![
            "2024-05-10T08:00:00Z",
            "2024-05-05T08:00:00Z",
            "2024-05-01T08:00:00Z"
        ]
    );
}

#[tokio::test]
async fn test_strava_activity_id_unique_constraint() {
    let db = common::test_db().await;
    let user_id = common::seed_user(&db, "runner@example.com").await;

    db.insert_workout(user_id, &workout("2024-05-01T08:00:00Z"), Some(900), None)
        .await
        .unwrap();

    // Same external ID again must be rejected by the constraint.
    let duplicate = db
        .insert_workout(user_id, &workout("2024-05-01T08:00:00Z"), Some(900), None)
        .await;
    assert!(duplicate.is_err());

    // A different ID and a manual workout (NULL) are both fine.
    db.insert_workout(user_id, &workout("2024-05-02T08:00:00Z"), Some(901), None)
        .await
        .unwrap();
    db.insert_workout(user_id, &workout("2024-05-03T08:00:00Z"), None, None)
        .await
        .unwrap();
    db.insert_workout(user_id, &workout("2024-05-04T08:00:00Z"), None, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_find_by_strava_activity_is_user_scoped() {
    let db = common::test_db().await;
    let alice = common::seed_user(&db, "alice@example.com").await;
    let bob = common::seed_user(&db, "bob@example.com").await;

    db.insert_workout(alice, &workout("2024-05-01T08:00:00Z"), Some(910), None)
        .await
        .unwrap();

    assert!(db
        .find_workout_by_strava_activity(alice, 910)
        .await
        .unwrap()
        .is_some());
    assert!(db
        .find_workout_by_strava_activity(bob, 910)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_last_imported_date_ignores_manual_workouts() {
    let db = common::test_db().await;
    let user_id = common::seed_user(&db, "runner@example.com").await;

    // No imports yet: no watermark basis.
    assert!(db.last_imported_date(user_id).await.unwrap().is_none());

    // A manual workout does not count as an import.
    db.insert_workout(user_id, &workout("2024-06-01T08:00:00Z"), None, None)
        .await
        .unwrap();
    assert!(db.last_imported_date(user_id).await.unwrap().is_none());

    db.insert_workout(user_id, &workout("2024-05-01T08:00:00Z"), Some(920), None)
        .await
        .unwrap();
    db.insert_workout(user_id, &workout("2024-05-20T08:00:00Z"), Some(921), None)
        .await
        .unwrap();

    let last = db.last_imported_date(user_id).await.unwrap();
    assert_eq!(last.as_deref(), Some("2024-05-20T08:00:00Z"));
}

#[tokio::test]
async fn test_update_workout_strava_data() {
    let db = common::test_db().await;
    let user_id = common::seed_user(&db, "runner@example.com").await;

    let id = db
        .insert_workout(user_id, &workout("2024-05-01T08:00:00Z"), Some(930), None)
        .await
        .unwrap();

    db.update_workout_strava_data(id, r#"{"id":930,"calories":512.0}"#)
        .await
        .unwrap();

    let stored = db.get_workout(user_id, id).await.unwrap().unwrap();
    assert!(stored.strava_data.unwrap().contains("512.0"));
}

#[tokio::test]
async fn test_chat_session_upsert_roundtrip() {
    let db = common::test_db().await;
    let user_id = common::seed_user(&db, "runner@example.com").await;

    assert!(db.get_chat_session(user_id).await.unwrap().is_none());

    db.upsert_chat_session(user_id, r#"[{"role":"system","content":"coach"}]"#)
        .await
        .unwrap();
    db.upsert_chat_session(
        user_id,
        r#"[{"role":"system","content":"coach"},{"role":"user","content":"hi"}]"#,
    )
    .await
    .unwrap();

    let session = db.get_chat_session(user_id).await.unwrap().unwrap();
    assert!(session.messages.contains("\"user\""));
}
