// SPDX-License-Identifier: MIT

//! Records produced by the coach delegation: plans, analyses, reports
//! and the persisted conversation session.

use serde::{Deserialize, Serialize};

/// Training plan generated by the coach.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrainingPlan {
    pub id: i64,
    pub user_id: i64,
    /// 5k, 10k, half_marathon, marathon or fitness
    pub goal: String,
    pub start_date: String,
    pub end_date: String,
    /// Full plan text from the coach
    pub plan: String,
    /// active, completed or cancelled
    pub status: String,
    pub created_at: String,
}

/// Coach analysis of a single workout.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkoutAnalysis {
    pub id: i64,
    pub workout_id: i64,
    pub analysis: String,
    pub recommendations: String,
    pub created_at: String,
}

/// Progress report over a training period.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgressReport {
    pub id: i64,
    pub user_id: i64,
    pub period_start: String,
    pub period_end: String,
    pub report: String,
    pub created_at: String,
}

/// Persisted coach conversation, one per user.
///
/// `messages` is a JSON array of `{role, content}` turns, seeded with the
/// coach system prompt on first use. Keeping it in the database (rather
/// than process memory) means conversations survive restarts and never
/// leak between users.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatSession {
    pub user_id: i64,
    pub messages: String,
    pub updated_at: String,
}
