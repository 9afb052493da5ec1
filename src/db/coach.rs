// SPDX-License-Identifier: MIT

//! Storage for coach output (plans, analyses, reports) and the per-user
//! conversation session.

use super::Db;
use crate::error::AppError;
use crate::models::ChatSession;
use crate::time_utils::now_rfc3339;

impl Db {
    /// Store a generated training plan. Returns the new row ID.
    pub async fn insert_training_plan(
        &self,
        user_id: i64,
        goal: &str,
        start_date: &str,
        end_date: &str,
        plan: &str,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            r"INSERT INTO training_plans (user_id, goal, start_date, end_date, plan, status, created_at)
              VALUES (?, ?, ?, ?, ?, 'active', ?)",
        )
        .bind(user_id)
        .bind(goal)
        .bind(start_date)
        .bind(end_date)
        .bind(plan)
        .bind(now_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Store a workout analysis. Returns the new row ID.
    pub async fn insert_workout_analysis(
        &self,
        workout_id: i64,
        analysis: &str,
        recommendations: &str,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            r"INSERT INTO workout_analyses (workout_id, analysis, recommendations, created_at)
              VALUES (?, ?, ?, ?)",
        )
        .bind(workout_id)
        .bind(analysis)
        .bind(recommendations)
        .bind(now_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Store a progress report. Returns the new row ID.
    pub async fn insert_progress_report(
        &self,
        user_id: i64,
        period_start: &str,
        period_end: &str,
        report: &str,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            r"INSERT INTO progress_reports (user_id, period_start, period_end, report, created_at)
              VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(period_start)
        .bind(period_end)
        .bind(report)
        .bind(now_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Latest analysis stored for a workout, if any.
    pub async fn get_workout_analysis(
        &self,
        workout_id: i64,
    ) -> Result<Option<crate::models::WorkoutAnalysis>, AppError> {
        let analysis = sqlx::query_as::<_, crate::models::WorkoutAnalysis>(
            "SELECT * FROM workout_analyses WHERE workout_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(workout_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(analysis)
    }

    /// Load the user's conversation session, if one exists.
    pub async fn get_chat_session(&self, user_id: i64) -> Result<Option<ChatSession>, AppError> {
        let session =
            sqlx::query_as::<_, ChatSession>("SELECT * FROM chat_sessions WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(session)
    }

    /// Create or replace the user's conversation session.
    pub async fn upsert_chat_session(
        &self,
        user_id: i64,
        messages_json: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r"INSERT INTO chat_sessions (user_id, messages, updated_at)
              VALUES (?, ?, ?)
              ON CONFLICT(user_id) DO UPDATE SET
                  messages = excluded.messages,
                  updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(messages_json)
        .bind(now_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
