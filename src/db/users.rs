// SPDX-License-Identifier: MIT

//! User account and profile queries.

use super::Db;
use crate::error::AppError;
use crate::models::User;
use crate::time_utils::now_rfc3339;

/// Profile fields settable at registration or via profile update.
#[derive(Debug, Clone)]
pub struct ProfileFields {
    pub name: String,
    pub age: i64,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub fitness_level: String,
}

impl Db {
    /// Insert a new user. Returns the created row.
    ///
    /// A duplicate email surfaces as a `Database` error from the UNIQUE
    /// constraint; callers translate it to a 400.
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        profile: &ProfileFields,
    ) -> Result<User, AppError> {
        let now = now_rfc3339();
        let result = sqlx::query(
            r"INSERT INTO users (name, email, password_hash, age, weight_kg, height_cm, fitness_level, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&profile.name)
        .bind(email)
        .bind(password_hash)
        .bind(profile.age)
        .bind(profile.weight_kg)
        .bind(profile.height_cm)
        .bind(&profile.fitness_level)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::Database("User vanished after insert".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    /// Get a user by email (for login).
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    /// Update a user's profile fields.
    pub async fn update_profile(
        &self,
        user_id: i64,
        profile: &ProfileFields,
    ) -> Result<(), AppError> {
        sqlx::query(
            r"UPDATE users
              SET name = ?, age = ?, weight_kg = ?, height_cm = ?, fitness_level = ?, updated_at = ?
              WHERE id = ?",
        )
        .bind(&profile.name)
        .bind(profile.age)
        .bind(profile.weight_kg)
        .bind(profile.height_cm)
        .bind(&profile.fitness_level)
        .bind(now_rfc3339())
        .bind(user_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
