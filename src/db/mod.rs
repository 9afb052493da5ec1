//! Database layer (SQLite via sqlx).
//!
//! `Db` wraps a connection pool and exposes typed operations, grouped by
//! aggregate in the submodules:
//! - `users` — accounts and profiles
//! - `workouts` — workout CRUD plus the Strava dedup queries
//! - `strava_tokens` — the per-user OAuth credential record
//! - `coach` — plans, analyses, reports and chat sessions

pub mod coach;
pub mod strava_tokens;
pub mod users;
pub mod workouts;

use crate::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// SQLite database handle, cheap to clone.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open (creating if missing) and migrate the database.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Database(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database exists per connection, so the pool must
        // not hand out more than one.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;

        tracing::info!(url = database_url, "Database ready");
        Ok(db)
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables. Statements are idempotent so this runs on
    /// every startup.
    async fn migrate(&self) -> Result<(), AppError> {
        let statements = [
            r"CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                age INTEGER NOT NULL DEFAULT 0,
                weight_kg REAL NOT NULL DEFAULT 0,
                height_cm REAL NOT NULL DEFAULT 0,
                fitness_level TEXT NOT NULL DEFAULT 'beginner',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            r"CREATE TABLE IF NOT EXISTS workouts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                workout_type TEXT NOT NULL,
                distance_km REAL NOT NULL DEFAULT 0,
                duration_min INTEGER NOT NULL DEFAULT 0,
                avg_pace TEXT NOT NULL DEFAULT '',
                avg_heart_rate INTEGER NOT NULL DEFAULT 0,
                avg_power INTEGER NOT NULL DEFAULT 0,
                cadence INTEGER NOT NULL DEFAULT 0,
                elevation_gain INTEGER NOT NULL DEFAULT 0,
                calories INTEGER NOT NULL DEFAULT 0,
                notes TEXT NOT NULL DEFAULT '',
                feeling TEXT NOT NULL DEFAULT 'good',
                strava_activity_id INTEGER UNIQUE,
                strava_data TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )",
            r"CREATE INDEX IF NOT EXISTS idx_workouts_user_date
                ON workouts(user_id, date)",
            r"CREATE TABLE IF NOT EXISTS strava_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                athlete_id INTEGER NOT NULL DEFAULT 0,
                last_sync TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )",
            r"CREATE TABLE IF NOT EXISTS training_plans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                goal TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                plan TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )",
            r"CREATE TABLE IF NOT EXISTS workout_analyses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout_id INTEGER NOT NULL,
                analysis TEXT NOT NULL,
                recommendations TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                FOREIGN KEY (workout_id) REFERENCES workouts(id)
            )",
            r"CREATE TABLE IF NOT EXISTS progress_reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                period_start TEXT NOT NULL,
                period_end TEXT NOT NULL,
                report TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )",
            r"CREATE TABLE IF NOT EXISTS chat_sessions (
                user_id INTEGER PRIMARY KEY,
                messages TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }
}
