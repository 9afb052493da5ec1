// SPDX-License-Identifier: MIT

//! stride-coach: personal running-training backend
//!
//! This crate provides the backend API for tracking workouts, importing
//! activity history from Strava, and delegating training intelligence
//! (plans, analyses, progress reports) to a chat-completion coach.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Db;
use services::{CoachService, StravaService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub strava: StravaService,
    pub coach: CoachService,
}
