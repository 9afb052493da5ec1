// SPDX-License-Identifier: MIT

//! Domain models for storage and API.

pub mod coach;
pub mod user;
pub mod workout;

pub use coach::{ChatSession, ProgressReport, TrainingPlan, WorkoutAnalysis};
pub use user::{StravaTokens, User};
pub use workout::{NewWorkout, Workout};
