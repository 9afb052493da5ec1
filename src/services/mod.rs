// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod coach;
pub mod strava;
pub mod sync;

pub use coach::{CoachClient, CoachService};
pub use strava::{StravaClient, StravaService};
pub use sync::{ActivityProvider, SyncEngine, SyncReport};
