pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use crate::services::coordinator::JobCoordinator;
use crate::services::store::{AnalyticsStore, ChannelRegistry};
use rocket::{routes, Build, Rocket};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<JobCoordinator>,
    pub channels: Arc<ChannelRegistry>,
    pub analytics: Arc<AnalyticsStore>,
}

/// Assemble the HTTP service around `state`. CORS is optional so tests can skip it.
pub fn build_rocket(state: AppState, cors: Option<rocket_cors::Cors>) -> Rocket<Build> {
    let rocket = rocket::build().manage(state).mount(
        "/api",
        routes![
            api::list_channels,
            api::add_channel,
            api::remove_channel,
            api::request_videos,
            api::current_progress,
            api::job_progress,
            api::cancel_job,
            api::latest_videos,
            api::videos_analytics,
            api::saved_analytics,
        ],
    );

    match cors {
        Some(cors) => rocket.attach(cors),
        None => rocket,
    }
}
