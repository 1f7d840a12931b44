use crate::error::ApiError;
use crate::models::{AnalyticsReport, AnalyticsRequest};
use crate::services::analytics::analyze;
use crate::utils::rejoin_url_segments;
use crate::AppState;
use log::info;
use rocket::http::uri::fmt::Path;
use rocket::http::uri::Segments;
use rocket::serde::json::Json;
use rocket::{get, post, State};

#[post("/videos/analytics", data = "<request>")]
pub async fn videos_analytics(
    state: &State<AppState>,
    request: Json<AnalyticsRequest>,
) -> Result<Json<AnalyticsReport>, ApiError> {
    let AnalyticsRequest {
        videos,
        channel_url,
    } = request.into_inner();
    let report = analyze(&videos);
    info!("Computed analytics over {} videos", videos.len());

    if let Some(channel_url) = channel_url.filter(|url| !url.trim().is_empty()) {
        state.analytics.save(channel_url.trim(), &report).await?;
    }
    Ok(Json(report))
}

#[get("/analytics/<channel_url..>")]
pub async fn saved_analytics(
    state: &State<AppState>,
    channel_url: Segments<'_, Path>,
) -> Result<Json<AnalyticsReport>, ApiError> {
    let channel_url = rejoin_url_segments(channel_url);
    if channel_url.is_empty() {
        return Err(ApiError::BadRequest("Channel URL is required".to_string()));
    }

    state
        .analytics
        .get(&channel_url)
        .await?
        .filter(|report| !report.is_empty())
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No analytics found".to_string()))
}
