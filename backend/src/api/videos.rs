use crate::error::ApiError;
use crate::models::{CancelResponse, JobId, Progress, RetrievalTicket, VideoRecord, VideosRequest};
use crate::AppState;
use rocket::serde::json::Json;
use rocket::{delete, get, post, State};

fn parse_job_id(raw: &str) -> Result<JobId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid job id: {raw}")))
}

#[post("/videos", data = "<request>")]
pub fn request_videos(
    state: &State<AppState>,
    request: Json<VideosRequest>,
) -> Result<Json<RetrievalTicket>, ApiError> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(ApiError::BadRequest("Channel URL is required".to_string()));
    }
    Ok(Json(state.coordinator.request_retrieval(url)))
}

#[get("/progress")]
pub fn current_progress(state: &State<AppState>) -> Json<Progress> {
    Json(state.coordinator.current_progress())
}

#[get("/progress/<job_id>")]
pub fn job_progress(state: &State<AppState>, job_id: &str) -> Result<Json<Progress>, ApiError> {
    let job_id = parse_job_id(job_id)?;
    state
        .coordinator
        .progress(job_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No job {job_id}")))
}

#[delete("/jobs/<job_id>")]
pub fn cancel_job(state: &State<AppState>, job_id: &str) -> Result<Json<CancelResponse>, ApiError> {
    let job_id = parse_job_id(job_id)?;
    if state.coordinator.progress(job_id).is_none() {
        return Err(ApiError::NotFound(format!("No job {job_id}")));
    }
    Ok(Json(CancelResponse {
        job_id,
        cancelled: state.coordinator.cancel(job_id),
    }))
}

#[get("/videos/latest")]
pub fn latest_videos(state: &State<AppState>) -> Json<Vec<VideoRecord>> {
    Json(state.coordinator.latest_result())
}
