use crate::error::ApiError;
use crate::models::{ChannelEntry, ChannelRequest};
use crate::AppState;
use rocket::serde::json::Json;
use rocket::{delete, get, post, State};

#[get("/channels")]
pub async fn list_channels(state: &State<AppState>) -> Result<Json<Vec<ChannelEntry>>, ApiError> {
    Ok(Json(state.channels.list().await?))
}

#[post("/channels", data = "<request>")]
pub async fn add_channel(
    state: &State<AppState>,
    request: Json<ChannelRequest>,
) -> Result<Json<Vec<ChannelEntry>>, ApiError> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(ApiError::BadRequest("Channel URL is required".to_string()));
    }
    Ok(Json(state.channels.add(url).await?))
}

#[delete("/channels", data = "<request>")]
pub async fn remove_channel(
    state: &State<AppState>,
    request: Json<ChannelRequest>,
) -> Result<Json<Vec<ChannelEntry>>, ApiError> {
    Ok(Json(state.channels.remove(request.url.trim()).await?))
}
