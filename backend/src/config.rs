use crate::services::cache::{TtlCache, DEFAULT_TTL_SECONDS};
use crate::services::coordinator::JobCoordinator;
use crate::services::progress::{ProgressBoard, DEFAULT_HISTORY_LIMIT};
use crate::services::source::{YtDlpSource, DEFAULT_PLAYLIST_END};
use crate::services::store::{AnalyticsStore, ChannelRegistry};
use crate::AppState;
use anyhow::{Context, Result};
use env_logger::{Builder, Env};
use lazy_static::lazy_static;
use log::info;
use rocket::http::Method;
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

lazy_static! {
    pub static ref CACHE_TTL_SECONDS: i64 = env_or("CACHE_TTL_SECONDS", DEFAULT_TTL_SECONDS);
    pub static ref PLAYLIST_END: usize = env_or("PLAYLIST_END", DEFAULT_PLAYLIST_END);
    pub static ref JOB_HISTORY_LIMIT: usize = env_or("JOB_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT);
    pub static ref YT_DLP_BIN: String =
        env::var("YT_DLP_BIN").unwrap_or_else(|_| "yt-dlp".to_string());
    pub static ref DATA_DIR: PathBuf =
        PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| ".".to_string()));
    pub static ref CHANNELS_FILE: String =
        env::var("CHANNELS_FILE").unwrap_or_else(|_| "channels.json".to_string());
    pub static ref ANALYTICS_FILE: String =
        env::var("ANALYTICS_FILE").unwrap_or_else(|_| "analytics.json".to_string());
    pub static ref CORS_ORIGIN: String =
        env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:8080".to_string());
}

pub fn init_logger() {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting channel insights backend...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}

pub fn create_app_state() -> Result<AppState> {
    std::fs::create_dir_all(&*DATA_DIR)
        .with_context(|| format!("Failed to create data directory {}", DATA_DIR.display()))?;

    let cache = Arc::new(TtlCache::new(*CACHE_TTL_SECONDS));
    let progress = Arc::new(ProgressBoard::new(*JOB_HISTORY_LIMIT));
    let source = Arc::new(YtDlpSource::new(YT_DLP_BIN.as_str()));
    let coordinator =
        JobCoordinator::new(cache, source, progress).with_playlist_end(*PLAYLIST_END);

    info!(
        "Cache TTL {}s, {} videos per channel, extractor `{}`, data in {}",
        *CACHE_TTL_SECONDS,
        *PLAYLIST_END,
        *YT_DLP_BIN,
        DATA_DIR.display()
    );

    Ok(AppState {
        coordinator: Arc::new(coordinator),
        channels: Arc::new(ChannelRegistry::new(DATA_DIR.join(&*CHANNELS_FILE))),
        analytics: Arc::new(AnalyticsStore::new(DATA_DIR.join(&*ANALYTICS_FILE))),
    })
}

pub fn create_cors() -> Result<rocket_cors::Cors> {
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::some_exact(&[CORS_ORIGIN.as_str()]))
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Delete, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allowed_headers(AllowedHeaders::some(&["Accept", "Content-Type"]))
        .to_cors()
        .map_err(|e| anyhow::anyhow!("Failed to create CORS options: {}", e))?;

    Ok(cors)
}
