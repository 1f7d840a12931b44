use crate::models::JobId;
use log::error;
use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use serde::{Deserialize, Serialize};
use std::io::{self, Cursor};
use thiserror::Error;

/// Failures raised by a [`VideoSource`](crate::services::source::VideoSource).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("extraction failed ({status}): {stderr}")]
    Extraction { status: String, stderr: String },

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("{0}")]
    Failed(String),

    #[error("Retrieval cancelled")]
    Cancelled,

    #[error("unknown job {0}")]
    UnknownJob(JobId),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("store contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::Store(_) => Status::InternalServerError,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let message = match &self {
            ApiError::Store(e) => {
                error!("Store failure while serving request: {e}");
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };

        let json = serde_json::to_string(&ErrorResponse { error: message })
            .map_err(|_| Status::InternalServerError)?;
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}
