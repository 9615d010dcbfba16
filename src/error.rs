use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use axum::Json;
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::pipeline::PipelineError;

/// Failures surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Topic not found.")]
    TopicNotFound,
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("topic store error: {0}")]
    Store(String),
}

impl ApiError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        ApiError::Store(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::TopicNotFound => StatusCode::NOT_FOUND,
            ApiError::Pipeline(PipelineError::Normalization(_)) |
            ApiError::Pipeline(PipelineError::Model { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Pipeline(PipelineError::Retrieval(_)) | ApiError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
