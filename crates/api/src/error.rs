//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hotspot::HotspotError;
use serde::Serialize;
use session::SessionError;
use storage::StorageError;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Handler errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Hotspot(#[from] HotspotError),
    #[error("Session {session_id} not persisted and kept pending: {source}")]
    NotPersisted {
        session_id: Uuid,
        source: StorageError,
    },
    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Session(SessionError::InvalidFix(_) | SessionError::InvalidSample(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Session(_) => StatusCode::CONFLICT,
            ApiError::Storage(StorageError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Storage(StorageError::InvalidRecord(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotPersisted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Hotspot(HotspotError::InvalidBoundingBox(_)) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Hotspot(HotspotError::Fetch(_)) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
