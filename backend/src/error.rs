use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::tree::TreeError;
use serde_json::json;
use thiserror::Error;

/// Error taxonomy shared by the editing session, the persistence adapter, and
/// the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("access denied")]
    AccessDenied,
    #[error("not logged in")]
    Unauthorized,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<TreeError> for ApiError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::NodeNotFound => ApiError::NotFound,
            TreeError::ParentNotFound | TreeError::NameTaken => {
                ApiError::Validation(err.to_string())
            }
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::AccessDenied => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
