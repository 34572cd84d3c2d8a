// HTTP error mapping
use crate::application::drag_controller::DragRefusal;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The store ignored the request (blank title, full dashboard, ...).
    #[error("{0}")]
    Rejected(&'static str),

    #[error(transparent)]
    Drag(#[from] DragRefusal),

    #[error("{0}")]
    Generation(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Drag(DragRefusal::UnknownCard) => StatusCode::NOT_FOUND,
            ApiError::Drag(_) => StatusCode::CONFLICT,
            ApiError::Generation(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
