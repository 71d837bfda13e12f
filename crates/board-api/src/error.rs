//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("precondition failed: {0}")]
  Precondition(String),

  #[error(transparent)]
  Store(board_core::Error),
}

impl From<board_core::Error> for ApiError {
  fn from(e: board_core::Error) -> Self {
    match e {
      board_core::Error::Validation(m)       => ApiError::BadRequest(m),
      board_core::Error::Precondition(m)     => ApiError::Precondition(m),
      e @ board_core::Error::NotFound { .. } => ApiError::NotFound(e.to_string()),
      e @ board_core::Error::Store(_)        => ApiError::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Precondition(m) => (StatusCode::PRECONDITION_FAILED, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
