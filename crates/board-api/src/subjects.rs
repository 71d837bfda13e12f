//! Handlers for `/subjects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects` | Ascending id order |
//! | `POST`   | `/subjects` | Body: `{"title":"..."}`; returns 201 + stored subject |
//! | `GET`    | `/subjects/:id` | 404 if not found |
//! | `DELETE` | `/subjects/:id` | 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use board_core::{
  Board,
  store::Gateway,
  subject::{NewSubject, Subject},
};

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /subjects`
pub async fn list<G: Gateway>(
  State(board): State<Arc<Board<G>>>,
) -> Result<Json<Vec<Subject>>, ApiError> {
  Ok(Json(board.list_subjects().await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /subjects` — body: `{"title":"rust"}`
pub async fn create<G: Gateway>(
  State(board): State<Arc<Board<G>>>,
  Json(body): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError> {
  let subject = board.create_subject(body).await?;
  Ok((StatusCode::CREATED, Json(subject)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /subjects/:id`
///
/// The board answers an unknown id with the zero-value subject; here that
/// becomes a 404.
pub async fn get_one<G: Gateway>(
  State(board): State<Arc<Board<G>>>,
  Path(id): Path<i64>,
) -> Result<Json<Subject>, ApiError> {
  let subject = board.get_subject(id).await?;
  if subject.id == 0 {
    return Err(ApiError::NotFound(format!("subject {id} not found")));
  }
  Ok(Json(subject))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /subjects/:id`
pub async fn delete_one<G: Gateway>(
  State(board): State<Arc<Board<G>>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  board.delete_subject(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
