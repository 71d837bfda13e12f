//! Handlers for question endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects/:id/questions` | Most liked first |
//! | `POST`   | `/subjects/:id/questions` | Body: `{"question":"..."}`; 201 |
//! | `GET`    | `/questions/:id` | 404 if not found |
//! | `DELETE` | `/questions/:id` | 204 |
//! | `POST`   | `/questions/:id/like` | 204 |
//! | `POST`   | `/questions/:id/unlike` | 204; 412 when there is nothing to take back |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use board_core::{
  Board,
  question::{NewQuestion, Question},
  store::Gateway,
};
use serde::Deserialize;

use crate::error::ApiError;

// ─── Per subject ──────────────────────────────────────────────────────────────

/// `GET /subjects/:id/questions`
pub async fn list<G: Gateway>(
  State(board): State<Arc<Board<G>>>,
  Path(subject_id): Path<i64>,
) -> Result<Json<Vec<Question>>, ApiError> {
  Ok(Json(board.list_questions(subject_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub question: String,
}

/// `POST /subjects/:id/questions` — body: `{"question":"why?"}`
pub async fn create<G: Gateway>(
  State(board): State<Arc<Board<G>>>,
  Path(subject_id): Path<i64>,
  Json(body): Json<CreateBody>,
) -> Result<StatusCode, ApiError> {
  board
    .create_question(NewQuestion { subject_id, question: body.question })
    .await?;
  Ok(StatusCode::CREATED)
}

// ─── Single question ──────────────────────────────────────────────────────────

/// `GET /questions/:id`
pub async fn get_one<G: Gateway>(
  State(board): State<Arc<Board<G>>>,
  Path(id): Path<i64>,
) -> Result<Json<Question>, ApiError> {
  let question = board.get_question(id).await?;
  if question.id == 0 {
    return Err(ApiError::NotFound(format!("question {id} not found")));
  }
  Ok(Json(question))
}

/// `DELETE /questions/:id`
pub async fn delete_one<G: Gateway>(
  State(board): State<Arc<Board<G>>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  board.delete_question(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Likes ────────────────────────────────────────────────────────────────────

/// `POST /questions/:id/like`
pub async fn like<G: Gateway>(
  State(board): State<Arc<Board<G>>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  board.like(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /questions/:id/unlike`
pub async fn unlike<G: Gateway>(
  State(board): State<Arc<Board<G>>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  board.unlike(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
