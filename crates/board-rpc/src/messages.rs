//! Request and reply messages of the `board.Board` service.
//!
//! Entity messages (`Subject`, `Question`, `NewSubject`, `NewQuestion`) are
//! the core types themselves.

use axum::{
  body::Bytes,
  extract::{FromRequest, Request},
};
use board_core::{question::Question, subject::Subject};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::RpcError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectId {
  #[serde(default)]
  pub id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionId {
  #[serde(default)]
  pub id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectList {
  pub subject_list: Vec<Subject>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionList {
  pub question_list: Vec<Question>,
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// A JSON request message. An empty body decodes as the message's zero
/// value, so callers may omit `{}` for parameterless calls.
pub struct Message<T>(pub T);

impl<T, S> FromRequest<S> for Message<T>
where
  T: DeserializeOwned + Default + Send,
  S: Send + Sync,
{
  type Rejection = RpcError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let bytes = Bytes::from_request(req, state)
      .await
      .map_err(|e| RpcError::Message(e.body_text()))?;
    if bytes.is_empty() {
      return Ok(Message(T::default()));
    }
    serde_json::from_slice(&bytes)
      .map(Message)
      .map_err(|e| RpcError::Message(e.to_string()))
  }
}
