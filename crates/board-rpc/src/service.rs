//! Method handlers of the `board.Board` service.
//!
//! | Method | Request | Reply |
//! |--------|---------|-------|
//! | `ListSubjects`   | `Empty`       | `SubjectList`, or one `Subject` per frame |
//! | `GetSubject`     | `SubjectId`   | `Subject` |
//! | `CreateSubject`  | `NewSubject`  | `Subject` |
//! | `DeleteSubject`  | `SubjectId`   | `Empty` |
//! | `ListQuestions`  | `SubjectId`   | `QuestionList`, or one `Question` per frame |
//! | `GetQuestion`    | `QuestionId`  | `Question` |
//! | `CreateQuestion` | `NewQuestion` | `Empty` |
//! | `DeleteQuestion` | `QuestionId`  | `Empty` |
//! | `Like`           | `QuestionId`  | `Empty` |
//! | `Unlike`         | `QuestionId`  | `Empty` |

use std::{convert::Infallible, sync::Arc};

use axum::{
  Extension, Json, Router,
  body::{Body, Bytes},
  http::header,
  response::{IntoResponse, Response},
  routing::post,
};
use board_core::{
  Board,
  question::{NewQuestion, Question},
  store::Gateway,
  subject::{NewSubject, Subject},
};
use serde::Serialize;

use crate::{
  error::RpcError,
  messages::{Empty, Message, QuestionId, QuestionList, SubjectId, SubjectList},
  pipeline::{CallContext, CallKind, NDJSON},
};

type Shared<G> = Extension<Arc<Board<G>>>;

/// The service's routes with no interceptors installed. Handlers expect a
/// [`CallContext`] and an `Arc<Board<G>>` in the request extensions.
pub fn routes<G: Gateway + 'static>() -> Router {
  Router::new()
    .route("/board.Board/ListSubjects", post(list_subjects::<G>))
    .route("/board.Board/GetSubject", post(get_subject::<G>))
    .route("/board.Board/CreateSubject", post(create_subject::<G>))
    .route("/board.Board/DeleteSubject", post(delete_subject::<G>))
    .route("/board.Board/ListQuestions", post(list_questions::<G>))
    .route("/board.Board/GetQuestion", post(get_question::<G>))
    .route("/board.Board/CreateQuestion", post(create_question::<G>))
    .route("/board.Board/DeleteQuestion", post(delete_question::<G>))
    .route("/board.Board/Like", post(like::<G>))
    .route("/board.Board/Unlike", post(unlike::<G>))
}

// ─── Replies ─────────────────────────────────────────────────────────────────

/// One JSON line per record, one body frame per line.
fn frames<T: Serialize>(records: &[T]) -> Result<Response, RpcError> {
  let lines = records
    .iter()
    .map(|record| -> Result<Bytes, serde_json::Error> {
      let mut line = serde_json::to_vec(record)?;
      line.push(b'\n');
      Ok(Bytes::from(line))
    })
    .collect::<Result<Vec<_>, _>>()?;

  let stream = tokio_stream::iter(lines.into_iter().map(Ok::<_, Infallible>));
  Ok(([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(stream)).into_response())
}

fn ack() -> Response { Json(Empty {}).into_response() }

// ─── Subjects ────────────────────────────────────────────────────────────────

async fn list_subjects<G: Gateway + 'static>(
  Extension(board): Shared<G>,
  Extension(call): Extension<CallContext>,
  Message(Empty {}): Message<Empty>,
) -> Result<Response, RpcError> {
  let subjects = board.list_subjects().await?;
  match call.kind {
    CallKind::Unary => Ok(Json(SubjectList { subject_list: subjects }).into_response()),
    CallKind::Streaming => frames(&subjects),
  }
}

async fn get_subject<G: Gateway + 'static>(
  Extension(board): Shared<G>,
  Message(req): Message<SubjectId>,
) -> Result<Json<Subject>, RpcError> {
  Ok(Json(board.get_subject(req.id).await?))
}

async fn create_subject<G: Gateway + 'static>(
  Extension(board): Shared<G>,
  Message(req): Message<NewSubject>,
) -> Result<Json<Subject>, RpcError> {
  Ok(Json(board.create_subject(req).await?))
}

async fn delete_subject<G: Gateway + 'static>(
  Extension(board): Shared<G>,
  Message(req): Message<SubjectId>,
) -> Result<Response, RpcError> {
  board.delete_subject(req.id).await?;
  Ok(ack())
}

// ─── Questions ───────────────────────────────────────────────────────────────

async fn list_questions<G: Gateway + 'static>(
  Extension(board): Shared<G>,
  Extension(call): Extension<CallContext>,
  Message(req): Message<SubjectId>,
) -> Result<Response, RpcError> {
  let questions = board.list_questions(req.id).await?;
  match call.kind {
    CallKind::Unary => Ok(Json(QuestionList { question_list: questions }).into_response()),
    CallKind::Streaming => frames(&questions),
  }
}

async fn get_question<G: Gateway + 'static>(
  Extension(board): Shared<G>,
  Message(req): Message<QuestionId>,
) -> Result<Json<Question>, RpcError> {
  Ok(Json(board.get_question(req.id).await?))
}

async fn create_question<G: Gateway + 'static>(
  Extension(board): Shared<G>,
  Message(req): Message<NewQuestion>,
) -> Result<Response, RpcError> {
  board.create_question(req).await?;
  Ok(ack())
}

async fn delete_question<G: Gateway + 'static>(
  Extension(board): Shared<G>,
  Message(req): Message<QuestionId>,
) -> Result<Response, RpcError> {
  board.delete_question(req.id).await?;
  Ok(ack())
}

// ─── Likes ───────────────────────────────────────────────────────────────────

async fn like<G: Gateway + 'static>(
  Extension(board): Shared<G>,
  Message(req): Message<QuestionId>,
) -> Result<Response, RpcError> {
  board.like(req.id).await?;
  Ok(ack())
}

async fn unlike<G: Gateway + 'static>(
  Extension(board): Shared<G>,
  Message(req): Message<QuestionId>,
) -> Result<Response, RpcError> {
  board.unlike(req.id).await?;
  Ok(ack())
}
