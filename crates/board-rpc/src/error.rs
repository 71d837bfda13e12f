//! RPC error type and its wire form.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use board_core::Code;
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::Failure;

#[derive(Debug, Error)]
pub enum RpcError {
  #[error(transparent)]
  Board(#[from] board_core::Error),

  /// The request body could not be decoded into the method's message.
  #[error("malformed message: {0}")]
  Message(String),

  #[error("failed to encode reply: {0}")]
  Encode(#[from] serde_json::Error),
}

impl RpcError {
  pub fn code(&self) -> Code {
    match self {
      RpcError::Board(e)   => e.code(),
      RpcError::Message(_) => Code::InvalidArgument,
      RpcError::Encode(_)  => Code::Internal,
    }
  }
}

pub fn status_for(code: Code) -> StatusCode {
  match code {
    Code::Ok                 => StatusCode::OK,
    Code::InvalidArgument    => StatusCode::BAD_REQUEST,
    Code::NotFound           => StatusCode::NOT_FOUND,
    Code::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
    Code::Internal           => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
  code:    Code,
  message: &'a str,
}

impl IntoResponse for RpcError {
  fn into_response(self) -> Response {
    let code = self.code();
    let message = self.to_string();

    let mut response =
      (status_for(code), Json(ErrorBody { code, message: &message })).into_response();
    response.extensions_mut().insert(Failure { code, message });
    response
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn statuses_follow_codes() {
    let cases = [
      (board_core::Error::validation("x"), StatusCode::BAD_REQUEST),
      (board_core::Error::NotFound { entity: "subject", id: 1 }, StatusCode::NOT_FOUND),
      (board_core::Error::precondition("x"), StatusCode::PRECONDITION_FAILED),
    ];
    for (err, status) in cases {
      let response = RpcError::from(err).into_response();
      assert_eq!(response.status(), status);
      assert!(response.extensions().get::<Failure>().is_some());
    }
  }

  #[test]
  fn malformed_message_is_invalid_argument() {
    assert_eq!(RpcError::Message("eof".into()).code(), Code::InvalidArgument);
  }
}
