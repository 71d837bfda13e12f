//! Error types for `board-core`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
  /// A required field was missing, empty or zero.
  #[error("invalid argument: {0}")]
  Validation(String),

  #[error("{entity} {id} not found")]
  NotFound { entity: &'static str, id: i64 },

  /// The referenced entity exists but is in the wrong state for the call.
  #[error("failed precondition: {0}")]
  Precondition(String),

  #[error("store error: {0}")]
  Store(#[from] StoreError),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

  pub fn precondition(msg: impl Into<String>) -> Self { Self::Precondition(msg.into()) }

  /// The caller-visible category of this error.
  pub fn code(&self) -> Code {
    match self {
      Error::Validation(_)    => Code::InvalidArgument,
      Error::NotFound { .. }  => Code::NotFound,
      Error::Precondition(_)  => Code::FailedPrecondition,
      Error::Store(_)         => Code::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Status codes ────────────────────────────────────────────────────────────

/// Outcome category of a call, shared by every transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
  Ok,
  InvalidArgument,
  NotFound,
  FailedPrecondition,
  Internal,
}

impl Code {
  pub fn as_str(self) -> &'static str {
    match self {
      Code::Ok                 => "ok",
      Code::InvalidArgument    => "invalid_argument",
      Code::NotFound           => "not_found",
      Code::FailedPrecondition => "failed_precondition",
      Code::Internal           => "internal",
    }
  }

  pub fn is_ok(self) -> bool { matches!(self, Code::Ok) }
}

impl std::fmt::Display for Code {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
