//! Error type for `board-store-sqlite` and the mapping into the neutral
//! [`StoreError`] the gateway contract speaks.

use board_core::store::StoreError;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Failures opening or initialising the database file.
#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Busy and locked databases may clear up on their own; everything else
/// (constraints, bad SQL, a closed connection) will not.
pub(crate) fn classify(err: tokio_rusqlite::Error) -> StoreError {
  let transient = matches!(
    &err,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
      if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
  );

  if transient {
    StoreError::transient(err)
  } else {
    StoreError::fatal(err)
  }
}
