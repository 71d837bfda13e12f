//! Question — an item posted under a subject, carrying a like counter.

use serde::{Deserialize, Serialize};

use crate::{Error, store::Row};

/// `Default` is the zero-value record returned when a lookup matches no row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  pub id:         i64,
  pub question:   String,
  pub subject_id: i64,
  /// Server-owned counter, changed only by like/unlike.
  pub likes:      i64,
}

impl Question {
  /// Decode an `(id, question, subject_id, likes)` row.
  pub(crate) fn from_row(row: &Row) -> Result<Self, Error> {
    Ok(Self {
      id:         row.get_i64(0)?,
      question:   row.get_str(1)?.to_owned(),
      subject_id: row.get_i64(2)?,
      likes:      row.get_i64(3)?,
    })
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewQuestion {
  pub subject_id: i64,
  pub question:   String,
}
