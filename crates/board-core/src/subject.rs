//! Subject — a top-level discussion topic that questions are posted under.

use serde::{Deserialize, Serialize};

use crate::{Error, store::Row};

/// A discussion topic. Disabled subjects stay readable but accept no new
/// questions.
///
/// `Default` is the zero-value record returned when a lookup matches no row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub id:      i64,
  pub title:   String,
  pub enabled: bool,
}

impl Subject {
  /// Decode a `(id, title, enabled)` row.
  pub(crate) fn from_row(row: &Row) -> Result<Self, Error> {
    Ok(Self {
      id:      row.get_i64(0)?,
      title:   row.get_str(1)?.to_owned(),
      enabled: row.get_bool(2)?,
    })
  }
}

/// Input for creating a subject; the store assigns the id and `enabled`
/// defaults to true.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSubject {
  pub title: String,
}
