//! The `Gateway` trait and the neutral value types that cross it.
//!
//! The trait is implemented by storage backends (e.g. `board-store-sqlite`).
//! [`Board`](crate::Board) depends on this abstraction, not on any concrete
//! backend. Statements are static SQL with positional placeholders; caller
//! input only ever travels as bound [`Value`]s.

use std::future::Future;

use thiserror::Error;

// ─── Values ──────────────────────────────────────────────────────────────────

/// A single bound parameter or result column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Integer(i64),
  Text(String),
  Bool(bool),
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Value::Integer(v) }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Value::Text(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Value::Text(v.to_owned()) }
}

/// One result row, columns in `SELECT` order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
  values: Vec<Value>,
}

impl Row {
  pub fn new(values: Vec<Value>) -> Self { Self { values } }

  pub fn len(&self) -> usize { self.values.len() }

  pub fn is_empty(&self) -> bool { self.values.is_empty() }

  fn column(&self, idx: usize) -> Result<&Value, StoreError> {
    self
      .values
      .get(idx)
      .ok_or_else(|| StoreError::decode(format!("column {idx} out of range")))
  }

  pub fn get_i64(&self, idx: usize) -> Result<i64, StoreError> {
    match self.column(idx)? {
      Value::Integer(v) => Ok(*v),
      other => Err(StoreError::decode(format!("column {idx}: expected integer, got {other:?}"))),
    }
  }

  pub fn get_str(&self, idx: usize) -> Result<&str, StoreError> {
    match self.column(idx)? {
      Value::Text(v) => Ok(v),
      other => Err(StoreError::decode(format!("column {idx}: expected text, got {other:?}"))),
    }
  }

  /// Booleans come back as `0`/`1` from stores without a native type.
  pub fn get_bool(&self, idx: usize) -> Result<bool, StoreError> {
    match self.column(idx)? {
      Value::Bool(v) => Ok(*v),
      Value::Integer(0) => Ok(false),
      Value::Integer(1) => Ok(true),
      other => Err(StoreError::decode(format!("column {idx}: expected boolean, got {other:?}"))),
    }
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Whether a store failure may succeed if the caller tries again later.
///
/// Nothing in the service retries; the kind is informational for callers
/// and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
  Transient,
  Fatal,
}

impl std::fmt::Display for StoreErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      StoreErrorKind::Transient => f.write_str("transient"),
      StoreErrorKind::Fatal     => f.write_str("fatal"),
    }
  }
}

#[derive(Debug, Error)]
#[error("{kind} store failure: {source}")]
pub struct StoreError {
  kind:   StoreErrorKind,
  source: Box<dyn std::error::Error + Send + Sync>,
}

#[derive(Debug, Error)]
#[error("{0}")]
struct DecodeError(String);

impl StoreError {
  pub fn new(
    kind: StoreErrorKind,
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
  ) -> Self {
    Self { kind, source: source.into() }
  }

  pub fn transient(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    Self::new(StoreErrorKind::Transient, source)
  }

  pub fn fatal(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    Self::new(StoreErrorKind::Fatal, source)
  }

  /// A row did not have the shape a statement promised.
  pub fn decode(msg: impl Into<String>) -> Self {
    Self::fatal(DecodeError(msg.into()))
  }

  pub fn kind(&self) -> StoreErrorKind { self.kind }

  pub fn is_transient(&self) -> bool { self.kind == StoreErrorKind::Transient }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Parameterised access to the relational store.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait Gateway: Send + Sync {
  /// Run a read-only statement and return every row.
  fn query(
    &self,
    statement: &'static str,
    params: Vec<Value>,
  ) -> impl Future<Output = Result<Vec<Row>, StoreError>> + Send + '_;

  /// Run a single mutating statement inside its own transaction and return
  /// the number of affected rows. A failed statement is rolled back and its
  /// error returned.
  fn execute(
    &self,
    statement: &'static str,
    params: Vec<Value>,
  ) -> impl Future<Output = Result<usize, StoreError>> + Send + '_;
}
