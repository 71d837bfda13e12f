//! [`SqliteGateway`] — the SQLite implementation of [`Gateway`].

use std::path::Path;

use board_core::store::{Gateway, Row, StoreError, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};

use crate::{Result, error::classify, schema::SCHEMA};

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// A board store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted and shared by
/// every concurrent call.
#[derive(Clone)]
pub struct SqliteGateway {
  conn: tokio_rusqlite::Connection,
}

impl SqliteGateway {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let gateway = Self { conn };
    gateway.init_schema().await?;
    Ok(gateway)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let gateway = Self { conn };
    gateway.init_schema().await?;
    Ok(gateway)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Value conversion ────────────────────────────────────────────────────────

fn to_sql(value: Value) -> SqlValue {
  match value {
    Value::Null       => SqlValue::Null,
    Value::Integer(v) => SqlValue::Integer(v),
    Value::Text(v)    => SqlValue::Text(v),
    Value::Bool(v)    => SqlValue::Integer(i64::from(v)),
  }
}

fn from_sql(idx: usize, name: &str, value: ValueRef<'_>) -> rusqlite::Result<Value> {
  match value {
    ValueRef::Null       => Ok(Value::Null),
    ValueRef::Integer(v) => Ok(Value::Integer(v)),
    ValueRef::Text(raw)  => std::str::from_utf8(raw)
      .map(|text| Value::Text(text.to_owned()))
      .map_err(rusqlite::Error::Utf8Error),
    other => Err(rusqlite::Error::InvalidColumnType(idx, name.to_owned(), other.data_type())),
  }
}

// ─── Gateway impl ────────────────────────────────────────────────────────────

impl Gateway for SqliteGateway {
  async fn query(&self, statement: &'static str, params: Vec<Value>) -> Result<Vec<Row>, StoreError> {
    let params: Vec<SqlValue> = params.into_iter().map(to_sql).collect();

    let raws: Vec<Vec<Value>> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(statement)?;
        let names: Vec<String> =
          stmt.column_names().into_iter().map(str::to_owned).collect();

        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            names
              .iter()
              .enumerate()
              .map(|(i, name)| from_sql(i, name, row.get_ref(i)?))
              .collect::<rusqlite::Result<Vec<_>>>()
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await
      .map_err(classify)?;

    Ok(raws.into_iter().map(Row::new).collect())
  }

  async fn execute(&self, statement: &'static str, params: Vec<Value>) -> Result<usize, StoreError> {
    let params: Vec<SqlValue> = params.into_iter().map(to_sql).collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let outcome = tx
          .prepare_cached(statement)
          .and_then(|mut stmt| stmt.execute(rusqlite::params_from_iter(params.iter())));

        match outcome {
          Ok(affected) => {
            tx.commit()?;
            Ok(affected)
          }
          Err(e) => {
            // The statement's own error is what the caller sees.
            if let Err(rollback) = tx.rollback() {
              tracing::warn!(error = %rollback, statement, "rollback failed");
            }
            Err(e.into())
          }
        }
      })
      .await
      .map_err(classify)
  }
}
