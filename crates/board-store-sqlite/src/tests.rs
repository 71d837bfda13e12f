//! Integration tests for `SqliteGateway` and the board operations against an
//! in-memory database.

use board_core::{
  Board, Code, Error,
  question::NewQuestion,
  store::{Gateway, StoreError, StoreErrorKind, Value},
  subject::NewSubject,
};

use crate::{SqliteGateway, error::classify};

async fn gateway() -> SqliteGateway {
  SqliteGateway::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn board() -> Board<SqliteGateway> {
  Board::new(gateway().await)
}

async fn subject(b: &Board<SqliteGateway>, title: &str) -> i64 {
  b.create_subject(NewSubject { title: title.into() })
    .await
    .unwrap()
    .id
}

async fn set_likes(b: &Board<SqliteGateway>, question_id: i64, likes: i64) {
  b.gateway()
    .execute(
      "UPDATE question SET likes = ?1 WHERE id = ?2",
      vec![Value::from(likes), Value::from(question_id)],
    )
    .await
    .unwrap();
}

async fn disable(b: &Board<SqliteGateway>, subject_id: i64) {
  b.gateway()
    .execute(
      "UPDATE subject SET enabled = ?1 WHERE id = ?2",
      vec![Value::from(false), Value::from(subject_id)],
    )
    .await
    .unwrap();
}

async fn question_count(g: &SqliteGateway) -> i64 {
  let rows = g
    .query("SELECT COUNT(*) FROM question", vec![])
    .await
    .unwrap();
  rows[0].get_i64(0).unwrap()
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn execute_reports_affected_rows() {
  let g = gateway().await;
  let n = g
    .execute("INSERT INTO subject (title) VALUES (?1)", vec![Value::from("one")])
    .await
    .unwrap();
  assert_eq!(n, 1);

  let n = g
    .execute("UPDATE subject SET title = ?1 WHERE id = ?2", vec![Value::from("x"), Value::from(999)])
    .await
    .unwrap();
  assert_eq!(n, 0);
}

#[tokio::test]
async fn query_binds_parameters_not_text() {
  let g = gateway().await;
  let hostile = "x'); DROP TABLE subject; --";
  g.execute("INSERT INTO subject (title) VALUES (?1)", vec![Value::from(hostile)])
    .await
    .unwrap();

  let rows = g
    .query("SELECT id, title, enabled FROM subject WHERE title = ?1", vec![Value::from(hostile)])
    .await
    .unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].get_str(1).unwrap(), hostile);
  assert!(rows[0].get_bool(2).unwrap(), "enabled defaults to true");
}

#[tokio::test]
async fn failed_statement_leaves_no_partial_write() {
  let g = gateway().await;
  g.execute("INSERT INTO subject (title) VALUES (?1)", vec![Value::from("s")])
    .await
    .unwrap();

  // Second row violates NOT NULL after the first was written.
  let err = g
    .execute(
      "INSERT INTO question (question, subject_id) SELECT 'ok', 1 UNION ALL SELECT NULL, 1",
      vec![],
    )
    .await
    .unwrap_err();
  assert_eq!(err.kind(), StoreErrorKind::Fatal);
  assert_eq!(question_count(&g).await, 0);
}

#[tokio::test]
async fn foreign_key_violation_is_fatal() {
  let g = gateway().await;
  let err = g
    .execute(
      "INSERT INTO question (question, subject_id) VALUES (?1, ?2)",
      vec![Value::from("orphan"), Value::from(42)],
    )
    .await
    .unwrap_err();
  assert!(!err.is_transient());
}

#[tokio::test]
async fn malformed_sql_is_fatal() {
  let g = gateway().await;
  let err = g.query("SELEC nothing", vec![]).await.unwrap_err();
  assert_eq!(err.kind(), StoreErrorKind::Fatal);
}

#[test]
fn busy_database_is_transient() {
  let busy = tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
    None,
  ));
  let err: StoreError = classify(busy);
  assert!(err.is_transient());

  let closed: StoreError = classify(tokio_rusqlite::Error::ConnectionClosed);
  assert_eq!(closed.kind(), StoreErrorKind::Fatal);
}

// ─── Subjects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn subjects_are_listed_by_ascending_id() {
  let b = board().await;
  let first  = subject(&b, "zeta").await;
  let second = subject(&b, "alpha").await;

  let ids: Vec<i64> = b.list_subjects().await.unwrap().iter().map(|s| s.id).collect();
  assert_eq!(ids, [first, second]);
}

#[tokio::test]
async fn create_subject_returns_stored_row() {
  let b = board().await;
  let created = b.create_subject(NewSubject { title: "rust".into() }).await.unwrap();
  assert!(created.id > 0);
  assert!(created.enabled);

  let fetched = b.get_subject(created.id).await.unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn duplicate_titles_return_newest() {
  let b = board().await;
  let first  = subject(&b, "dup").await;
  let second = subject(&b, "dup").await;
  assert!(second > first);
}

#[tokio::test]
async fn get_missing_subject_is_zero_value() {
  let b = board().await;
  let s = b.get_subject(12345).await.unwrap();
  assert_eq!(s.id, 0);
  assert!(s.title.is_empty());
}

#[tokio::test]
async fn delete_subject_removes_row() {
  let b = board().await;
  let id = subject(&b, "gone").await;
  b.delete_subject(id).await.unwrap();
  assert_eq!(b.get_subject(id).await.unwrap().id, 0);
}

#[tokio::test]
async fn delete_subject_with_questions_is_store_error() {
  let b = board().await;
  let id = subject(&b, "busy").await;
  b.create_question(NewQuestion { subject_id: id, question: "q".into() })
    .await
    .unwrap();

  let err = b.delete_subject(id).await.unwrap_err();
  assert_eq!(err.code(), Code::Internal);
}

// ─── Questions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn created_question_is_listed_with_zero_likes() {
  let b = board().await;
  let id = subject(&b, "open").await;
  b.create_question(NewQuestion { subject_id: id, question: "why?".into() })
    .await
    .unwrap();

  let questions = b.list_questions(id).await.unwrap();
  assert_eq!(questions.len(), 1);
  assert_eq!(questions[0].question, "why?");
  assert_eq!(questions[0].subject_id, id);
  assert_eq!(questions[0].likes, 0);
}

#[tokio::test]
async fn listing_orders_by_likes_then_text() {
  let b = board().await;
  let id = subject(&b, "ordered").await;

  for (text, likes) in [("b", 3), ("a", 3), ("c", 1)] {
    b.create_question(NewQuestion { subject_id: id, question: text.into() })
      .await
      .unwrap();
    let qid = b
      .list_questions(id)
      .await
      .unwrap()
      .into_iter()
      .find(|q| q.question == text)
      .unwrap()
      .id;
    set_likes(&b, qid, likes).await;
  }

  let order: Vec<(String, i64)> = b
    .list_questions(id)
    .await
    .unwrap()
    .into_iter()
    .map(|q| (q.question, q.likes))
    .collect();
  assert_eq!(order, [("a".to_string(), 3), ("b".to_string(), 3), ("c".to_string(), 1)]);
}

#[tokio::test]
async fn disabled_subject_rejects_question_without_insert() {
  let b = board().await;
  let id = subject(&b, "closed").await;
  disable(&b, id).await;

  let err = b
    .create_question(NewQuestion { subject_id: id, question: "late".into() })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Precondition(_)));
  assert_eq!(question_count(b.gateway()).await, 0);
}

#[tokio::test]
async fn unknown_subject_rejects_question_without_insert() {
  let b = board().await;
  let err = b
    .create_question(NewQuestion { subject_id: 99999, question: "lost".into() })
    .await
    .unwrap_err();
  assert_eq!(err.code(), Code::NotFound);
  assert_eq!(question_count(b.gateway()).await, 0);
}

#[tokio::test]
async fn listing_unknown_subject_is_not_found() {
  let b = board().await;
  assert_eq!(b.list_questions(404).await.unwrap_err().code(), Code::NotFound);
}

#[tokio::test]
async fn delete_question_removes_row() {
  let b = board().await;
  let id = subject(&b, "s").await;
  b.create_question(NewQuestion { subject_id: id, question: "q".into() })
    .await
    .unwrap();
  let qid = b.list_questions(id).await.unwrap()[0].id;

  b.delete_question(qid).await.unwrap();
  assert_eq!(b.get_question(qid).await.unwrap().id, 0);
}

// ─── Likes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn like_stops_at_the_largest_count() {
  let b = board().await;
  let id = subject(&b, "s").await;
  b.create_question(NewQuestion { subject_id: id, question: "q".into() })
    .await
    .unwrap();
  let qid = b.list_questions(id).await.unwrap()[0].id;
  set_likes(&b, qid, i64::MAX).await;

  b.like(qid).await.unwrap();

  let listed = b.list_questions(id).await.unwrap();
  assert_eq!(listed[0].likes, i64::MAX);
  b.unlike(qid).await.unwrap();
  assert_eq!(b.get_question(qid).await.unwrap().likes, i64::MAX - 1);
}

#[tokio::test]
async fn like_then_unlike_round_trips() {
  let b = board().await;
  let id = subject(&b, "s").await;
  b.create_question(NewQuestion { subject_id: id, question: "q".into() })
    .await
    .unwrap();
  let qid = b.list_questions(id).await.unwrap()[0].id;
  set_likes(&b, qid, 4).await;

  b.like(qid).await.unwrap();
  assert_eq!(b.get_question(qid).await.unwrap().likes, 5);

  b.unlike(qid).await.unwrap();
  assert_eq!(b.get_question(qid).await.unwrap().likes, 4);
}

#[tokio::test]
async fn unlike_at_zero_is_rejected_and_unchanged() {
  let b = board().await;
  let id = subject(&b, "s").await;
  b.create_question(NewQuestion { subject_id: id, question: "q".into() })
    .await
    .unwrap();
  let qid = b.list_questions(id).await.unwrap()[0].id;

  let err = b.unlike(qid).await.unwrap_err();
  assert_eq!(err.code(), Code::FailedPrecondition);
  assert_eq!(b.get_question(qid).await.unwrap().likes, 0);
}
