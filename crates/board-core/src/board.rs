//! [`Board`] — the request/response contracts of the discussion board.
//!
//! Each operation is a single logical step over store state: reads re-query
//! the store every time and mutations are one statement each. Validation
//! happens before any mutation, in the order documented per operation.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  question::{NewQuestion, Question},
  store::{Gateway, StoreError, Value},
  subject::{NewSubject, Subject},
};

// ─── Statements ──────────────────────────────────────────────────────────────

const LIST_SUBJECTS: &str = "SELECT id, title, enabled FROM subject ORDER BY id ASC";
const SELECT_SUBJECT: &str = "SELECT id, title, enabled FROM subject WHERE id = ?1";
const SELECT_SUBJECT_BY_TITLE: &str =
  "SELECT id, title, enabled FROM subject WHERE title = ?1 ORDER BY id DESC LIMIT 1";
const INSERT_SUBJECT: &str = "INSERT INTO subject (title) VALUES (?1)";
const DELETE_SUBJECT: &str = "DELETE FROM subject WHERE id = ?1";

const LIST_QUESTIONS: &str = "SELECT id, question, subject_id, likes FROM question
   WHERE subject_id = ?1
   ORDER BY likes DESC, question ASC";
const SELECT_QUESTION: &str =
  "SELECT id, question, subject_id, likes FROM question WHERE id = ?1";
const INSERT_QUESTION: &str = "INSERT INTO question (question, subject_id) VALUES (?1, ?2)";
const DELETE_QUESTION: &str = "DELETE FROM question WHERE id = ?1";
// Stops at i64::MAX; past it SQLite would store the count as a REAL.
const ADD_LIKE: &str =
  "UPDATE question SET likes = likes + 1 WHERE id = ?1 AND likes < 9223372036854775807";
const SUB_LIKE: &str = "UPDATE question SET likes = likes - 1 WHERE id = ?1";

// ─── Validation mode ─────────────────────────────────────────────────────────

/// How strictly lookups that match nothing are treated.
///
/// `like` is a single conditional update and acknowledges a missing question
/// in both modes; only `unlike` reads the question first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validation {
  /// An empty question listing is reported as an unknown subject, and
  /// unliking a missing question is reported as not found.
  #[default]
  Strict,
  /// An empty listing is returned as-is; unliking a missing question fails
  /// the non-negative precondition.
  Lenient,
}

// ─── Board ───────────────────────────────────────────────────────────────────

/// The board operations over a store gateway.
///
/// The gateway is owned by the board and handed in at construction; no
/// operation looks it up from ambient state.
pub struct Board<G> {
  gateway:    G,
  validation: Validation,
}

impl<G: Gateway> Board<G> {
  pub fn new(gateway: G) -> Self {
    Self { gateway, validation: Validation::default() }
  }

  pub fn with_validation(mut self, validation: Validation) -> Self {
    self.validation = validation;
    self
  }

  pub fn gateway(&self) -> &G { &self.gateway }

  pub fn validation(&self) -> Validation { self.validation }

  // ── Subjects ──────────────────────────────────────────────────────────────

  /// All subjects in ascending id order.
  #[tracing::instrument(skip(self), level = "debug", err)]
  pub async fn list_subjects(&self) -> Result<Vec<Subject>> {
    let rows = self.gateway.query(LIST_SUBJECTS, vec![]).await?;
    rows.iter().map(Subject::from_row).collect()
  }

  /// The subject with `id`, or the zero-value subject when none matches.
  #[tracing::instrument(skip(self), level = "debug", err)]
  pub async fn get_subject(&self, id: i64) -> Result<Subject> {
    Ok(self.select_subject(id).await?.unwrap_or_default())
  }

  /// Insert a subject and return it as re-read by title.
  #[tracing::instrument(skip(self), level = "debug", err)]
  pub async fn create_subject(&self, input: NewSubject) -> Result<Subject> {
    if input.title.is_empty() {
      return Err(Error::validation("title must not be empty"));
    }

    self
      .gateway
      .execute(INSERT_SUBJECT, vec![Value::from(input.title.as_str())])
      .await?;

    let rows = self
      .gateway
      .query(SELECT_SUBJECT_BY_TITLE, vec![Value::from(input.title)])
      .await?;
    match rows.first() {
      Some(row) => Subject::from_row(row),
      None => Err(StoreError::decode("inserted subject could not be read back").into()),
    }
  }

  /// Hard delete; questions still referencing the subject are left to the
  /// store's constraints.
  #[tracing::instrument(skip(self), level = "debug", err)]
  pub async fn delete_subject(&self, id: i64) -> Result<()> {
    if id == 0 {
      return Err(Error::validation("subject id must not be zero"));
    }
    self.gateway.execute(DELETE_SUBJECT, vec![Value::from(id)]).await?;
    Ok(())
  }

  // ── Questions ─────────────────────────────────────────────────────────────

  /// Questions under a subject, most liked first, ties by text ascending.
  #[tracing::instrument(skip(self), level = "debug", err)]
  pub async fn list_questions(&self, subject_id: i64) -> Result<Vec<Question>> {
    let rows = self
      .gateway
      .query(LIST_QUESTIONS, vec![Value::from(subject_id)])
      .await?;

    if rows.is_empty() && self.validation == Validation::Strict {
      return Err(Error::NotFound { entity: "subject", id: subject_id });
    }

    rows.iter().map(Question::from_row).collect()
  }

  /// The question with `id`, or the zero-value question when none matches.
  #[tracing::instrument(skip(self), level = "debug", err)]
  pub async fn get_question(&self, id: i64) -> Result<Question> {
    Ok(self.select_question(id).await?.unwrap_or_default())
  }

  /// Checks run in a fixed order and each one short-circuits: the subject
  /// must exist, then be enabled, then the text must be non-empty. Only
  /// then is the row inserted.
  #[tracing::instrument(skip(self), level = "debug", err)]
  pub async fn create_question(&self, input: NewQuestion) -> Result<()> {
    let subject = self
      .select_subject(input.subject_id)
      .await?
      .ok_or(Error::NotFound { entity: "subject", id: input.subject_id })?;

    if !subject.enabled {
      return Err(Error::precondition(format!("subject {} is disabled", subject.id)));
    }

    if input.question.is_empty() {
      return Err(Error::validation("question must not be empty"));
    }

    self
      .gateway
      .execute(
        INSERT_QUESTION,
        vec![Value::from(input.question), Value::from(input.subject_id)],
      )
      .await?;
    Ok(())
  }

  #[tracing::instrument(skip(self), level = "debug", err)]
  pub async fn delete_question(&self, id: i64) -> Result<()> {
    if id == 0 {
      return Err(Error::validation("question id must not be zero"));
    }
    self.gateway.execute(DELETE_QUESTION, vec![Value::from(id)]).await?;
    Ok(())
  }

  // ── Likes ─────────────────────────────────────────────────────────────────

  /// Matching no row is not an error, whether the question is missing or
  /// already at the largest count.
  #[tracing::instrument(skip(self), level = "debug", err)]
  pub async fn like(&self, question_id: i64) -> Result<()> {
    self.gateway.execute(ADD_LIKE, vec![Value::from(question_id)]).await?;
    Ok(())
  }

  /// The non-negative check and the decrement are two separate store round
  /// trips. Two concurrent unlikes of a question with one like can both pass
  /// the check.
  #[tracing::instrument(skip(self), level = "debug", err)]
  pub async fn unlike(&self, question_id: i64) -> Result<()> {
    let question = match self.select_question(question_id).await? {
      Some(q) => q,
      None if self.validation == Validation::Strict => {
        return Err(Error::NotFound { entity: "question", id: question_id });
      }
      None => Question::default(),
    };

    if question.likes <= 0 {
      return Err(Error::precondition("like count can not be negative"));
    }

    self.gateway.execute(SUB_LIKE, vec![Value::from(question_id)]).await?;
    Ok(())
  }

  // ── Lookups ───────────────────────────────────────────────────────────────

  async fn select_subject(&self, id: i64) -> Result<Option<Subject>> {
    let rows = self.gateway.query(SELECT_SUBJECT, vec![Value::from(id)]).await?;
    rows.first().map(Subject::from_row).transpose()
  }

  async fn select_question(&self, id: i64) -> Result<Option<Question>> {
    let rows = self.gateway.query(SELECT_QUESTION, vec![Value::from(id)]).await?;
    rows.first().map(Question::from_row).transpose()
  }
}
