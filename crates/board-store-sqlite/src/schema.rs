//! SQL schema for the board's SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS subject (
    id       INTEGER PRIMARY KEY,
    title    TEXT    NOT NULL,      -- uniqueness is not enforced
    enabled  BOOLEAN NOT NULL DEFAULT 1
);

-- likes is only ever changed by +1/-1 updates.
CREATE TABLE IF NOT EXISTS question (
    id          INTEGER PRIMARY KEY,
    question    TEXT    NOT NULL,
    subject_id  INTEGER NOT NULL REFERENCES subject(id),
    likes       INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS question_subject_idx ON question(subject_id, likes DESC, question);

PRAGMA user_version = 1;
";
