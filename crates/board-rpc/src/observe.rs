//! Observability sink: where finished spans and captured exceptions go.
//!
//! The sink is an explicitly constructed collaborator. `main` builds one,
//! hands an `Arc<dyn Sink>` to the request pipeline, and flushes it on the
//! way out. Nothing reaches it through globals.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use board_core::Code;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use thiserror::Error;

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// 16-byte trace identifier, hex encoded on the wire (32 chars).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(pub [u8; 16]);

/// 8-byte span identifier, hex encoded on the wire (16 chars).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(pub [u8; 8]);

impl TraceId {
  pub fn random() -> Self {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    Self(bytes)
  }
}

impl SpanId {
  pub fn random() -> Self {
    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    Self(bytes)
  }
}

impl FromStr for TraceId {
  type Err = hex::FromHexError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut bytes = [0u8; 16];
    hex::decode_to_slice(s, &mut bytes)?;
    Ok(Self(bytes))
  }
}

impl FromStr for SpanId {
  type Err = hex::FromHexError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut bytes = [0u8; 8];
    hex::decode_to_slice(s, &mut bytes)?;
    Ok(Self(bytes))
  }
}

impl fmt::Display for TraceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&hex::encode(self.0)) }
}

impl fmt::Display for SpanId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&hex::encode(self.0)) }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Final status of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStatus {
  Ok,
  InternalError,
  InvalidArgument,
  FailedPrecondition,
  Undefined,
}

impl SpanStatus {
  /// Only internal, invalid-argument and failed-precondition errors have a
  /// dedicated status; every other failure is `Undefined`.
  pub fn from_code(code: Code) -> Self {
    match code {
      Code::Ok                 => SpanStatus::Ok,
      Code::Internal           => SpanStatus::InternalError,
      Code::InvalidArgument    => SpanStatus::InvalidArgument,
      Code::FailedPrecondition => SpanStatus::FailedPrecondition,
      Code::NotFound           => SpanStatus::Undefined,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      SpanStatus::Ok                 => "ok",
      SpanStatus::InternalError      => "internal_error",
      SpanStatus::InvalidArgument    => "invalid_argument",
      SpanStatus::FailedPrecondition => "failed_precondition",
      SpanStatus::Undefined          => "undefined",
    }
  }
}

/// One finished server span.
#[derive(Debug, Clone)]
pub struct SpanRecord {
  pub trace_id:       TraceId,
  pub span_id:        SpanId,
  pub parent_span_id: Option<SpanId>,
  pub op:             &'static str,
  /// Full method path, e.g. `/board.Board/ListSubjects`.
  pub description:    String,
  pub status:         SpanStatus,
  /// Data frames sent; only counted for streaming calls.
  pub messages:       u64,
  pub started_at:     DateTime<Utc>,
  pub finished_at:    DateTime<Utc>,
}

/// An error reported to the sink, optionally tied to a call.
#[derive(Debug, Clone)]
pub struct Exception {
  pub message:      String,
  pub trace_id:     Option<TraceId>,
  pub method:       Option<String>,
  /// The unary request body, lossily decoded as UTF-8.
  pub request_body: Option<String>,
}

impl Exception {
  /// An exception outside any call, e.g. a fatal startup error.
  pub fn new(message: impl Into<String>) -> Self {
    Self { message: message.into(), trace_id: None, method: None, request_body: None }
  }

  pub fn in_call(message: impl Into<String>, trace_id: TraceId, method: impl Into<String>) -> Self {
    Self {
      message:      message.into(),
      trace_id:     Some(trace_id),
      method:       Some(method.into()),
      request_body: None,
    }
  }

  pub fn with_request_body(mut self, body: Option<String>) -> Self {
    self.request_body = body;
    self
  }
}

// ─── Sink ────────────────────────────────────────────────────────────────────

/// Destination for spans and exceptions.
pub trait Sink: Send + Sync + 'static {
  fn finish_span(&self, span: SpanRecord);

  fn capture_exception(&self, exception: Exception);

  /// Block until buffered events are delivered or `timeout` passes.
  /// Returns `false` on timeout.
  fn flush(&self, _timeout: Duration) -> bool { true }
}

// ─── ActiveSpan ──────────────────────────────────────────────────────────────

/// A span that is still open. Dropping it finishes it; an unsampled span
/// never reaches the sink.
pub struct ActiveSpan {
  sink:    Arc<dyn Sink>,
  sampled: bool,
  record:  SpanRecord,
}

impl ActiveSpan {
  pub fn start(
    sink: Arc<dyn Sink>,
    sampled: bool,
    trace_id: TraceId,
    span_id: SpanId,
    parent_span_id: Option<SpanId>,
    op: &'static str,
    description: impl Into<String>,
  ) -> Self {
    let now = Utc::now();
    Self {
      sink,
      sampled,
      record: SpanRecord {
        trace_id,
        span_id,
        parent_span_id,
        op,
        description: description.into(),
        status: SpanStatus::Ok,
        messages: 0,
        started_at: now,
        finished_at: now,
      },
    }
  }

  pub fn set_status(&mut self, status: SpanStatus) { self.record.status = status; }

  pub fn record_message(&mut self) { self.record.messages += 1; }

  /// Report an exception tied to this span's trace.
  pub fn capture(&self, message: impl Into<String>) {
    self.sink.capture_exception(Exception::in_call(
      message,
      self.record.trace_id,
      self.record.description.clone(),
    ));
  }

  pub fn finish(self) {}
}

impl Drop for ActiveSpan {
  fn drop(&mut self) {
    if !self.sampled {
      return;
    }
    let mut record = self.record.clone();
    record.finished_at = Utc::now();
    self.sink.finish_span(record);
  }
}

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
  pub environment:        String,
  pub server_name:        String,
  /// Fraction of calls whose spans reach the sink, in `0.0..=1.0`.
  pub traces_sample_rate: f64,
}

impl Default for ObservabilityConfig {
  fn default() -> Self {
    Self {
      environment:        "localhost".to_string(),
      server_name:        "unknown".to_string(),
      traces_sample_rate: 1.0,
    }
  }
}

#[derive(Debug, Error)]
pub enum ObserveError {
  #[error("traces_sample_rate must be within 0.0..=1.0, got {0}")]
  SampleRate(f64),
}

/// Head sampling decision, made once per call.
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
  rate: f64,
}

impl Sampler {
  pub fn new(rate: f64) -> Result<Self, ObserveError> {
    if !(0.0..=1.0).contains(&rate) {
      return Err(ObserveError::SampleRate(rate));
    }
    Ok(Self { rate })
  }

  pub fn always() -> Self { Self { rate: 1.0 } }

  pub fn sample(&self) -> bool {
    if self.rate >= 1.0 {
      return true;
    }
    if self.rate <= 0.0 {
      return false;
    }
    (OsRng.next_u32() as f64 / u32::MAX as f64) < self.rate
  }
}

// ─── LogSink ─────────────────────────────────────────────────────────────────

/// Writes spans and exceptions as structured `tracing` events.
pub struct LogSink {
  environment: String,
  server_name: String,
}

impl LogSink {
  pub fn new(config: &ObservabilityConfig) -> Result<Self, ObserveError> {
    Sampler::new(config.traces_sample_rate)?;
    Ok(Self {
      environment: config.environment.clone(),
      server_name: config.server_name.clone(),
    })
  }
}

impl Sink for LogSink {
  fn finish_span(&self, span: SpanRecord) {
    let duration_ms = (span.finished_at - span.started_at).num_milliseconds();
    tracing::info!(
      target: "board::span",
      environment = %self.environment,
      server_name = %self.server_name,
      trace_id = %span.trace_id,
      span_id = %span.span_id,
      parent_span_id = ?span.parent_span_id.map(|id| id.to_string()),
      op = span.op,
      status = span.status.as_str(),
      messages = span.messages,
      duration_ms,
      "{}",
      span.description,
    );
  }

  fn capture_exception(&self, exception: Exception) {
    tracing::error!(
      target: "board::exception",
      environment = %self.environment,
      server_name = %self.server_name,
      trace_id = ?exception.trace_id.map(|id| id.to_string()),
      method = ?exception.method,
      request_body = ?exception.request_body,
      "{}",
      exception.message,
    );
  }
}

// ─── MemorySink ──────────────────────────────────────────────────────────────

/// Keeps everything in memory; used by tests and local tooling.
#[derive(Default)]
pub struct MemorySink {
  spans:      Mutex<Vec<SpanRecord>>,
  exceptions: Mutex<Vec<Exception>>,
}

impl MemorySink {
  pub fn spans(&self) -> Vec<SpanRecord> { self.spans.lock().clone() }

  pub fn exceptions(&self) -> Vec<Exception> { self.exceptions.lock().clone() }
}

impl Sink for MemorySink {
  fn finish_span(&self, span: SpanRecord) { self.spans.lock().push(span); }

  fn capture_exception(&self, exception: Exception) { self.exceptions.lock().push(exception); }
}
