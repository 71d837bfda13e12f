//! Interceptor chain wrapped around every RPC call.
//!
//! Layers, outermost first:
//! 1. [`TraceLayer`] opens the call's span and classifies its outcome.
//! 2. [`InjectLayer`] makes the shared board handle visible to the handler.
//!
//! Handlers report failures by attaching a [`Failure`] to the response; the
//! trace layer reads it back to pick the span status, and falls back to the
//! HTTP status for responses the router produced on its own.

mod body;
pub mod inject;
pub mod trace;

use axum::http::{Request, header};
use board_core::Code;

use crate::observe::{SpanId, TraceId};

pub use inject::{InjectLayer, InjectService};
pub use trace::{TraceLayer, TraceService};

pub const TRACE_ID_HEADER: &str = "traceid";
pub const SPAN_ID_HEADER: &str = "spanid";

/// Media type that selects the streaming form of a call.
pub const NDJSON: &str = "application/x-ndjson";

/// Op recorded on RPC server spans.
pub const SERVER_OP: &str = "grpc.server";

/// Op recorded on REST request spans.
pub const HTTP_OP: &str = "http.server";

// ─── Call context ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
  Unary,
  /// The response is a sequence of frames, one record each.
  Streaming,
}

impl CallKind {
  pub fn of<B>(req: &Request<B>) -> Self {
    let wants_stream = [header::ACCEPT, header::CONTENT_TYPE].iter().any(|name| {
      req
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(NDJSON))
    });
    if wants_stream { CallKind::Streaming } else { CallKind::Unary }
  }
}

/// Per-call identity, inserted into request extensions by [`TraceLayer`].
#[derive(Debug, Clone)]
pub struct CallContext {
  pub trace_id:       TraceId,
  pub span_id:        SpanId,
  pub parent_span_id: Option<SpanId>,
  pub method:         String,
  pub kind:           CallKind,
}

/// Attached to error responses so outer layers can see the call's outcome.
#[derive(Debug, Clone)]
pub struct Failure {
  pub code:    Code,
  pub message: String,
}
