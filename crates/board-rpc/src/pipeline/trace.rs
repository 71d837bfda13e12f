//! Outermost interceptor: trace propagation, server span, outcome capture.

use std::{
  future::Future,
  pin::Pin,
  str::FromStr,
  sync::Arc,
  task::{Context, Poll},
};

use axum::{
  body::Body,
  http::{HeaderMap, HeaderValue, Request, StatusCode},
  response::{IntoResponse as _, Response},
};
use thiserror::Error;
use tower::{Layer, Service};
use tracing::Instrument as _;

use super::{
  CallContext, CallKind, Failure, SERVER_OP, SPAN_ID_HEADER, TRACE_ID_HEADER, body::TracedStream,
};
use crate::{
  error::RpcError,
  observe::{ActiveSpan, Exception, Sampler, Sink, SpanId, SpanStatus, TraceId},
};

/// Largest unary request body buffered for exception context.
const MAX_UNARY_BODY: usize = 2 * 1024 * 1024;

// ─── Header decoding ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum HeaderError {
  #[error("{header} metadata is not visible ASCII")]
  Opaque { header: &'static str },

  #[error("{header} metadata is not a valid id: {source}")]
  Hex {
    header: &'static str,
    #[source]
    source: hex::FromHexError,
  },
}

/// `Ok(None)` when the header is absent or empty.
fn read_id<T>(headers: &HeaderMap, header: &'static str) -> Result<Option<T>, HeaderError>
where
  T: FromStr<Err = hex::FromHexError>,
{
  let Some(value) = headers.get(header) else {
    return Ok(None);
  };
  let text = value.to_str().map_err(|_| HeaderError::Opaque { header })?;
  if text.is_empty() {
    return Ok(None);
  }
  text
    .parse()
    .map(Some)
    .map_err(|source| HeaderError::Hex { header, source })
}

/// Span status for a response that carries no [`Failure`], such as a route
/// the router itself rejected.
fn status_from_http(status: StatusCode) -> SpanStatus {
  match status {
    s if s.is_success() => SpanStatus::Ok,
    StatusCode::BAD_REQUEST => SpanStatus::InvalidArgument,
    StatusCode::PRECONDITION_FAILED => SpanStatus::FailedPrecondition,
    s if s.is_server_error() => SpanStatus::InternalError,
    _ => SpanStatus::Undefined,
  }
}

// ─── Layer ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TraceLayer {
  sink:    Arc<dyn Sink>,
  sampler: Sampler,
  op:      &'static str,
}

impl TraceLayer {
  pub fn new(sink: Arc<dyn Sink>, sampler: Sampler) -> Self {
    Self { sink, sampler, op: SERVER_OP }
  }

  /// Record spans under `op` instead of [`SERVER_OP`].
  pub fn with_op(mut self, op: &'static str) -> Self {
    self.op = op;
    self
  }
}

impl<S> Layer<S> for TraceLayer {
  type Service = TraceService<S>;

  fn layer(&self, inner: S) -> Self::Service {
    TraceService { inner, sink: self.sink.clone(), sampler: self.sampler, op: self.op }
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TraceService<S> {
  inner:   S,
  sink:    Arc<dyn Sink>,
  sampler: Sampler,
  op:      &'static str,
}

impl<S> Service<Request<Body>> for TraceService<S>
where
  S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
  S::Future: Send,
{
  type Response = Response;
  type Error = S::Error;
  type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

  fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
    self.inner.poll_ready(cx)
  }

  fn call(&mut self, mut req: Request<Body>) -> Self::Future {
    // The clone is not necessarily ready; keep the one that was polled.
    let clone = self.inner.clone();
    let mut inner = std::mem::replace(&mut self.inner, clone);

    let method = req.uri().path().to_owned();
    let kind = CallKind::of(&req);

    let mut rejected = Vec::new();
    let trace_id = read_id::<TraceId>(req.headers(), TRACE_ID_HEADER)
      .unwrap_or_else(|e| {
        rejected.push(e);
        None
      })
      .unwrap_or_else(TraceId::random);
    let parent_span_id = read_id::<SpanId>(req.headers(), SPAN_ID_HEADER).unwrap_or_else(|e| {
      rejected.push(e);
      None
    });
    let span_id = SpanId::random();

    for e in rejected {
      tracing::warn!(%trace_id, method = %method, "{e}");
      self
        .sink
        .capture_exception(Exception::in_call(e.to_string(), trace_id, method.as_str()));
    }

    req.extensions_mut().insert(CallContext {
      trace_id,
      span_id,
      parent_span_id,
      method: method.clone(),
      kind,
    });

    let mut active = ActiveSpan::start(
      self.sink.clone(),
      self.sampler.sample(),
      trace_id,
      span_id,
      parent_span_id,
      self.op,
      method.as_str(),
    );
    let sink = self.sink.clone();
    let span = tracing::info_span!(
      "rpc",
      method = %method,
      trace_id = %trace_id,
      span_id = %span_id,
      parent_span_id = ?parent_span_id.map(|id| id.to_string()),
    );

    Box::pin(
      async move {
        let mut request_body = None;
        let buffered = if kind == CallKind::Unary {
          let (parts, body) = req.into_parts();
          axum::body::to_bytes(body, MAX_UNARY_BODY).await.map(|bytes| {
            if !bytes.is_empty() {
              request_body = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            Request::from_parts(parts, Body::from(bytes))
          })
        } else {
          Ok(req)
        };
        let mut response = match buffered {
          Ok(req) => inner.call(req).await?,
          Err(e) => RpcError::Message(e.to_string()).into_response(),
        };

        let failure = response.extensions().get::<Failure>().cloned();
        let failed = failure.is_some() || !response.status().is_success();
        match &failure {
          Some(failure) => {
            active.set_status(SpanStatus::from_code(failure.code));
            tracing::error!(code = %failure.code, "{method} failed: {}", failure.message);
            sink.capture_exception(
              Exception::in_call(failure.message.clone(), trace_id, method.as_str())
                .with_request_body(request_body),
            );
          }
          None if failed => {
            let status = response.status();
            active.set_status(status_from_http(status));
            tracing::error!(%status, "{method} failed");
            sink.capture_exception(
              Exception::in_call(format!("{method} answered {status}"), trace_id, method.as_str())
                .with_request_body(request_body),
            );
          }
          None => active.set_status(SpanStatus::Ok),
        }

        if let Ok(value) = HeaderValue::from_str(&trace_id.to_string()) {
          response.headers_mut().insert(TRACE_ID_HEADER, value);
        }

        if kind == CallKind::Unary || failed {
          active.finish();
          return Ok(response);
        }

        let (parts, body) = response.into_parts();
        let stream = TracedStream::new(body.into_data_stream(), active, tracing::Span::current());
        Ok(Response::from_parts(parts, Body::from_stream(stream)))
      }
      .instrument(span),
    )
  }
}

#[cfg(test)]
mod tests {
  use std::convert::Infallible;

  use board_core::Code;
  use tower::{ServiceBuilder, ServiceExt as _, service_fn};

  use super::*;
  use crate::{observe::MemorySink, pipeline::HTTP_OP};

  const TRACE: &str = "0af7651916cd43dd8448eb211c80319c";
  const PARENT: &str = "b7ad6b7169203331";

  async fn echo_context(req: Request<Body>) -> Result<Response, Infallible> {
    let ctx = req.extensions().get::<CallContext>().cloned().unwrap();
    Ok(Response::new(Body::from(ctx.trace_id.to_string())))
  }

  async fn fail_with(code: Code) -> Result<Response, Infallible> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
      .extensions_mut()
      .insert(Failure { code, message: "nope".into() });
    Ok(response)
  }

  /// Fails with the request body as its message.
  async fn fail_with_body(req: Request<Body>) -> Result<Response, Infallible> {
    let bytes = axum::body::to_bytes(req.into_body(), usize::MAX).await.unwrap();
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.extensions_mut().insert(Failure {
      code:    Code::Internal,
      message: String::from_utf8_lossy(&bytes).into_owned(),
    });
    Ok(response)
  }

  async fn answer(status: StatusCode) -> Result<Response, Infallible> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    Ok(response)
  }

  fn request(headers: &[(&'static str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/board.Board/GetSubject");
    for (name, value) in headers {
      builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
  }

  #[tokio::test]
  async fn inbound_ids_are_propagated() {
    let sink = Arc::new(MemorySink::default());
    let svc = ServiceBuilder::new()
      .layer(TraceLayer::new(sink.clone(), Sampler::always()))
      .service(service_fn(echo_context));

    let resp = svc
      .oneshot(request(&[(TRACE_ID_HEADER, TRACE), (SPAN_ID_HEADER, PARENT)]))
      .await
      .unwrap();
    assert_eq!(resp.headers()[TRACE_ID_HEADER], TRACE);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], TRACE.as_bytes());

    let spans = sink.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].trace_id.to_string(), TRACE);
    assert_eq!(spans[0].parent_span_id.map(|id| id.to_string()).as_deref(), Some(PARENT));
    assert_ne!(spans[0].span_id.to_string(), PARENT);
    assert_eq!(spans[0].op, SERVER_OP);
    assert_eq!(spans[0].description, "/board.Board/GetSubject");
    assert_eq!(spans[0].status, SpanStatus::Ok);
    assert!(sink.exceptions().is_empty());
  }

  #[tokio::test]
  async fn invalid_trace_id_is_captured_and_replaced() {
    let sink = Arc::new(MemorySink::default());
    let svc = ServiceBuilder::new()
      .layer(TraceLayer::new(sink.clone(), Sampler::always()))
      .service(service_fn(echo_context));

    let resp = svc
      .oneshot(request(&[(TRACE_ID_HEADER, "not-hex")]))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let exceptions = sink.exceptions();
    assert_eq!(exceptions.len(), 1);
    assert!(exceptions[0].message.contains(TRACE_ID_HEADER));

    let spans = sink.spans();
    assert_eq!(spans.len(), 1);
    assert_ne!(spans[0].trace_id.to_string(), "not-hex");
    assert_eq!(exceptions[0].trace_id, Some(spans[0].trace_id));
  }

  #[tokio::test]
  async fn invalid_span_id_leaves_no_parent() {
    let sink = Arc::new(MemorySink::default());
    let svc = ServiceBuilder::new()
      .layer(TraceLayer::new(sink.clone(), Sampler::always()))
      .service(service_fn(echo_context));

    svc.oneshot(request(&[(SPAN_ID_HEADER, "abc")])).await.unwrap();
    assert_eq!(sink.exceptions().len(), 1);
    assert!(sink.spans()[0].parent_span_id.is_none());
  }

  #[tokio::test]
  async fn failures_set_status_and_are_captured() {
    for (code, status) in [
      (Code::Internal, SpanStatus::InternalError),
      (Code::InvalidArgument, SpanStatus::InvalidArgument),
      (Code::FailedPrecondition, SpanStatus::FailedPrecondition),
      (Code::NotFound, SpanStatus::Undefined),
    ] {
      let sink = Arc::new(MemorySink::default());
      let svc = ServiceBuilder::new()
        .layer(TraceLayer::new(sink.clone(), Sampler::always()))
        .service(service_fn(move |_req: Request<Body>| fail_with(code)));

      svc.oneshot(request(&[])).await.unwrap();
      assert_eq!(sink.spans()[0].status, status, "{code}");
      assert_eq!(sink.exceptions().len(), 1);
    }
  }

  #[tokio::test]
  async fn unsampled_calls_still_capture_failures() {
    let sink = Arc::new(MemorySink::default());
    let svc = ServiceBuilder::new()
      .layer(TraceLayer::new(sink.clone(), Sampler::new(0.0).unwrap()))
      .service(service_fn(|_req: Request<Body>| fail_with(Code::Internal)));

    svc.oneshot(request(&[])).await.unwrap();
    assert!(sink.spans().is_empty());
    assert_eq!(sink.exceptions().len(), 1);
  }

  #[tokio::test]
  async fn empty_id_headers_count_as_absent() {
    let sink = Arc::new(MemorySink::default());
    let svc = ServiceBuilder::new()
      .layer(TraceLayer::new(sink.clone(), Sampler::always()))
      .service(service_fn(echo_context));

    let resp = svc
      .oneshot(request(&[(TRACE_ID_HEADER, ""), (SPAN_ID_HEADER, "")]))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(sink.exceptions().is_empty());

    let spans = sink.spans();
    assert_eq!(spans.len(), 1);
    assert!(spans[0].parent_span_id.is_none());
    assert_eq!(resp.headers()[TRACE_ID_HEADER], spans[0].trace_id.to_string().as_str());
  }

  #[tokio::test]
  async fn error_statuses_without_failure_are_not_ok() {
    for (code, status) in [
      (StatusCode::NOT_FOUND, SpanStatus::Undefined),
      (StatusCode::METHOD_NOT_ALLOWED, SpanStatus::Undefined),
      (StatusCode::BAD_REQUEST, SpanStatus::InvalidArgument),
      (StatusCode::PRECONDITION_FAILED, SpanStatus::FailedPrecondition),
      (StatusCode::INTERNAL_SERVER_ERROR, SpanStatus::InternalError),
    ] {
      let sink = Arc::new(MemorySink::default());
      let svc = ServiceBuilder::new()
        .layer(TraceLayer::new(sink.clone(), Sampler::always()))
        .service(service_fn(move |_req: Request<Body>| answer(code)));

      let resp = svc.oneshot(request(&[])).await.unwrap();
      assert_eq!(resp.status(), code);
      assert_eq!(sink.spans()[0].status, status, "{code}");

      let exceptions = sink.exceptions();
      assert_eq!(exceptions.len(), 1, "{code}");
      assert!(exceptions[0].message.contains(code.as_str()));
      assert_eq!(exceptions[0].method.as_deref(), Some("/board.Board/GetSubject"));
    }
  }

  #[tokio::test]
  async fn exceptions_carry_the_unary_request_body() {
    let sink = Arc::new(MemorySink::default());
    let svc = ServiceBuilder::new()
      .layer(TraceLayer::new(sink.clone(), Sampler::always()))
      .service(service_fn(fail_with_body));

    let req = Request::builder()
      .method("POST")
      .uri("/board.Board/Like")
      .body(Body::from(r#"{"id":7}"#))
      .unwrap();
    svc.oneshot(req).await.unwrap();

    let exceptions = sink.exceptions();
    assert_eq!(exceptions.len(), 1);
    // The handler still saw the whole body after it was buffered.
    assert_eq!(exceptions[0].message, r#"{"id":7}"#);
    assert_eq!(exceptions[0].request_body.as_deref(), Some(r#"{"id":7}"#));
    assert_eq!(sink.spans()[0].status, SpanStatus::InternalError);
  }

  #[tokio::test]
  async fn empty_request_body_is_not_attached() {
    let sink = Arc::new(MemorySink::default());
    let svc = ServiceBuilder::new()
      .layer(TraceLayer::new(sink.clone(), Sampler::always()))
      .service(service_fn(|_req: Request<Body>| fail_with(Code::Internal)));

    svc.oneshot(request(&[])).await.unwrap();
    assert!(sink.exceptions()[0].request_body.is_none());
  }

  #[tokio::test]
  async fn spans_use_the_configured_op() {
    let sink = Arc::new(MemorySink::default());
    let svc = ServiceBuilder::new()
      .layer(TraceLayer::new(sink.clone(), Sampler::always()).with_op(HTTP_OP))
      .service(service_fn(echo_context));

    svc.oneshot(request(&[])).await.unwrap();
    assert_eq!(sink.spans()[0].op, HTTP_OP);
  }
}
