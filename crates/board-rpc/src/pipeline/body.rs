//! Response body for streaming calls: every frame is produced inside the
//! call's span, and the span closes when the stream ends or is dropped.

use std::{
  pin::Pin,
  task::{Context, Poll},
};

use bytes::Bytes;
use pin_project_lite::pin_project;
use tokio_stream::Stream;

use crate::observe::{ActiveSpan, SpanStatus};

pin_project! {
  pub(crate) struct TracedStream<S> {
    #[pin]
    inner:   S,
    span:    Option<ActiveSpan>,
    tracing: tracing::Span,
  }
}

impl<S> TracedStream<S> {
  pub(crate) fn new(inner: S, span: ActiveSpan, tracing: tracing::Span) -> Self {
    Self { inner, span: Some(span), tracing }
  }
}

impl<S> Stream for TracedStream<S>
where
  S: Stream<Item = Result<Bytes, axum::Error>>,
{
  type Item = S::Item;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.project();
    let _entered = this.tracing.enter();

    let poll = this.inner.poll_next(cx);
    match &poll {
      Poll::Ready(Some(Ok(_))) => {
        if let Some(span) = this.span.as_mut() {
          span.record_message();
        }
      }
      Poll::Ready(Some(Err(e))) => {
        tracing::error!(error = %e, "response stream failed");
        if let Some(mut span) = this.span.take() {
          span.set_status(SpanStatus::InternalError);
          span.capture(e.to_string());
        }
      }
      Poll::Ready(None) => {
        if let Some(span) = this.span.take() {
          tracing::debug!("response stream finished");
          span.finish();
        }
      }
      Poll::Pending => {}
    }
    poll
  }
}
