//! Hands a shared handle to every request through its extensions.

use std::task::{Context, Poll};

use axum::http::Request;
use tower::{Layer, Service};

/// Inserts a clone of `handle` into each request's extensions before calling
/// the next stage. Handlers read it back with `Extension<T>`.
#[derive(Clone)]
pub struct InjectLayer<T> {
  handle: T,
}

impl<T> InjectLayer<T> {
  pub fn new(handle: T) -> Self { Self { handle } }
}

impl<S, T: Clone> Layer<S> for InjectLayer<T> {
  type Service = InjectService<S, T>;

  fn layer(&self, inner: S) -> Self::Service {
    InjectService { inner, handle: self.handle.clone() }
  }
}

#[derive(Clone)]
pub struct InjectService<S, T> {
  inner:  S,
  handle: T,
}

impl<S, T, B> Service<Request<B>> for InjectService<S, T>
where
  S: Service<Request<B>>,
  T: Clone + Send + Sync + 'static,
{
  type Response = S::Response;
  type Error = S::Error;
  type Future = S::Future;

  fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
    self.inner.poll_ready(cx)
  }

  fn call(&mut self, mut req: Request<B>) -> Self::Future {
    req.extensions_mut().insert(self.handle.clone());
    self.inner.call(req)
  }
}
