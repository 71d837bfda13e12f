//! Binds the board service to a transport with its interceptor chain.

use std::{io, net::SocketAddr, path::PathBuf, sync::Arc};

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use board_core::{Board, store::Gateway};
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;

use crate::{
  observe::{Sampler, Sink},
  pipeline::{HTTP_OP, InjectLayer, TraceLayer},
  service,
};

/// Transport security for the RPC listener.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Credentials {
  #[default]
  Plaintext,
  /// PEM-encoded certificate chain and private key.
  Tls { cert_path: PathBuf, key_path: PathBuf },
}

#[derive(Debug, Error)]
pub enum ServeError {
  #[error("failed to resolve {address}")]
  Resolve {
    address: String,
    #[source]
    source:  io::Error,
  },

  #[error("failed to bind {addr}")]
  Bind {
    addr:   SocketAddr,
    #[source]
    source: io::Error,
  },

  #[error("failed to load TLS credentials")]
  Tls(#[source] io::Error),

  #[error("server error")]
  Serve(#[source] io::Error),
}

// ─── Builder ─────────────────────────────────────────────────────────────────

pub struct Builder<G> {
  board:       Arc<Board<G>>,
  sink:        Arc<dyn Sink>,
  sampler:     Sampler,
  credentials: Credentials,
}

impl<G: Gateway + 'static> Builder<G> {
  pub fn credentials(mut self, credentials: Credentials) -> Self {
    self.credentials = credentials;
    self
  }

  pub fn sampler(mut self, sampler: Sampler) -> Self {
    self.sampler = sampler;
    self
  }

  /// Install the interceptors around the service routes. The order is
  /// fixed: trace/span outermost, then store-handle injection.
  pub fn build(self) -> BoardServer {
    let router = service::routes::<G>().layer(
      ServiceBuilder::new()
        .layer(TraceLayer::new(self.sink, self.sampler))
        .layer(InjectLayer::new(self.board)),
    );
    BoardServer { router, credentials: self.credentials }
  }
}

/// The REST surface over the same board. Its calls report to the same sink
/// as the RPC service, under [`HTTP_OP`].
pub fn rest_router<G: Gateway + 'static>(
  board: Arc<Board<G>>,
  sink: Arc<dyn Sink>,
  sampler: Sampler,
) -> Router {
  board_api::api_router(board).layer(
    ServiceBuilder::new()
      .layer(tower_http::trace::TraceLayer::new_for_http())
      .layer(TraceLayer::new(sink, sampler).with_op(HTTP_OP)),
  )
}

// ─── Server ──────────────────────────────────────────────────────────────────

/// The bound service, ready to serve.
pub struct BoardServer {
  router:      Router,
  credentials: Credentials,
}

impl BoardServer {
  pub fn builder<G: Gateway + 'static>(board: Arc<Board<G>>, sink: Arc<dyn Sink>) -> Builder<G> {
    Builder {
      board,
      sink,
      sampler: Sampler::always(),
      credentials: Credentials::default(),
    }
  }

  pub fn router(&self) -> Router { self.router.clone() }

  /// Serve until the listener fails. `address` is `host:port`.
  pub async fn serve(self, address: &str) -> Result<(), ServeError> {
    let addr = tokio::net::lookup_host(address)
      .await
      .and_then(|mut addrs| {
        addrs
          .next()
          .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses"))
      })
      .map_err(|source| ServeError::Resolve { address: address.to_owned(), source })?;

    match self.credentials {
      Credentials::Plaintext => {
        let listener = TcpListener::bind(addr)
          .await
          .map_err(|source| ServeError::Bind { addr, source })?;
        tracing::info!("RPC listening on http://{addr}");
        axum::serve(listener, self.router).await.map_err(ServeError::Serve)
      }
      Credentials::Tls { cert_path, key_path } => {
        let config = RustlsConfig::from_pem_file(&cert_path, &key_path)
          .await
          .map_err(ServeError::Tls)?;
        tracing::info!("RPC listening on https://{addr}");
        axum_server::bind_rustls(addr, config)
          .serve(self.router.into_make_service())
          .await
          .map_err(ServeError::Serve)
      }
    }
  }
}
