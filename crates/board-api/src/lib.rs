//! JSON REST API for the discussion board.
//!
//! Exposes an axum [`Router`] over a shared [`Board`], the same one the RPC
//! service uses. Tracing layers and transport are the caller's concern.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = board_api::api_router(board.clone())
//!   .layer(tower_http::trace::TraceLayer::new_for_http());
//! ```

pub mod error;
pub mod questions;
pub mod subjects;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use board_core::{Board, store::Gateway};

pub use error::ApiError;

/// Build a fully-materialised API router for `board`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<G: Gateway + 'static>(board: Arc<Board<G>>) -> Router<()> {
  Router::new()
    // Subjects
    .route("/subjects", get(subjects::list::<G>).post(subjects::create::<G>))
    .route("/subjects/{id}", get(subjects::get_one::<G>).delete(subjects::delete_one::<G>))
    // Questions
    .route(
      "/subjects/{id}/questions",
      get(questions::list::<G>).post(questions::create::<G>),
    )
    .route(
      "/questions/{id}",
      get(questions::get_one::<G>).delete(questions::delete_one::<G>),
    )
    .route("/questions/{id}/like", post(questions::like::<G>))
    .route("/questions/{id}/unlike", post(questions::unlike::<G>))
    .with_state(board)
}

// ─── Integration tests ────────────────────────────────────────────────────────
