//! RPC surface of the discussion board.
//!
//! Every `board.Board` method is served at `POST /board.Board/<Method>` with
//! JSON messages. The list methods also stream: send
//! `accept: application/x-ndjson` and each record arrives as its own frame.
//!
//! ```rust,ignore
//! let board = Arc::new(Board::new(gateway));
//! BoardServer::builder(board, sink).build().serve("0.0.0.0:9095").await?;
//! ```

pub mod config;
pub mod error;
pub mod messages;
pub mod observe;
pub mod pipeline;
pub mod registrar;
pub mod service;

pub use config::ServerConfig;
pub use error::RpcError;
pub use registrar::{BoardServer, Credentials, ServeError, rest_router};

// ─── Integration tests ───────────────────────────────────────────────────────
