//! Core types, the store gateway contract, and the board operations.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::Gateway`]; transports drive
//! [`board::Board`].

pub mod board;
pub mod error;
pub mod question;
pub mod store;
pub mod subject;

pub use board::{Board, Validation};
pub use error::{Code, Error, Result};
