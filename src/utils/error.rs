//! The `error` module defines the error type shared by the strategy, the
//! engine seam and the reference WebSocket engine.
//!
//! The strategy never wraps or translates errors raised beneath it: engine
//! failures travel up unchanged through `?`.

use thiserror::Error;

/// Errors surfaced by the adapter and the engines it drives.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation needed the engine before `create_socket` was called.
    #[error("socket engine is not bound, call create_socket first")]
    Unbound,

    /// A namespace middleware refused the connection.
    #[error("{0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),
}

impl Error {
    /// Convenience constructor for middleware rejections.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
