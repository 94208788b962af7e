//! Error types shared between client and server.
//!
//! The `MarketError` enum unifies common failure cases for I/O, serialization,
//! WebSocket transport, channel communication, and internal logic, allowing crates
//! to propagate a single error type.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by client and server.
#[derive(Error, Debug)]
pub enum MarketError {
    /// I/O error originating from the standard library or sockets/files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// A symbol that is not part of the instrument catalogue.
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// WebSocket protocol or transport failure after the handshake.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The WebSocket opening handshake was rejected or interrupted.
    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),

    /// Crossbeam/channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl<T> From<PoisonError<T>> for MarketError {
    fn from(err: PoisonError<T>) -> Self {
        MarketError::MutexLock(err.to_string())
    }
}

impl MarketError {
    /// Returns `true` when the error only means the peer went away.
    ///
    /// Callers use this to log a closed connection quietly instead of as a failure.
    pub fn is_disconnect(&self) -> bool {
        match self {
            MarketError::WebSocket(
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed,
            ) => true,
            MarketError::WebSocket(tungstenite::Error::Io(e)) | MarketError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
