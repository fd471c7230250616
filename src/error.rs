//! Error types for canvaswire-client.

use thiserror::Error;

use crate::session::Phase;

/// Main error type for all canvaswire operations.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// I/O error on the host stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed frame or message shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Status byte not valid for the current session phase.
    #[error("Status byte {status} is not valid in phase {phase:?}")]
    Session {
        /// Phase the session was in when the byte arrived.
        phase: Phase,
        /// The offending status byte.
        status: u8,
    },

    /// The session already closed or failed; no further turns are taken.
    #[error("Session closed")]
    SessionClosed,

    /// A native-side operation failed. Carries the host's own description.
    #[error("Host error: {0}")]
    Host(String),

    /// A command referenced a handle this registry never handed out.
    #[error("Resource error: {0}")]
    Resource(String),

    /// A binary record could not be read through its schema.
    #[error("Layout error: {0}")]
    Layout(String),

    /// The host hung up between turns.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using CanvasError.
pub type Result<T> = std::result::Result<T, CanvasError>;
