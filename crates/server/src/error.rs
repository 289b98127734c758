//! Server error types

use thiserror::Error;

/// Errors raised by the HTTP server
#[derive(Error, Debug)]
pub enum ServerError {
    /// Host/port combination did not parse into a socket address
    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),

    /// Binding the listener failed (port taken, permissions, ...)
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while serving
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;
