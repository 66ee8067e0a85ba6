//! Error types for kvdb
//!
//! `KvError` covers transport, server, client, storage and configuration
//! failures. Query errors live in `QueryError`: they never close a
//! connection and are rendered into response text instead.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for kvdb operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// The peer closed the stream on a frame boundary
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended in the middle of a frame
    #[error("truncated frame: expected {expected} bytes, got {received}")]
    TruncatedFrame { expected: usize, received: usize },

    #[error("message too large: {length} bytes (max {max})")]
    OversizedMessage { length: usize, max: usize },

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("failed to listen on address {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to dial {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server closed connection")]
    ServerClosed,

    #[error("transport error: {0}")]
    Transport(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("key not found")]
    KeyNotFound,

    #[error("storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// Whether the error means the peer went away rather than misbehaved.
    ///
    /// Workers log these at debug level and close quietly.
    pub fn is_disconnect(&self) -> bool {
        match self {
            KvError::ConnectionClosed => true,
            KvError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// Whether the error is a socket read timeout.
    ///
    /// Unix reports `WouldBlock`, Windows reports `TimedOut`.
    pub fn is_timeout(&self) -> bool {
        match self {
            KvError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

/// Reasons a request line is rejected by the parser
///
/// The display strings are part of the wire contract: they are sent back
/// to clients as `invalid query: <reason>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Blank line
    #[error("invalid query")]
    InvalidQuery,

    /// More tokens than the longest command accepts
    #[error("invalid number of args")]
    TooManyArguments,

    #[error("unknown command")]
    UnknownCommand,

    /// Argument count does not match the command's arity
    #[error("invalid number of args")]
    WrongArgumentCount,

    /// Empty argument, or one containing whitespace; it could not be
    /// written back as a single token
    #[error("invalid argument")]
    InvalidArgument,
}
