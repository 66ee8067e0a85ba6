//! Response definitions
//!
//! Represents the outcome of one query. The outcome stays structured
//! until it is rendered to text at the wire boundary.

use std::fmt;

use crate::error::QueryError;

/// The outcome of one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Value stored under the requested key (GET hit)
    Value(String),

    /// Mutation applied (SET, DEL)
    Ok,

    /// GET on a missing key
    NotFound { key: String },

    /// The request line was rejected by the parser
    InvalidQuery(QueryError),

    /// The engine failed unexpectedly
    Error(String),

    /// A command reached dispatch in a shape the parser never produces
    Internal,
}

impl Response {
    /// Create an ERROR response
    pub fn error(message: impl fmt::Display) -> Self {
        Response::Error(message.to_string())
    }

    /// Whether the response reports a failure of any kind
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Response::InvalidQuery(_) | Response::Error(_) | Response::Internal
        )
    }

    /// Render the response as the payload sent to the client
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Response::Value(value) => value.into_bytes(),
            other => other.to_string().into_bytes(),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Value(value) => f.write_str(value),
            Response::Ok => f.write_str("ok"),
            Response::NotFound { key } => write!(f, "record with key \"{key}\" not found"),
            Response::InvalidQuery(reason) => write!(f, "invalid query: {reason}"),
            Response::Error(message) => write!(f, "error: {message}"),
            Response::Internal => f.write_str("internal error"),
        }
    }
}
