//! Query parser
//!
//! Turns one raw request line into a validated [`Command`].

use tracing::debug;

use crate::error::QueryError;

use super::{Command, CommandName};

/// Longest valid line: command name plus two arguments
pub const MAX_TOKENS: usize = 3;

/// Parse a request line
///
/// Checks run in a fixed order, so a line that is wrong in several ways
/// always reports the first failing check:
/// 1. blank line → `InvalidQuery`
/// 2. more than [`MAX_TOKENS`] tokens → `TooManyArguments`
/// 3. unknown (or lower-case) name → `UnknownCommand`
/// 4. wrong argument count → `WrongArgumentCount`
pub fn parse(raw: &str) -> Result<Command, QueryError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    let Some((&first, rest)) = tokens.split_first() else {
        debug!(query = raw, "no tokens in query");
        return Err(QueryError::InvalidQuery);
    };

    if tokens.len() > MAX_TOKENS {
        debug!(query = raw, "too many args in query");
        return Err(QueryError::TooManyArguments);
    }

    let name = CommandName::from_token(first).ok_or_else(|| {
        debug!(query = raw, command = first, "unknown command");
        QueryError::UnknownCommand
    })?;

    let args = rest.iter().map(|arg| arg.to_string()).collect();
    Command::new(name, args).map_err(|e| {
        debug!(query = raw, error = %e, "invalid query");
        e
    })
}
