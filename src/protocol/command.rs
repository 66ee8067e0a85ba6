//! Command definitions
//!
//! Represents validated commands from clients.

use std::fmt;

use crate::error::QueryError;

/// Command names understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Get,
    Set,
    Del,
}

impl CommandName {
    /// Look up a command name; matching is case-sensitive
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(CommandName::Get),
            "SET" => Some(CommandName::Set),
            "DEL" => Some(CommandName::Del),
            _ => None,
        }
    }

    /// Number of arguments the command takes
    pub fn arity(self) -> usize {
        match self {
            CommandName::Get => 1,
            CommandName::Set => 2,
            CommandName::Del => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::Get => "GET",
            CommandName::Set => "SET",
            CommandName::Del => "DEL",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed command
///
/// A `Command` always carries exactly `name.arity()` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: CommandName,
    args: Vec<String>,
}

impl Command {
    /// Build a command, checking the argument count and shape
    ///
    /// Every argument must be a single non-empty token, so the command's
    /// `Display` form always parses back to the same command.
    pub fn new(name: CommandName, args: Vec<String>) -> Result<Self, QueryError> {
        if args.len() != name.arity() {
            return Err(QueryError::WrongArgumentCount);
        }
        if args.iter().any(|arg| !is_token(arg)) {
            return Err(QueryError::InvalidArgument);
        }
        Ok(Self { name, args })
    }

    /// Get the command name
    pub fn name(&self) -> CommandName {
        self.name
    }

    /// Get the arguments in order
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The key every command operates on
    pub fn key(&self) -> &str {
        &self.args[0]
    }
}

fn is_token(arg: &str) -> bool {
    !arg.is_empty() && !arg.chars().any(char::is_whitespace)
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
