//! Database Module
//!
//! Glues the parser to the storage engine.
//!
//! ## Responsibilities
//! - Parse the raw request line
//! - Route the command to the engine
//! - Map every outcome, including failures, to a [`Response`]
//!
//! Nothing here returns an error to the caller: a rejected line or a
//! failing engine becomes response text, and the connection stays open.

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::KvError;
use crate::network::Handler;
use crate::protocol::{parse, Command, CommandName, Response};
use crate::storage::{self, Engine, EngineType};

/// Query front-end over one storage engine
///
/// Cheap to share: the engine is behind an `Arc` and the parser is
/// stateless, so one `Database` serves every connection.
#[derive(Clone)]
pub struct Database {
    engine: Arc<dyn Engine>,
}

impl Database {
    /// Create a database over an existing engine
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Create a database over a fresh engine of the given type
    pub fn open(engine_type: EngineType) -> Self {
        debug!(engine = %engine_type, "initializing storage layer");
        Self::new(storage::open(engine_type))
    }

    /// Handle one request payload and return the response payload
    pub fn handle_query(&self, raw: &[u8]) -> Vec<u8> {
        let query = String::from_utf8_lossy(raw);
        self.execute(&query).into_bytes()
    }

    /// Parse and execute one request line
    pub fn execute(&self, query: &str) -> Response {
        debug!(query, "database received query");

        match parse(query) {
            Ok(command) => self.dispatch(command),
            Err(e) => {
                debug!(query, error = %e, "invalid query");
                Response::InvalidQuery(e)
            }
        }
    }

    /// Run a validated command against the engine
    pub fn dispatch(&self, command: Command) -> Response {
        match (command.name(), command.args()) {
            (CommandName::Get, [key]) => self.handle_get(key),
            (CommandName::Set, [key, value]) => self.handle_set(key, value),
            (CommandName::Del, [key]) => self.handle_del(key),
            (name, args) => {
                error!(command = %name, args = args.len(), "command reached dispatch with wrong arity");
                Response::Internal
            }
        }
    }

    fn handle_get(&self, key: &str) -> Response {
        match self.engine.get(key) {
            Ok(value) => Response::Value(value),
            Err(KvError::KeyNotFound) => Response::NotFound {
                key: key.to_string(),
            },
            Err(e) => {
                error!(key, error = %e, "failed to get value");
                Response::error(e)
            }
        }
    }

    fn handle_set(&self, key: &str, value: &str) -> Response {
        match self.engine.set(key.to_string(), value.to_string()) {
            Ok(()) => Response::Ok,
            Err(e) => {
                error!(key, value, error = %e, "failed to set value");
                Response::error(e)
            }
        }
    }

    fn handle_del(&self, key: &str) -> Response {
        match self.engine.del(key) {
            Ok(()) => Response::Ok,
            Err(e) => {
                error!(key, error = %e, "failed to delete value");
                Response::error(e)
            }
        }
    }
}

impl Handler for Database {
    fn handle(&self, payload: &[u8]) -> Vec<u8> {
        self.handle_query(payload)
    }
}
