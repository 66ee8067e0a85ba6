//! Storage Module
//!
//! The engine contract and its implementations.
//!
//! ## Responsibilities
//! - Define the `Get` / `Set` / `Del` capability set as the [`Engine`] trait
//! - Provide the in-memory engine
//! - Select an engine from configuration
//!
//! New backends are added as new `Engine` implementations; callers only
//! ever see `Arc<dyn Engine>`.

mod memory;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{KvError, Result};

pub use memory::InMemoryEngine;

/// A thread-safe key-value backend
///
/// All methods take `&self`; implementations synchronize internally so one
/// engine can be shared by every connection worker.
pub trait Engine: Send + Sync {
    /// Get the value stored under `key`
    ///
    /// Returns `KvError::KeyNotFound` if the key is absent.
    fn get(&self, key: &str) -> Result<String>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: String, value: String) -> Result<()>;

    /// Remove `key`; removing an absent key is not an error
    fn del(&self, key: &str) -> Result<()>;
}

/// Engine selector used by configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineType {
    #[default]
    InMemory,
}

impl EngineType {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineType::InMemory => "in_memory",
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineType {
    type Err = KvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in_memory" => Ok(EngineType::InMemory),
            other => Err(KvError::Config(format!(
                "unknown engine type `{other}` (expected `in_memory`)"
            ))),
        }
    }
}

/// Create the engine selected by `engine_type`
pub fn open(engine_type: EngineType) -> Arc<dyn Engine> {
    match engine_type {
        EngineType::InMemory => Arc::new(InMemoryEngine::new()),
    }
}
