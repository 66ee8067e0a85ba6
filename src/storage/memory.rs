//! In-memory engine
//!
//! HashMap-based engine with RwLock for concurrency.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{KvError, Result};

use super::Engine;

/// Engine keeping every entry in a process-local map
///
/// ## Concurrency:
/// - `get` takes the read lock, so readers run in parallel
/// - `set` / `del` take the write lock for one mutation each
/// - No ordering across keys; concurrent writers to one key resolve
///   last-writer-wins
pub struct InMemoryEngine {
    /// The only mutable state; never handed out to callers
    data: RwLock<HashMap<String, String>>,
}

impl InMemoryEngine {
    /// Create a new empty engine
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of stored keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the engine holds no keys
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for InMemoryEngine {
    fn get(&self, key: &str) -> Result<String> {
        debug!(key, "in-memory engine received get command");

        let data = self.data.read();
        data.get(key).cloned().ok_or(KvError::KeyNotFound)
    }

    fn set(&self, key: String, value: String) -> Result<()> {
        debug!(key = %key, value = %value, "in-memory engine received set command");

        self.data.write().insert(key, value);
        Ok(())
    }

    fn del(&self, key: &str) -> Result<()> {
        debug!(key, "in-memory engine received delete command");

        self.data.write().remove(key);
        Ok(())
    }
}
