//! # kvdb
//!
//! A small networked key-value store with:
//! - Length-prefixed binary framing over TCP
//! - A three-command text query language (`GET`, `SET`, `DEL`)
//! - A pluggable, thread-safe storage engine
//! - Bounded concurrency with one worker thread per connection
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │          (admission gate, one worker per client)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  frame payload
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Database                                │
//! │              parse → dispatch → Response                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │    Engine     │
//!               │ (in-memory,   │
//!               │   RwLock)     │
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod logging;

pub mod protocol;
pub mod storage;
pub mod database;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, QueryError, Result};
pub use config::Config;
pub use database::Database;
pub use network::{Client, Handler, Server};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
