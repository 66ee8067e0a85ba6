//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread (`Server::run`)
//! - Admission gate bounding concurrent connections
//! - One worker thread per admitted connection
//! - Requests routed through a [`Handler`]

mod admission;
mod client;
mod connection;
mod server;

pub use admission::{Admission, Permit};
pub use client::Client;
pub use connection::Connection;
pub use server::{Server, ServerHandle, ServerOptions, ShutdownHandle};

/// Turns one request payload into one response payload
///
/// Called concurrently from every connection worker. Implemented by
/// [`crate::Database`] and by plain closures.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, payload: &[u8]) -> Vec<u8>;
}

impl<F> Handler for F
where
    F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
{
    fn handle(&self, payload: &[u8]) -> Vec<u8> {
        self(payload)
    }
}
