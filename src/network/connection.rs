//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{KvError, Result};
use crate::protocol::{read_length, read_payload, write_frame};

use super::Handler;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Turns request payloads into response payloads
    handler: Arc<dyn Handler>,

    /// Largest request payload accepted, in bytes
    max_message_size: usize,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O on two handles of the same socket
    pub fn new(stream: TcpStream, handler: Arc<dyn Handler>, max_message_size: usize) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            handler,
            max_message_size,
            peer_addr,
        })
    }

    /// Close the connection if no data arrives for `timeout`
    ///
    /// `None` waits forever.
    pub fn set_idle_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads frames in a loop and sends responses.
    /// Returns `Ok` when the client disconnects or goes idle, and an error
    /// when the peer breaks the protocol or the transport fails.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            // Read next frame header
            let length = match read_length(&mut self.reader) {
                Ok(length) => length,
                Err(e) if e.is_disconnect() => {
                    tracing::debug!("Client {} disconnected: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) if e.is_timeout() => {
                    tracing::debug!("Idle timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading message length from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            // Refuse oversized frames before allocating for the payload
            if length as usize > self.max_message_size {
                tracing::warn!(
                    message_length = length,
                    max_message_size = self.max_message_size,
                    "message too large from {}",
                    self.peer_addr
                );
                return Err(KvError::OversizedMessage {
                    length: length as usize,
                    max: self.max_message_size,
                });
            }

            let payload = match read_payload(&mut self.reader, length) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!("Error reading message payload from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::trace!("Received {} bytes from {}", payload.len(), self.peer_addr);

            let response = self.handler.handle(&payload);

            if let Err(e) = write_frame(&mut self.writer, &response) {
                // If the client disconnected before we could send the response
                // (e.g. connection abort/reset/broken pipe), log and exit gracefully
                // rather than treating it as a server error.
                if e.is_disconnect() {
                    tracing::debug!(
                        "Client {} disconnected before response could be sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }
}
