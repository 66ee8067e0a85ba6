//! TCP Client
//!
//! Blocking client that speaks the framed protocol over one connection.
//! One request is in flight at a time: `send` writes a frame and waits for
//! the reply frame.

use std::fmt::Display;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{KvError, Result};
use crate::protocol::{read_frame, write_frame};

/// A connection to a kvdb server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    peer_addr: String,
    closed: bool,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs + Display>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(&addr).map_err(|source| KvError::Connect {
            addr: addr.to_string(),
            source,
        })?;
        stream.set_nodelay(true)?;

        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| addr.to_string());

        tracing::debug!("Connected to {}", peer_addr);

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            peer_addr,
            closed: false,
        })
    }

    /// Send one request payload and wait for its response payload
    ///
    /// Returns `KvError::ServerClosed` when the server drops the connection
    /// instead of answering, and `KvError::Transport` for any other failure.
    /// Any failure, including a read timeout, closes the client: a late or
    /// partial reply left on the socket would otherwise be read as the
    /// answer to the next request.
    pub fn send(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        if self.closed {
            return Err(KvError::Transport("client is closed".to_string()));
        }

        if let Err(e) = write_frame(&mut self.writer, payload) {
            let err = if e.is_disconnect() {
                KvError::ServerClosed
            } else {
                KvError::Transport(format!("failed to send request: {e}"))
            };
            return Err(self.abandon(err));
        }

        match read_frame(&mut self.reader) {
            Ok(response) => Ok(response),
            Err(e) => {
                let err = match e {
                    KvError::TruncatedFrame { .. } => KvError::ServerClosed,
                    e if e.is_disconnect() => KvError::ServerClosed,
                    e => KvError::Transport(format!("failed to read response: {e}")),
                };
                Err(self.abandon(err))
            }
        }
    }

    /// Send a query line and return the response text
    pub fn query(&mut self, query: &str) -> Result<String> {
        let response = self.send(query.as_bytes())?;
        Ok(String::from_utf8_lossy(&response).into_owned())
    }

    /// Fail reads that take longer than `timeout`
    ///
    /// `None` waits forever.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Whether the client was closed, explicitly or by a failed `send`
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the connection
    ///
    /// Calling `close` more than once is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match self.writer.get_ref().shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // The server already went away
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Tear the connection down after a failed exchange
    fn abandon(&mut self, err: KvError) -> KvError {
        tracing::debug!("Closing connection to {} after error: {}", self.peer_addr, err);

        if let Err(e) = self.close() {
            tracing::debug!("Error closing connection to {}: {}", self.peer_addr, e);
        }
        err
    }
}
