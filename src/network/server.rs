//! TCP Server
//!
//! Accepts connections and dispatches to worker threads.
//!
//! ## Responsibilities
//! - Bind the listener and report the bound address
//! - Admit at most `max_connections` clients at a time
//! - Run each admitted client on its own named worker thread
//! - Keep a failing or panicking worker from taking the server down
//! - Stop accepting on request
//!
//! ```text
//!   accept loop                      workers
//!   ───────────                      ───────
//!   listener.accept()
//!        │
//!   acquire permit ──(full: wait)
//!        │
//!   spawn ───────────────────────▶ Connection::handle()
//!        │                                │
//!        └──── loop                 drop permit ──▶ wakes accept loop
//! ```

use std::any::Any;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{KvError, Result};

use super::admission::{Admission, Permit};
use super::connection::Connection;
use super::Handler;

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// How long shutdown waits for its wake-up connection
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

// =============================================================================
// Options
// =============================================================================

/// Per-server limits
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Max concurrent connections; 0 means unlimited
    pub max_connections: usize,

    /// Largest request payload accepted, in bytes
    pub max_message_size: usize,

    /// Close connections that stay silent this long
    pub idle_timeout: Option<Duration>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_connections: 0,
            max_message_size: 4096,
            idle_timeout: None,
        }
    }
}

impl From<&Config> for ServerOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_connections: config.max_connections,
            max_message_size: config.max_message_size,
            idle_timeout: config.idle_timeout,
        }
    }
}

// =============================================================================
// Server
// =============================================================================

/// TCP server for kvdb
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    handler: Arc<dyn Handler>,
    admission: Option<Arc<Admission>>,
    options: ServerOptions,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind a server to `addr`
    ///
    /// Port 0 picks a free port; see [`Server::local_addr`].
    pub fn bind(addr: &str, handler: impl Handler, options: ServerOptions) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|source| KvError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr()?;

        let admission = match options.max_connections {
            0 => None,
            n => Some(Arc::new(Admission::new(n))),
        };

        info!(
            addr = %local_addr,
            max_connections = options.max_connections,
            max_message_size = options.max_message_size,
            "server listening"
        );

        Ok(Self {
            listener,
            local_addr,
            handler: Arc::new(handler),
            admission,
            options,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The admission gate, if the server is bounded
    pub fn admission(&self) -> Option<&Arc<Admission>> {
        self.admission.as_ref()
    }

    /// A handle that stops this server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            admission: self.admission.clone(),
            local_addr: self.local_addr,
        }
    }

    /// Start accepting connections (blocking)
    ///
    /// Returns once shutdown is requested. Connections already being served
    /// keep running on their workers.
    pub fn run(self) -> Result<()> {
        let mut next_id: u64 = 0;

        loop {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) => {
                    if self.is_shutting_down() {
                        break;
                    }
                    error!("Failed to accept connection: {}", e);
                    thread::sleep(ACCEPT_BACKOFF);
                    continue;
                }
            };

            if self.is_shutting_down() {
                debug!("Dropping connection from {} during shutdown", peer);
                break;
            }

            // At the ceiling this stalls the whole loop until a worker exits
            let permit = match &self.admission {
                Some(admission) => match admission.acquire() {
                    Some(permit) => Some(permit),
                    None => {
                        debug!("Dropping connection from {} during shutdown", peer);
                        break;
                    }
                },
                None => None,
            };

            next_id += 1;
            self.spawn_worker(next_id, stream, peer, permit);
        }

        info!(addr = %self.local_addr, "server stopped accepting connections");
        Ok(())
    }

    /// Run the accept loop on a background thread
    pub fn spawn(self) -> Result<ServerHandle> {
        let local_addr = self.local_addr;
        let shutdown = self.shutdown_handle();

        let thread = thread::Builder::new()
            .name("kvdb-acceptor".to_string())
            .spawn(move || self.run())?;

        Ok(ServerHandle {
            local_addr,
            shutdown,
            thread: Some(thread),
        })
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn spawn_worker(&self, id: u64, stream: TcpStream, peer: SocketAddr, permit: Option<Permit>) {
        let handler = Arc::clone(&self.handler);
        let options = self.options.clone();

        debug!(connection_id = id, "Accepted connection from {}", peer);

        let spawned = thread::Builder::new()
            .name(format!("kvdb-conn-{id}"))
            .spawn(move || {
                // Held for the worker's lifetime, released even after a panic
                let _permit = permit;
                serve(stream, handler, &options, peer);
            });

        if let Err(e) = spawned {
            error!("Failed to spawn worker for {}: {}", peer, e);
        }
    }
}

/// Worker root: serve one connection and contain whatever happens
fn serve(stream: TcpStream, handler: Arc<dyn Handler>, options: &ServerOptions, peer: SocketAddr) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<()> {
        let mut connection = Connection::new(stream, handler, options.max_message_size)?;
        connection.set_idle_timeout(options.idle_timeout)?;
        connection.handle()
    }));

    match outcome {
        Ok(Ok(())) => debug!("Connection from {} closed", peer),
        Ok(Err(e)) => warn!("Connection from {} closed with error: {}", peer, e),
        Err(payload) => error!(
            "Worker for {} panicked: {}",
            peer,
            panic_message(&*payload)
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

// =============================================================================
// Shutdown
// =============================================================================

/// Stops a running server from any thread
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    admission: Option<Arc<Admission>>,
    local_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Signal the server to stop accepting connections
    ///
    /// Idempotent. Wakes the accept loop whether it is waiting for a slot
    /// or blocked in `accept`.
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(addr = %self.local_addr, "shutdown requested");

        if let Some(admission) = &self.admission {
            admission.close();
        }

        // Unblock accept() with a throwaway connection
        let target = wake_addr(self.local_addr);
        if let Err(e) = TcpStream::connect_timeout(&target, WAKE_TIMEOUT) {
            debug!("Wake-up connection to {} failed: {}", target, e);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Address to dial when waking a listener bound to `addr`
fn wake_addr(addr: SocketAddr) -> SocketAddr {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port())
}

/// A server running on a background thread
///
/// Dropping the handle shuts the server down.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<Result<()>>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Stop the server and wait for the accept loop to exit
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        self.shutdown.shutdown();

        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| KvError::Transport("accept loop panicked".to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Error stopping server: {}", e);
        }
    }
}

