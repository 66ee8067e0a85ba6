//! Tests for the TCP server
//!
//! These tests verify:
//! - End-to-end query handling over real sockets
//! - Oversized frames close the connection without a response
//! - The connection ceiling stalls extra clients until a slot frees
//! - A panicking handler only takes down its own connection
//! - Idle timeout and shutdown

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kvdb::network::{ServerHandle, ServerOptions};
use kvdb::protocol::{encode_frame, read_frame, write_frame};
use kvdb::storage::EngineType;
use kvdb::{Client, Database, Handler, KvError, Server};

// =============================================================================
// Helper Functions
// =============================================================================

const IO_TIMEOUT: Duration = Duration::from_secs(5);

fn start(handler: impl Handler, options: ServerOptions) -> ServerHandle {
    Server::bind("127.0.0.1:0", handler, options)
        .unwrap()
        .spawn()
        .unwrap()
}

fn start_database(max_connections: usize) -> ServerHandle {
    let options = ServerOptions {
        max_connections,
        max_message_size: 4096,
        idle_timeout: None,
    };
    start(Database::open(EngineType::InMemory), options)
}

fn connect(addr: SocketAddr) -> Client {
    let mut client = Client::connect(addr).unwrap();
    client.set_timeout(Some(IO_TIMEOUT)).unwrap();
    client
}

fn raw_connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(IO_TIMEOUT)).unwrap();
    stream
}

fn echo(payload: &[u8]) -> Vec<u8> {
    payload.to_vec()
}

/// Assert the peer closed the stream rather than answering or stalling
fn assert_closed_by_peer(stream: &mut TcpStream) {
    let mut buf = [0u8; 16];
    match stream.read(&mut buf) {
        Ok(0) => {}
        Ok(n) => panic!("Expected close, got {} bytes", n),
        Err(e) => assert!(
            !matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut),
            "Expected close, timed out instead"
        ),
    }
}

// =============================================================================
// End-to-End
// =============================================================================

#[test]
fn test_end_to_end_queries() {
    let server = start_database(1);
    let mut client = connect(server.local_addr());

    assert_eq!(client.query("SET foo bar").unwrap(), "ok");
    assert_eq!(client.query("GET foo").unwrap(), "bar");
    assert_eq!(client.query("DEL foo").unwrap(), "ok");
    assert_eq!(client.query("GET foo").unwrap(), "record with key \"foo\" not found");
    assert_eq!(client.query("FOO").unwrap(), "invalid query: unknown command");

    client.close().unwrap();
    server.shutdown().unwrap();
}

#[test]
fn test_parse_errors_keep_connection_open() {
    let server = start_database(4);
    let mut client = connect(server.local_addr());

    assert_eq!(client.query("SET only_key").unwrap(), "invalid query: invalid number of args");
    assert_eq!(client.query("").unwrap(), "invalid query: invalid query");
    assert_eq!(client.query("SET k v").unwrap(), "ok");
    assert_eq!(client.query("GET k").unwrap(), "v");
}

#[test]
fn test_state_shared_between_connections() {
    let server = start_database(0);

    let mut writer = connect(server.local_addr());
    assert_eq!(writer.query("SET shared value").unwrap(), "ok");

    let mut reader = connect(server.local_addr());
    assert_eq!(reader.query("GET shared").unwrap(), "value");
}

#[test]
fn test_unlimited_concurrent_clients() {
    let server = start(echo, ServerOptions::default());
    let addr = server.local_addr();

    crossbeam::scope(|s| {
        for i in 0..8 {
            s.spawn(move |_| {
                let mut client = connect(addr);
                for j in 0..20 {
                    let message = format!("client {i} message {j}");
                    assert_eq!(client.query(&message).unwrap(), message);
                }
            });
        }
    })
    .unwrap();
}

#[test]
fn test_pipelined_frames_answered_in_order() {
    let server = start(echo, ServerOptions::default());
    let mut stream = raw_connect(server.local_addr());

    let mut batch = Vec::new();
    batch.extend_from_slice(&encode_frame(b"one").unwrap());
    batch.extend_from_slice(&encode_frame(b"two").unwrap());
    stream.write_all(&batch).unwrap();

    assert_eq!(read_frame(&mut stream).unwrap(), b"one");
    assert_eq!(read_frame(&mut stream).unwrap(), b"two");
}

// =============================================================================
// Limits
// =============================================================================

#[test]
fn test_oversized_frame_closes_connection() {
    let options = ServerOptions {
        max_connections: 1,
        max_message_size: 16,
        idle_timeout: None,
    };
    let server = start(echo, options);

    let mut stream = raw_connect(server.local_addr());
    // Header only, declaring 1000 bytes
    stream.write_all(&1000u32.to_be_bytes()).unwrap();
    assert_closed_by_peer(&mut stream);

    // The slot is released for the next client
    let mut client = connect(server.local_addr());
    assert_eq!(client.query("small").unwrap(), "small");
}

#[test]
fn test_message_at_limit_is_accepted() {
    let options = ServerOptions {
        max_connections: 1,
        max_message_size: 16,
        idle_timeout: None,
    };
    let server = start(echo, options);
    let mut client = connect(server.local_addr());

    let payload = vec![b'a'; 16];
    assert_eq!(client.send(&payload).unwrap(), payload);
}

#[test]
fn test_extra_connection_stalls_until_slot_frees() {
    let server = start_database(1);
    let addr = server.local_addr();

    let mut first = connect(addr);
    assert_eq!(first.query("SET a 1").unwrap(), "ok");

    // Second client gets through the TCP handshake but is not served
    let mut second = raw_connect(addr);
    write_frame(&mut second, b"GET a").unwrap();
    second.set_read_timeout(Some(Duration::from_millis(300))).unwrap();

    let mut buf = [0u8; 1];
    let err = second.read(&mut buf).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut));

    // Freeing the slot lets the queued request through
    first.close().unwrap();
    second.set_read_timeout(Some(IO_TIMEOUT)).unwrap();
    assert_eq!(read_frame(&mut second).unwrap(), b"1");
}

#[test]
fn test_idle_timeout_closes_connection() {
    let options = ServerOptions {
        max_connections: 1,
        max_message_size: 4096,
        idle_timeout: Some(Duration::from_millis(200)),
    };
    let server = start(echo, options);

    let mut stream = raw_connect(server.local_addr());
    write_frame(&mut stream, b"still here").unwrap();
    assert_eq!(read_frame(&mut stream).unwrap(), b"still here");

    // Say nothing and wait for the server to hang up
    assert_closed_by_peer(&mut stream);

    let mut client = connect(server.local_addr());
    assert_eq!(client.query("next").unwrap(), "next");
}

// =============================================================================
// Fault Isolation
// =============================================================================

#[test]
fn test_panicking_handler_is_isolated() {
    let handler = |payload: &[u8]| -> Vec<u8> {
        if payload == b"boom" {
            panic!("handler exploded");
        }
        payload.to_vec()
    };
    let options = ServerOptions {
        max_connections: 1,
        max_message_size: 4096,
        idle_timeout: None,
    };
    let server = start(handler, options);

    let mut victim = connect(server.local_addr());
    assert!(matches!(victim.send(b"boom"), Err(KvError::ServerClosed)));

    // Server still up and the only slot was released
    let mut client = connect(server.local_addr());
    assert_eq!(client.query("hello").unwrap(), "hello");
}

#[test]
fn test_slots_released_after_disconnect() {
    let options = ServerOptions {
        max_connections: 2,
        max_message_size: 4096,
        idle_timeout: None,
    };
    let server = Server::bind("127.0.0.1:0", echo, options).unwrap();
    let admission = Arc::clone(server.admission().unwrap());
    assert_eq!(admission.capacity(), 2);

    let server = server.spawn().unwrap();
    let mut first = connect(server.local_addr());
    let mut second = connect(server.local_addr());
    assert_eq!(first.query("a").unwrap(), "a");
    assert_eq!(second.query("b").unwrap(), "b");
    assert_eq!(admission.in_use(), 2);

    first.close().unwrap();
    second.close().unwrap();

    // Workers notice the close asynchronously
    let deadline = Instant::now() + IO_TIMEOUT;
    while admission.in_use() > 0 {
        assert!(Instant::now() < deadline, "slots were not released");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_garbage_header_only_affects_one_connection() {
    let server = start_database(2);

    let mut bad = raw_connect(server.local_addr());
    bad.write_all(&[0xff, 0xff, 0xff, 0xff]).unwrap();
    assert_closed_by_peer(&mut bad);

    let mut good = connect(server.local_addr());
    assert_eq!(good.query("DEL nothing").unwrap(), "ok");
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_bind_address_in_use() {
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    match Server::bind(&addr, echo, ServerOptions::default()) {
        Err(KvError::Bind { addr: reported, .. }) => assert_eq!(reported, addr),
        Err(e) => panic!("Expected Bind error, got {}", e),
        Ok(_) => panic!("Expected Bind error, server bound"),
    }
}

#[test]
fn test_shutdown_releases_listener() {
    let server = start_database(4);
    let addr = server.local_addr();

    server.shutdown().unwrap();

    // The port can be bound again
    TcpListener::bind(addr).unwrap();
}

#[test]
fn test_shutdown_while_stalled_at_ceiling() {
    let server = start_database(1);
    let addr = server.local_addr();

    let mut holder = connect(addr);
    assert_eq!(holder.query("SET a b").unwrap(), "ok");

    // Accept loop is now parked waiting for a slot
    let _queued = raw_connect(addr);
    thread::sleep(Duration::from_millis(100));

    let handle = server.shutdown_handle();
    let (tx, rx) = std::sync::mpsc::channel();
    thread::spawn(move || {
        tx.send(server.shutdown().is_ok()).unwrap();
    });

    assert!(rx.recv_timeout(IO_TIMEOUT).unwrap());
    assert!(handle.is_shutdown());
}

#[test]
fn test_shutdown_is_idempotent() {
    let server = start_database(0);
    let handle = server.shutdown_handle();

    handle.shutdown();
    handle.shutdown();
    server.shutdown().unwrap();
}
