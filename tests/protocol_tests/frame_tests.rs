//! Frame Tests
//!
//! Tests for the length-prefixed frame codec.

use std::io::Cursor;

use kvdb::protocol::{encode_frame, read_frame, read_length, read_payload, write_frame, HEADER_SIZE};
use kvdb::KvError;

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_layout() {
    let frame = encode_frame(b"hello").unwrap();

    assert_eq!(frame.len(), HEADER_SIZE + 5);
    assert_eq!(&frame[..HEADER_SIZE], &[0, 0, 0, 5]);
    assert_eq!(&frame[HEADER_SIZE..], b"hello");
}

#[test]
fn test_encode_length_is_big_endian() {
    let payload = vec![b'x'; 0x0102];
    let frame = encode_frame(&payload).unwrap();

    assert_eq!(&frame[..HEADER_SIZE], &[0x00, 0x00, 0x01, 0x02]);
}

#[test]
fn test_encode_empty_payload() {
    let frame = encode_frame(b"").unwrap();
    assert_eq!(&frame[..], &[0, 0, 0, 0]);
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_read_frame_empty_payload() {
    let frame = encode_frame(b"").unwrap();
    let mut cursor = Cursor::new(frame.to_vec());

    assert!(read_frame(&mut cursor).unwrap().is_empty());
}

#[test]
fn test_read_frame_returns_payload() {
    let payload = b"SET foo bar";
    let frame = encode_frame(payload).unwrap();
    let mut cursor = Cursor::new(frame.to_vec());

    assert_eq!(read_frame(&mut cursor).unwrap(), payload);
}

#[test]
fn test_concatenated_frames_decode_in_order() {
    let mut buf = Vec::new();
    write_frame(&mut buf, b"first").unwrap();
    write_frame(&mut buf, b"").unwrap();
    write_frame(&mut buf, b"third frame").unwrap();

    let mut cursor = Cursor::new(buf);
    assert_eq!(read_frame(&mut cursor).unwrap(), b"first");
    assert_eq!(read_frame(&mut cursor).unwrap(), b"");
    assert_eq!(read_frame(&mut cursor).unwrap(), b"third frame");
    assert!(matches!(read_frame(&mut cursor), Err(KvError::ConnectionClosed)));
}

#[test]
fn test_read_length_then_payload() {
    let frame = encode_frame(b"GET foo").unwrap();
    let mut cursor = Cursor::new(frame.to_vec());

    let length = read_length(&mut cursor).unwrap();
    assert_eq!(length, 7);
    assert_eq!(read_payload(&mut cursor, length).unwrap(), b"GET foo");
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn test_empty_stream_is_connection_closed() {
    let mut cursor = Cursor::new(Vec::<u8>::new());

    let err = read_frame(&mut cursor).unwrap_err();
    assert!(matches!(err, KvError::ConnectionClosed));
    assert!(err.is_disconnect());
}

#[test]
fn test_truncated_header() {
    let mut cursor = Cursor::new(vec![0u8, 0]);

    match read_frame(&mut cursor) {
        Err(KvError::TruncatedFrame { expected, received }) => {
            assert_eq!(expected, HEADER_SIZE);
            assert_eq!(received, 2);
        }
        other => panic!("Expected TruncatedFrame, got {:?}", other),
    }
}

#[test]
fn test_truncated_payload() {
    let mut buf = vec![0, 0, 0, 10];
    buf.extend_from_slice(b"abc");
    let mut cursor = Cursor::new(buf);

    match read_frame(&mut cursor) {
        Err(KvError::TruncatedFrame { expected, received }) => {
            assert_eq!(expected, 10);
            assert_eq!(received, 3);
        }
        other => panic!("Expected TruncatedFrame, got {:?}", other),
    }
}
