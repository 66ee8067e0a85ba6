//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! Requests and responses share one frame shape:
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │     Payload (Len bytes)     │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! The length is an unsigned 32-bit big-endian integer. The codec itself
//! does not cap the length; the server applies its own ceiling between
//! [`read_length`] and [`read_payload`].

use std::io::{ErrorKind, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{KvError, Result};

/// Header size: 4 bytes length
pub const HEADER_SIZE: usize = 4;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a payload into a frame
///
/// Format: payload_len (4) + payload
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    let length = u32::try_from(payload.len()).map_err(|_| KvError::OversizedMessage {
        length: payload.len(),
        max: u32::MAX as usize,
    })?;

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u32(length);
    frame.put_slice(payload);

    Ok(frame.freeze())
}

/// Write a frame to a stream and flush it
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let frame = encode_frame(payload)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Read the 4-byte length header of the next frame
///
/// Returns `ConnectionClosed` if the stream ends before the first header
/// byte, and `TruncatedFrame` if it ends inside the header.
pub fn read_length<R: Read>(reader: &mut R) -> Result<u32> {
    let mut header = [0u8; HEADER_SIZE];
    let received = read_full(reader, &mut header)?;

    match received {
        0 => Err(KvError::ConnectionClosed),
        HEADER_SIZE => Ok(u32::from_be_bytes(header)),
        _ => Err(KvError::TruncatedFrame {
            expected: HEADER_SIZE,
            received,
        }),
    }
}

/// Read exactly `length` payload bytes
///
/// Bytes after the payload stay in the reader for the next frame.
pub fn read_payload<R: Read>(reader: &mut R, length: u32) -> Result<Vec<u8>> {
    let expected = length as usize;
    let mut payload = vec![0u8; expected];
    let received = read_full(reader, &mut payload)?;

    if received < expected {
        return Err(KvError::TruncatedFrame { expected, received });
    }

    Ok(payload)
}

/// Read a complete frame and return its payload
///
/// Blocks until a complete frame is received or an error occurs
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let length = read_length(reader)?;
    read_payload(reader, length)
}

/// Fill `buf` from the reader, stopping early only at end of stream.
///
/// Returns the number of bytes read. Unlike `read_exact`, this tells a
/// clean end of stream apart from one in the middle of the buffer.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(filled)
}
