//! TCP envelope framing
//!
//! On TCP the terminal wraps every packet in an 8-byte envelope: 4 magic
//! bytes followed by a little-endian u32 payload length. UDP carries bare
//! packets, one per datagram.

use byteorder::{ByteOrder, LittleEndian};
use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};

/// TCP envelope magic
pub const TCP_MAGIC: [u8; 4] = [0x50, 0x50, 0x82, 0x7D];

/// TCP envelope size in bytes
pub const ENVELOPE_SIZE: usize = 8;

/// Wrap a serialized packet in the TCP envelope.
pub fn wrap_tcp(packet: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(ENVELOPE_SIZE + packet.len());
    buf.put_slice(&TCP_MAGIC);
    buf.put_u32_le(packet.len() as u32);
    buf.put_slice(packet);
    buf
}

/// Try to extract one complete frame from the front of a reassembly buffer.
///
/// Returns `Ok(None)` while fewer bytes than one envelope-plus-payload are
/// buffered; the caller should read more and retry. Consumed bytes are
/// removed from `buf`, so any following frame stays buffered for the next
/// call.
///
/// # Errors
///
/// Once a full envelope header is buffered, a magic mismatch means the
/// stream no longer starts on a frame boundary and returns
/// [`Error::FrameDesync`]; resynchronizing mid-stream is not possible.
pub fn extract_frame(buf: &mut BytesMut) -> Result<Option<BytesMut>> {
    if buf.len() < ENVELOPE_SIZE {
        return Ok(None);
    }

    if buf[0..4] != TCP_MAGIC {
        return Err(Error::FrameDesync {
            found: [buf[0], buf[1], buf[2], buf[3]],
        });
    }

    let payload_len = LittleEndian::read_u32(&buf[4..8]) as usize;
    if buf.len() < ENVELOPE_SIZE + payload_len {
        return Ok(None);
    }

    buf.advance(ENVELOPE_SIZE);
    Ok(Some(buf.split_to(payload_len)))
}
