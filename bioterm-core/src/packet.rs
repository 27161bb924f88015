//! Protocol packet structure and encoding/decoding

use byteorder::{ByteOrder, LittleEndian};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum::checksum,
    command::Command,
    error::{Error, Result},
};

/// A parsed protocol packet
///
/// # Packet Structure
///
/// ```text
/// ┌─────────────┬─────────────┬─────────────┬─────────────┬─────────────┐
/// │   Command   │  Checksum   │  SessionID  │  ReplyID    │   Payload   │
/// │   2 bytes   │   2 bytes   │   2 bytes   │   2 bytes   │   N bytes   │
/// │  (LE u16)   │  (LE u16)   │  (LE u16)   │  (LE u16)   │   (bytes)   │
/// └─────────────┴─────────────┴─────────────┴─────────────┴─────────────┘
/// ```
///
/// All multi-byte values are little-endian. The command field holds the raw
/// wire code since terminals are free to send codes this client does not
/// know about (event frames in particular).
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Raw command code
    pub command: u16,

    /// Checksum as carried on the wire (not re-verified on parse)
    pub checksum: u16,

    /// Session identifier (assigned by the terminal on connect)
    pub session_id: u16,

    /// Reply counter echo
    pub reply_id: u16,

    /// Command-specific payload
    pub payload: Bytes,
}

impl Packet {
    /// Packet header size in bytes
    pub const HEADER_SIZE: usize = 8;

    /// Parse a packet from raw bytes (TCP envelope already removed).
    ///
    /// # Errors
    ///
    /// Returns [`Error::PacketTooShort`] if fewer than 8 bytes are given.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(Error::PacketTooShort {
                expected: Self::HEADER_SIZE,
                actual: data.len(),
            });
        }

        let mut buf = data;
        Ok(Self {
            command: buf.get_u16_le(),
            checksum: buf.get_u16_le(),
            session_id: buf.get_u16_le(),
            reply_id: buf.get_u16_le(),
            payload: Bytes::copy_from_slice(buf),
        })
    }

    /// Serialize a request packet and advance the reply counter.
    ///
    /// Returns the wire bytes and the next reply id. The checksum is
    /// computed with the *current* reply id in place, after which the reply
    /// field is overwritten with the incremented value; the frame actually
    /// sent therefore carries a checksum one reply behind its own counter.
    /// Real terminals expect exactly this, so it must not be "corrected".
    ///
    /// # Examples
    ///
    /// ```
    /// use bioterm_core::{Command, Packet};
    ///
    /// let (frame, next) = Packet::build(Command::Connect, 0, 65534, &[]);
    /// assert_eq!(next, 0); // wraps at 65535
    ///
    /// let parsed = Packet::parse(&frame).unwrap();
    /// assert!(parsed.is(Command::Connect));
    /// assert_eq!(parsed.reply_id, next);
    /// ```
    pub fn build(command: Command, session_id: u16, reply_id: u16, payload: &[u8]) -> (BytesMut, u16) {
        let mut buf = BytesMut::with_capacity(Self::HEADER_SIZE + payload.len());
        buf.put_u16_le(command.code());
        buf.put_u16_le(0);
        buf.put_u16_le(session_id);
        buf.put_u16_le(reply_id);
        buf.put_slice(payload);

        let sum = checksum(&buf);

        let mut next_reply_id = reply_id.wrapping_add(1);
        if next_reply_id == u16::MAX {
            next_reply_id = 0;
        }

        LittleEndian::write_u16(&mut buf[2..4], sum);
        LittleEndian::write_u16(&mut buf[6..8], next_reply_id);

        (buf, next_reply_id)
    }

    /// Check the command field against a known code
    pub fn is(&self, command: Command) -> bool {
        self.command == command.code()
    }

    /// Total serialized size
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Packet");
        match Command::from_code(self.command) {
            Some(cmd) => s.field("command", &format_args!("{cmd}")),
            None => s.field("command", &self.command),
        };
        s.field("session_id", &format_args!("0x{:04X}", self.session_id))
        .field("reply_id", &format_args!("0x{:04X}", self.reply_id))
        .field("payload", &hex::encode(&self.payload[..self.payload.len().min(16)]))
        .field("payload_len", &self.payload.len())
        .finish()
    }
}
