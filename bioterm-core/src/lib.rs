//! # bioterm-core
//!
//! Pure protocol primitives for ZK-compatible attendance terminals:
//! - Packet structure, encoding and decoding
//! - Checksum calculation
//! - Authentication key derivation
//! - TCP envelope framing
//! - Packed timestamp codec
//! - Command codes and event flags
//!
//! No I/O happens here; the transport and session layers live in the
//! `bioterm-transport` and `bioterm` crates.

pub mod auth;
pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod framing;
pub mod packet;
pub mod timecode;

pub use auth::make_commkey;
pub use checksum::checksum;
pub use command::Command;
pub use constants::EventMask;
pub use error::{Error, Result};
pub use framing::{extract_frame, wrap_tcp, TCP_MAGIC};
pub use packet::Packet;
pub use timecode::{decode_time, encode_time};

/// Packet header size
pub const HEADER_SIZE: usize = 8;

/// Initial reply counter value (USHRT_MAX - 1)
pub const INITIAL_REPLY_ID: u16 = 65534;
