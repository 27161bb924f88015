//! Transport layer for attendance terminals
//!
//! Owns the raw sockets. TCP applies the envelope framing from
//! `bioterm_core::framing` and reassembles frames out of the byte stream;
//! UDP maps one datagram to one packet. An optional HTTP CONNECT tunnel
//! lets a TCP session reach a terminal behind a relay.

pub mod error;
pub mod tcp;
pub mod tunnel;
pub mod udp;

pub use error::{Error, Result};
pub use tcp::TcpTransport;
pub use tunnel::TunnelConfig;
pub use udp::UdpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport over which protocol packets are exchanged
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the socket (and run the tunnel handshake, if configured)
    async fn connect(&mut self) -> Result<()>;

    /// Close the socket
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send one packet, applying transport framing as needed
    async fn send(&mut self, packet: &[u8]) -> Result<()>;

    /// Receive one packet, waiting at most `timeout`
    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut>;

    /// Remote address, for diagnostics and event tagging
    fn remote_addr(&self) -> String;
}
