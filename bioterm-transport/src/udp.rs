//! UDP transport
//!
//! Most terminals speak UDP on port 4370. Packets map one-to-one onto
//! datagrams, so no envelope or reassembly is involved.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::{error::*, Transport};

/// Largest datagram the terminal will send
const MAX_DATAGRAM: usize = 65536;

/// UDP transport
pub struct UdpTransport {
    addr: String,
    port: u16,
    socket: Option<UdpSocket>,
    remote: Option<SocketAddr>,
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl UdpTransport {
    /// Create new UDP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            socket: None,
            remote: None,
            connect_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set write timeout
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    async fn resolve(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.addr, self.port);
        tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{addr_str}: {e}")))?
            .next()
            .ok_or_else(|| Error::InvalidAddress(format!("no addresses found for {addr_str}")))
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        let remote = timeout(self.connect_timeout, self.resolve())
            .await
            .map_err(|_| Error::ConnectTimeout)??;

        debug!("connecting to {remote} via UDP...");

        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(Error::Io)?;
        socket.connect(remote).await.map_err(Error::Io)?;

        debug!("connected to {remote} via UDP");

        self.remote = Some(remote);
        self.socket = Some(socket);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.socket.take().is_some() {
            debug!("disconnecting from {}...", self.remote_addr());
        }
        self.remote = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    async fn send(&mut self, packet: &[u8]) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(Error::NotConnected)?;

        trace!("sending {} bytes via UDP: {:02X?}", packet.len(), &packet[..packet.len().min(16)]);

        timeout(self.write_timeout, socket.send(packet))
            .await
            .map_err(|_| Error::WriteTimeout)?
            .map_err(Error::Io)?;
        Ok(())
    }

    async fn receive(&mut self, read_timeout: Duration) -> Result<BytesMut> {
        let socket = self.socket.as_ref().ok_or(Error::NotConnected)?;

        let mut buf = BytesMut::zeroed(MAX_DATAGRAM);

        let n = timeout(read_timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| Error::ReadTimeout)?
            .map_err(|e| {
                warn!("read error: {e}");
                Error::Io(e)
            })?;

        if n == 0 {
            return Err(Error::ConnectionClosed);
        }

        buf.truncate(n);
        trace!("received {} bytes via UDP", n);

        Ok(buf)
    }

    fn remote_addr(&self) -> String {
        self.remote
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}
