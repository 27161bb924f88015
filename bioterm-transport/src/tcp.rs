//! TCP transport
//!
//! TCP delivers partial and merged frames, so received bytes accumulate in
//! a reassembly buffer and frames are cut out of it via
//! `bioterm_core::framing::extract_frame`. Any remainder stays buffered for
//! the next call.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tracing::{debug, trace, warn};

use bioterm_core::framing::{extract_frame, wrap_tcp};

use crate::tunnel::{self, TunnelConfig};
use crate::{error::*, Transport};

/// TCP transport with frame reassembly
pub struct TcpTransport {
    addr: String,
    port: u16,
    socket_addr: Option<SocketAddr>,
    stream: Option<TcpStream>,
    rx_buf: BytesMut,
    tunnel: Option<TunnelConfig>,
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl TcpTransport {
    /// Create new TCP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            socket_addr: None,
            stream: None,
            rx_buf: BytesMut::new(),
            tunnel: None,
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

    /// Route the connection through an HTTP CONNECT relay.
    ///
    /// The socket is dialed to the relay instead of the terminal, and the
    /// CONNECT handshake runs before any protocol traffic.
    pub fn with_tunnel(mut self, tunnel: TunnelConfig) -> Self {
        self.tunnel = Some(tunnel);
        self
    }

    async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr> {
        let addr_str = format!("{host}:{port}");
        tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{addr_str}: {e}")))?
            .next()
            .ok_or_else(|| Error::InvalidAddress(format!("no addresses found for {addr_str}")))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        let dial_addr = match &self.tunnel {
            Some(t) => self.resolve(&t.host, t.port).await?,
            None => self.resolve(&self.addr, self.port).await?,
        };

        debug!("connecting to {dial_addr}...");

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(dial_addr))
            .await
            .map_err(|_| Error::ConnectTimeout)?
            .map_err(Error::Io)?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        if let Some(t) = &self.tunnel {
            let target = format!("{}.{}:{}", t.subdomain, self.addr, self.port);
            tunnel::handshake(&mut stream, &target, self.connect_timeout).await?;
        }

        debug!("connected to {dial_addr}");

        self.socket_addr = Some(dial_addr);
        self.stream = Some(stream);
        self.rx_buf.clear();
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("disconnecting from {}...", self.remote_addr());
            let _ = stream.shutdown().await;
        }

        self.socket_addr = None;
        self.rx_buf.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn send(&mut self, packet: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let framed = wrap_tcp(packet);
        trace!("sending {} bytes: {:02X?}", framed.len(), &framed[..framed.len().min(16)]);

        timeout(self.write_timeout, async {
            stream.write_all(&framed).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| Error::WriteTimeout)?
        .map_err(Error::Io)?;

        Ok(())
    }

    async fn receive(&mut self, read_timeout: Duration) -> Result<BytesMut> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let deadline = Instant::now() + read_timeout;

        loop {
            if let Some(frame) = extract_frame(&mut self.rx_buf)? {
                trace!("received frame of {} bytes", frame.len());
                return Ok(frame);
            }

            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or(Error::ReadTimeout)?;

            let n = timeout(remaining, stream.read_buf(&mut self.rx_buf))
                .await
                .map_err(|_| Error::ReadTimeout)?
                .map_err(Error::Io)?;

            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }

    fn remote_addr(&self) -> String {
        self.socket_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("TCP transport dropped while still connected");
        }
    }
}
