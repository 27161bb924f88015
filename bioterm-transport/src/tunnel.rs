//! HTTP CONNECT tunnel handshake
//!
//! Terminals parked behind a TCP relay are reached by dialing the relay and
//! issuing an HTTP CONNECT for `{subdomain}.{host}:{port}`. After a 200
//! status the relay goes transparent and the protocol session runs over the
//! same stream, always with TCP framing.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tracing::debug;

use crate::error::*;

/// Relay endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
    /// Relay host
    pub host: String,
    /// Relay port
    pub port: u16,
    /// Subdomain naming the terminal on the relay
    pub subdomain: String,
}

/// Upper bound on the relay's response headers
const MAX_RESPONSE: usize = 8192;

/// Run the CONNECT handshake on a freshly dialed relay stream.
pub(crate) async fn handshake(stream: &mut TcpStream, target: &str, deadline: Duration) -> Result<()> {
    debug!("CONNECT {target} through relay...");

    let request =
        format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\nProxy-Connection: Keep-Alive\r\n\r\n");

    timeout(deadline, stream.write_all(request.as_bytes()))
        .await
        .map_err(|_| Error::WriteTimeout)?
        .map_err(Error::Io)?;

    // Read headers up to the blank terminator. Byte-at-a-time so nothing
    // past the header block is consumed from the stream.
    let expires = Instant::now() + deadline;
    let mut response = Vec::with_capacity(256);
    let mut byte = [0u8; 1];

    while !response.ends_with(b"\r\n\r\n") {
        if response.len() >= MAX_RESPONSE {
            return Err(Error::ProxyProtocol("response headers too large"));
        }

        let remaining = expires
            .checked_duration_since(Instant::now())
            .ok_or(Error::ReadTimeout)?;

        let n = timeout(remaining, stream.read(&mut byte))
            .await
            .map_err(|_| Error::ReadTimeout)?
            .map_err(Error::Io)?;

        if n == 0 {
            return Err(Error::ProxyProtocol("relay closed during handshake"));
        }
        response.push(byte[0]);
    }

    let status_line = response
        .split(|&b| b == b'\n')
        .next()
        .map(|line| String::from_utf8_lossy(line).trim().to_string())
        .unwrap_or_default();

    if !status_line.contains(" 200 ") {
        return Err(Error::ProxyRefused { status: status_line });
    }

    debug!("relay accepted CONNECT");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn relay(reply: &'static str) -> (TcpStream, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut peer, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut byte = [0u8; 1];
            while !request.ends_with(b"\r\n\r\n") {
                peer.read_exact(&mut byte).await.unwrap();
                request.push(byte[0]);
            }
            peer.write_all(reply.as_bytes()).await.unwrap();
            peer.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            request
        });

        let client = TcpStream::connect(addr).await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn accepted_handshake() {
        let (mut stream, server) = relay("HTTP/1.1 200 Connection established\r\n\r\n").await;

        handshake(&mut stream, "dev42.example.net:4370", Duration::from_secs(1))
            .await
            .unwrap();

        let request = server.await.unwrap();
        let request = String::from_utf8(request).unwrap();
        assert!(request.starts_with("CONNECT dev42.example.net:4370 HTTP/1.1\r\n"));
        assert!(request.contains("Host: dev42.example.net:4370\r\n"));
    }

    #[tokio::test]
    async fn refused_handshake() {
        let (mut stream, _server) = relay("HTTP/1.1 403 Forbidden\r\nX-Reason: no\r\n\r\n").await;

        let err = handshake(&mut stream, "dev42.example.net:4370", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProxyRefused { ref status } if status.contains("403")));
    }

    #[tokio::test]
    async fn extra_headers_are_drained() {
        let (mut stream, _server) =
            relay("HTTP/1.1 200 OK\r\nVia: relay-7\r\nConnection: keep-alive\r\n\r\n").await;

        handshake(&mut stream, "dev42.example.net:4370", Duration::from_secs(1))
            .await
            .unwrap();
    }
}
