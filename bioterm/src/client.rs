//! Session engine
//!
//! One [`Client`] owns one socket and one protocol session. All traffic is
//! strict request/response through [`Client::exchange`]; large results fan
//! out into the chunked bulk sub-protocol via [`Client::exchange_bulk`].
//! The instance is not meant to be shared across tasks; run one client per
//! terminal session.

use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use bytes::BytesMut;
use tracing::{debug, info, warn};

use bioterm_core::{constants, make_commkey, Command, Packet, INITIAL_REPLY_ID};
use bioterm_transport::{TcpTransport, Transport, TunnelConfig, UdpTransport};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    Tcp,
    Udp,
}

/// Client for one attendance terminal
///
/// # Examples
///
/// ```no_run
/// use bioterm::Client;
///
/// #[tokio::main]
/// async fn main() -> bioterm::Result<()> {
///     let mut client = Client::udp("192.168.1.201", 4370);
///     client.connect().await?;
///
///     let version = client.firmware_version().await?;
///     println!("firmware: {version}");
///
///     client.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Client {
    host: String,
    port: u16,
    protocol: Protocol,
    timeout: Duration,
    password: u32,
    tunnel: Option<TunnelConfig>,

    transport: Option<Box<dyn Transport>>,
    session_id: u16,
    reply_id: u16,
    last_response: Option<BytesMut>,
}

impl Client {
    /// Create a client using UDP (the common case)
    pub fn udp(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, Protocol::Udp)
    }

    /// Create a client using TCP
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, Protocol::Tcp)
    }

    fn new(host: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            host: host.into(),
            port,
            protocol,
            timeout: Duration::from_secs(constants::DEFAULT_TIMEOUT_SECS),
            password: 0,
            tunnel: None,
            transport: None,
            session_id: 0,
            reply_id: INITIAL_REPLY_ID,
            last_response: None,
        }
    }

    /// Set the socket timeout (default 25 s)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the communication password (default 0, meaning none set)
    pub fn with_password(mut self, password: u32) -> Self {
        self.password = password;
        self
    }

    /// Reach the terminal through an HTTP CONNECT relay.
    ///
    /// The relay only carries a byte stream, so this forces TCP framing
    /// regardless of the configured protocol.
    pub fn with_tunnel(mut self, tunnel: TunnelConfig) -> Self {
        self.tunnel = Some(tunnel);
        self.protocol = Protocol::Tcp;
        self
    }

    /// Session id assigned by the terminal (0 while disconnected)
    pub fn session_id(&self) -> u16 {
        self.session_id
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_connected())
    }

    /// Connect and run the protocol handshake.
    ///
    /// Dials the transport (through the relay when one is configured),
    /// issues CMD_CONNECT and adopts the session id from the reply. When
    /// the terminal demands authentication, answers with the derived
    /// password key; any non-ok reply to that tears the connection down.
    pub async fn connect(&mut self) -> Result<()> {
        let mut transport: Box<dyn Transport> = match (self.tunnel.clone(), self.protocol) {
            (Some(tunnel), _) => Box::new(
                TcpTransport::new(self.host.clone(), self.port)
                    .with_connect_timeout(self.timeout)
                    .with_write_timeout(self.timeout)
                    .with_tunnel(tunnel),
            ),
            (None, Protocol::Tcp) => Box::new(
                TcpTransport::new(self.host.clone(), self.port)
                    .with_connect_timeout(self.timeout)
                    .with_write_timeout(self.timeout),
            ),
            (None, Protocol::Udp) => Box::new(
                UdpTransport::new(self.host.clone(), self.port)
                    .with_connect_timeout(self.timeout)
                    .with_write_timeout(self.timeout),
            ),
        };

        info!("connecting to {}...", transport.remote_addr());
        transport.connect().await?;

        self.transport = Some(transport);
        self.session_id = 0;
        self.reply_id = INITIAL_REPLY_ID;
        self.last_response = None;

        match self.handshake().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.teardown().await;
                Err(e)
            }
        }
    }

    async fn handshake(&mut self) -> Result<()> {
        let resp = self.exchange(Command::Connect, &[]).await?;
        let pkt = Packet::parse(&resp)?;

        self.session_id = pkt.session_id;

        if pkt.is(Command::AckUnauth) {
            info!("terminal requires authentication");

            let key = make_commkey(self.password, self.session_id);
            let resp = self.exchange(Command::Auth, &key).await?;
            let pkt = Packet::parse(&resp)?;

            if !pkt.is(Command::AckOk) {
                return Err(Error::AuthFailed { command: pkt.command });
            }
            info!(session_id = self.session_id, "authenticated");
        } else {
            info!(session_id = self.session_id, "connected");
        }

        Ok(())
    }

    /// Close the session.
    ///
    /// CMD_EXIT is best-effort; a terminal that already went away should
    /// not turn disconnecting into an error.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.transport.is_none() {
            return Ok(());
        }

        if let Err(e) = self.exchange(Command::Exit, &[]).await {
            warn!("EXIT command failed: {e}");
        }

        self.session_id = 0;
        if let Some(mut transport) = self.transport.take() {
            transport.disconnect().await?;
        }

        info!("disconnected");
        Ok(())
    }

    async fn teardown(&mut self) {
        self.session_id = 0;
        if let Some(mut transport) = self.transport.take() {
            let _ = transport.disconnect().await;
        }
    }

    /// Send one command and receive its reply.
    ///
    /// Verifies the reply's session id once a session is established; a
    /// mismatch means a stale or foreign packet and is fatal.
    pub async fn exchange(&mut self, command: Command, payload: &[u8]) -> Result<BytesMut> {
        let resp = self.exchange_raw(command, payload).await?;

        if self.session_id != 0 && resp.len() >= 6 {
            let sid = LittleEndian::read_u16(&resp[4..6]);
            if sid != self.session_id {
                return Err(Error::SessionMismatch {
                    expected: self.session_id,
                    actual: sid,
                });
            }
        }

        Ok(resp)
    }

    /// The exchange core, without the session check (bulk replies carry
    /// transfer metadata in the session slot).
    ///
    /// The reply counter follows the peer: when the previous response
    /// echoed a reply id, that echo seeds this packet rather than the
    /// locally predicted value.
    async fn exchange_raw(&mut self, command: Command, payload: &[u8]) -> Result<BytesMut> {
        if let Some(last) = &self.last_response {
            if last.len() >= 8 {
                self.reply_id = LittleEndian::read_u16(&last[6..8]);
            }
        }

        let (frame, next_reply_id) = Packet::build(command, self.session_id, self.reply_id, payload);

        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        transport.send(&frame).await?;
        let resp = transport.receive(self.timeout).await?;

        self.reply_id = next_reply_id;
        self.last_response = Some(resp.clone());

        Ok(resp)
    }

    /// Send a command whose result may exceed one frame.
    ///
    /// A prepare-data reply fans out into the chunk receiver; an ack-data
    /// or ack-ok reply already carries the (small) result.
    pub async fn exchange_bulk(&mut self, command: Command, payload: &[u8]) -> Result<BytesMut> {
        let resp = self.exchange_raw(command, payload).await?;
        let pkt = Packet::parse(&resp)?;

        if pkt.is(Command::PrepareData) {
            return self.receive_bulk(&resp).await;
        }
        if pkt.is(Command::AckData) || pkt.is(Command::AckOk) {
            return Ok(resp);
        }

        Err(Error::UnexpectedResponse { command: pkt.command })
    }

    /// Receive continuation chunks until the advertised total is reached,
    /// then drain the trailing acknowledgement.
    async fn receive_bulk(&mut self, prepare: &[u8]) -> Result<BytesMut> {
        if prepare.len() < 12 {
            return Err(Error::BulkHeaderTooShort { actual: prepare.len() });
        }

        let total = LittleEndian::read_u32(&prepare[8..12]) as usize;
        if total == 0 {
            return Ok(BytesMut::new());
        }

        debug!(total, "receiving bulk data");

        let mut data = BytesMut::with_capacity(total + Packet::HEADER_SIZE);
        let mut received = 0usize;
        let mut first = true;

        while received < total {
            let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
            let chunk = transport.receive(self.timeout).await?;

            if first {
                // The first chunk keeps its sub-header; only the excess
                // beyond it counts toward the advertised total.
                if chunk.len() > Packet::HEADER_SIZE {
                    received += chunk.len() - Packet::HEADER_SIZE;
                }
                data.extend_from_slice(&chunk);
                first = false;
            } else if chunk.len() > Packet::HEADER_SIZE {
                data.extend_from_slice(&chunk[Packet::HEADER_SIZE..]);
                received += chunk.len() - Packet::HEADER_SIZE;
            } else {
                data.extend_from_slice(&chunk);
                received += chunk.len();
            }
        }

        // The transfer is not complete without its trailing ack, even
        // though all data bytes are in hand.
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        let trailer = transport.receive(self.timeout).await?;
        self.last_response = Some(trailer);

        debug!(len = data.len(), "bulk transfer complete");
        Ok(data)
    }

    /// Issue a command and require an ack-ok reply
    pub(crate) async fn expect_ok(&mut self, command: Command, payload: &[u8]) -> Result<()> {
        let resp = self.exchange(command, payload).await?;
        let pkt = Packet::parse(&resp)?;

        if pkt.is(Command::AckOk) {
            Ok(())
        } else {
            Err(Error::CommandRejected { request: command, reply: pkt.command })
        }
    }

    pub(crate) fn remote_addr(&self) -> String {
        self.transport
            .as_ref()
            .map(|t| t.remote_addr())
            .unwrap_or_else(|| format!("{}:{}", self.host, self.port))
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) async fn receive_frame(&mut self, timeout: Duration) -> Result<BytesMut> {
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        Ok(transport.receive(timeout).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockDevice;
    use pretty_assertions::assert_eq;

    fn fast(client: Client) -> Client {
        client.with_timeout(Duration::from_secs(1))
    }

    #[test]
    fn create_is_disconnected() {
        let client = Client::udp("192.168.1.201", 4370);
        assert!(!client.is_connected());
        assert_eq!(client.session_id(), 0);
    }

    #[tokio::test]
    async fn connect_adopts_session_id() {
        let dev = MockDevice::bind().await;
        let port = dev.port();

        let server = tokio::spawn(async move {
            let (req, from) = dev.recv().await;
            assert_eq!(MockDevice::command_of(&req), Command::Connect.code());
            assert_eq!(MockDevice::session_of(&req), 0);
            dev.reply(from, Command::AckOk.code(), 42, &req, &[]).await;
        });

        let mut client = fast(Client::udp("127.0.0.1", port));
        client.connect().await.unwrap();

        assert!(client.is_connected());
        assert_eq!(client.session_id(), 42);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn exchange_enforces_session_id() {
        let dev = MockDevice::bind().await;
        let port = dev.port();

        let server = tokio::spawn(async move {
            let from = dev.accept_connect(42).await;
            // Answer the next command under a different session
            let (req, _) = dev.recv().await;
            dev.reply(from, Command::AckOk.code(), 99, &req, &[]).await;
        });

        let mut client = fast(Client::udp("127.0.0.1", port));
        client.connect().await.unwrap();

        let err = client.exchange(Command::GetTime, &[]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::SessionMismatch { expected: 42, actual: 99 }
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn authenticated_connect_sends_derived_key() {
        let dev = MockDevice::bind().await;
        let port = dev.port();

        let server = tokio::spawn(async move {
            let (req, from) = dev.recv().await;
            assert_eq!(MockDevice::command_of(&req), Command::Connect.code());
            dev.reply(from, Command::AckUnauth.code(), 42, &req, &[]).await;

            let (auth, from) = dev.recv().await;
            assert_eq!(MockDevice::command_of(&auth), Command::Auth.code());
            assert_eq!(&auth[8..], &bioterm_core::make_commkey(55, 42));
            dev.reply(from, Command::AckOk.code(), 42, &auth, &[]).await;
        });

        let mut client = fast(Client::udp("127.0.0.1", port)).with_password(55);
        client.connect().await.unwrap();

        assert_eq!(client.session_id(), 42);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn rejected_auth_closes_connection() {
        let dev = MockDevice::bind().await;
        let port = dev.port();

        let server = tokio::spawn(async move {
            let (req, from) = dev.recv().await;
            dev.reply(from, Command::AckUnauth.code(), 42, &req, &[]).await;
            let (auth, from) = dev.recv().await;
            dev.reply(from, Command::AckError.code(), 42, &auth, &[]).await;
        });

        let mut client = fast(Client::udp("127.0.0.1", port)).with_password(1234);
        let err = client.connect().await.unwrap_err();

        assert!(matches!(err, Error::AuthFailed { command } if command == Command::AckError.code()));
        assert!(!client.is_connected());
        assert_eq!(client.session_id(), 0);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn reply_id_follows_peer_echo() {
        let dev = MockDevice::bind().await;
        let port = dev.port();

        let server = tokio::spawn(async move {
            let from = dev.accept_connect(7).await;
            // Echo back an arbitrary reply id; the next request must carry
            // that echo plus one.
            let (req, _) = dev.recv().await;
            dev.reply_with_id(from, Command::AckOk.code(), 7, 1234, &[]).await;

            let (req, _) = dev.recv().await;
            assert_eq!(MockDevice::reply_of(&req), 1235);
            dev.reply(from, Command::AckOk.code(), 7, &req, &[]).await;
        });

        let mut client = fast(Client::udp("127.0.0.1", port));
        client.connect().await.unwrap();
        client.exchange(Command::GetTime, &[]).await.unwrap();
        client.exchange(Command::GetTime, &[]).await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn bulk_transfer_reassembles_chunks() {
        let dev = MockDevice::bind().await;
        let port = dev.port();

        let d1: Vec<u8> = (0u8..20).collect();
        let d2: Vec<u8> = (100u8..115).collect();
        let expected: Vec<u8> = d1.iter().chain(d2.iter()).copied().collect();

        let server = {
            let (d1, d2) = (d1.clone(), d2.clone());
            tokio::spawn(async move {
                let from = dev.accept_connect(42).await;

                let (req, _) = dev.recv().await;
                assert_eq!(MockDevice::command_of(&req), Command::AttLogRrq.code());

                let total = (d1.len() + d2.len()) as u32;
                let mut prepare = total.to_le_bytes().to_vec();
                prepare.extend_from_slice(&[0; 4]);
                dev.reply(from, Command::PrepareData.code(), 42, &req, &prepare).await;

                dev.reply(from, Command::Data.code(), 42, &req, &d1).await;
                dev.reply(from, Command::Data.code(), 42, &req, &d2).await;
                dev.reply(from, Command::AckOk.code(), 42, &req, &[]).await;
            })
        };

        let mut client = fast(Client::udp("127.0.0.1", port));
        client.connect().await.unwrap();

        let data = client.exchange_bulk(Command::AttLogRrq, &[]).await.unwrap();
        // First chunk is kept whole, so the result leads with its 8-byte
        // sub-header followed by the data bytes in order.
        assert_eq!(data.len(), 8 + expected.len());
        assert_eq!(&data[8..], &expected[..]);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn bulk_transfer_over_tcp_envelope() {
        use bioterm_core::{framing::wrap_tcp, TCP_MAGIC};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};

        async fn read_frame(peer: &mut TcpStream) -> Vec<u8> {
            let mut envelope = [0u8; 8];
            peer.read_exact(&mut envelope).await.unwrap();
            assert_eq!(&envelope[0..4], &TCP_MAGIC);
            let len = u32::from_le_bytes([envelope[4], envelope[5], envelope[6], envelope[7]]);
            let mut frame = vec![0u8; len as usize];
            peer.read_exact(&mut frame).await.unwrap();
            frame
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let d1: Vec<u8> = (0u8..20).collect();
        let d2: Vec<u8> = (100u8..115).collect();
        let expected: Vec<u8> = d1.iter().chain(d2.iter()).copied().collect();

        let server = {
            let (d1, d2) = (d1.clone(), d2.clone());
            tokio::spawn(async move {
                let (mut peer, _) = listener.accept().await.unwrap();

                let req = read_frame(&mut peer).await;
                assert_eq!(MockDevice::command_of(&req), Command::Connect.code());
                let ack = MockDevice::frame(
                    Command::AckOk.code(),
                    42,
                    MockDevice::reply_of(&req),
                    &[],
                );
                peer.write_all(&wrap_tcp(&ack)).await.unwrap();

                let req = read_frame(&mut peer).await;
                assert_eq!(MockDevice::command_of(&req), Command::AttLogRrq.code());
                let reply = MockDevice::reply_of(&req);

                let total = (d1.len() + d2.len()) as u32;
                let prepare = MockDevice::frame(
                    Command::PrepareData.code(),
                    42,
                    reply,
                    &total.to_le_bytes(),
                );
                // Prepare, both chunks and the trailing ack in one burst so
                // the receive path has to cut them apart
                let mut burst = wrap_tcp(&prepare).to_vec();
                burst.extend_from_slice(&wrap_tcp(&MockDevice::frame(
                    Command::Data.code(),
                    42,
                    reply,
                    &d1,
                )));
                burst.extend_from_slice(&wrap_tcp(&MockDevice::frame(
                    Command::Data.code(),
                    42,
                    reply,
                    &d2,
                )));
                burst.extend_from_slice(&wrap_tcp(&MockDevice::frame(
                    Command::AckOk.code(),
                    42,
                    reply,
                    &[],
                )));
                peer.write_all(&burst).await.unwrap();
                peer.flush().await.unwrap();

                // Hold the socket open until the client is done
                tokio::time::sleep(Duration::from_millis(200)).await;
            })
        };

        let mut client = fast(Client::tcp("127.0.0.1", port));
        client.connect().await.unwrap();
        assert_eq!(client.session_id(), 42);

        let data = client.exchange_bulk(Command::AttLogRrq, &[]).await.unwrap();
        assert_eq!(data.len(), 8 + expected.len());
        assert_eq!(&data[8..], &expected[..]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn bulk_zero_total_is_empty_without_trailing_ack() {
        let dev = MockDevice::bind().await;
        let port = dev.port();

        let server = tokio::spawn(async move {
            let from = dev.accept_connect(42).await;
            let (req, _) = dev.recv().await;
            dev.reply(from, Command::PrepareData.code(), 42, &req, &0u32.to_le_bytes()).await;
            // No chunks and no trailing ack follow
        });

        let mut client = fast(Client::udp("127.0.0.1", port));
        client.connect().await.unwrap();

        let data = client.exchange_bulk(Command::AttLogRrq, &[]).await.unwrap();
        assert!(data.is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn bulk_small_result_passes_through() {
        let dev = MockDevice::bind().await;
        let port = dev.port();

        let server = tokio::spawn(async move {
            let from = dev.accept_connect(42).await;
            let (req, _) = dev.recv().await;
            dev.reply(from, Command::AckData.code(), 42, &req, &[1, 2, 3]).await;
        });

        let mut client = fast(Client::udp("127.0.0.1", port));
        client.connect().await.unwrap();

        let data = client.exchange_bulk(Command::UserTempRrq, &[5]).await.unwrap();
        assert_eq!(&data[8..], &[1, 2, 3]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn bulk_unexpected_reply_is_error() {
        let dev = MockDevice::bind().await;
        let port = dev.port();

        let server = tokio::spawn(async move {
            let from = dev.accept_connect(42).await;
            let (req, _) = dev.recv().await;
            dev.reply(from, Command::AckError.code(), 42, &req, &[]).await;
        });

        let mut client = fast(Client::udp("127.0.0.1", port));
        client.connect().await.unwrap();

        let err = client.exchange_bulk(Command::AttLogRrq, &[]).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse { command } if command == Command::AckError.code()));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn disconnect_is_best_effort() {
        let dev = MockDevice::bind().await;
        let port = dev.port();

        let server = tokio::spawn(async move {
            let _from = dev.accept_connect(42).await;
            // Swallow the EXIT command without answering
            let (req, _) = dev.recv().await;
            assert_eq!(MockDevice::command_of(&req), Command::Exit.code());
        });

        let mut client = Client::udp("127.0.0.1", port).with_timeout(Duration::from_millis(100));
        client.connect().await.unwrap();
        client.disconnect().await.unwrap();

        assert!(!client.is_connected());
        assert_eq!(client.session_id(), 0);
        server.await.unwrap();
    }
}
