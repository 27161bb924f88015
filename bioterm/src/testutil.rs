//! In-process scripted terminal for loopback tests.
//!
//! Speaks bare packets over UDP, one per datagram. Checksums in scripted
//! responses are left at zero since the client never verifies inbound
//! checksums (real terminals send stale ones anyway).

use std::net::SocketAddr;

use byteorder::{ByteOrder, LittleEndian};
use tokio::net::UdpSocket;

use bioterm_core::Command;

pub(crate) struct MockDevice {
    socket: UdpSocket,
    port: u16,
}

impl MockDevice {
    pub async fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        Self { socket, port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn recv(&self) -> (Vec<u8>, SocketAddr) {
        let mut buf = vec![0u8; 65536];
        let (n, from) = self.socket.recv_from(&mut buf).await.unwrap();
        buf.truncate(n);
        (buf, from)
    }

    pub async fn send(&self, to: SocketAddr, frame: &[u8]) {
        self.socket.send_to(frame, to).await.unwrap();
    }

    /// Build a bare packet with a zeroed checksum
    pub fn frame(command: u16, session: u16, reply: u16, payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; 8 + payload.len()];
        LittleEndian::write_u16(&mut buf[0..2], command);
        LittleEndian::write_u16(&mut buf[4..6], session);
        LittleEndian::write_u16(&mut buf[6..8], reply);
        buf[8..].copy_from_slice(payload);
        buf
    }

    /// Answer `req`, echoing its reply id
    pub async fn reply(&self, to: SocketAddr, command: u16, session: u16, req: &[u8], payload: &[u8]) {
        self.reply_with_id(to, command, session, Self::reply_of(req), payload).await;
    }

    pub async fn reply_with_id(&self, to: SocketAddr, command: u16, session: u16, reply: u16, payload: &[u8]) {
        self.send(to, &Self::frame(command, session, reply, payload)).await;
    }

    /// Deliver a real-time event frame; the session slot carries the
    /// event type.
    pub async fn send_event(&self, to: SocketAddr, event_type: u16, body: &[u8]) {
        self.send(to, &Self::frame(Command::RegEvent.code(), event_type, 0, body)).await;
    }

    /// Accept the opening CMD_CONNECT and grant `session`
    pub async fn accept_connect(&self, session: u16) -> SocketAddr {
        let (req, from) = self.recv().await;
        assert_eq!(Self::command_of(&req), Command::Connect.code());
        self.reply(from, Command::AckOk.code(), session, &req, &[]).await;
        from
    }

    pub fn command_of(frame: &[u8]) -> u16 {
        LittleEndian::read_u16(&frame[0..2])
    }

    pub fn session_of(frame: &[u8]) -> u16 {
        LittleEndian::read_u16(&frame[4..6])
    }

    pub fn reply_of(frame: &[u8]) -> u16 {
        LittleEndian::read_u16(&frame[6..8])
    }
}
