//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    #[error("connection timeout")]
    ConnectTimeout,

    /// Read deadline elapsed. Distinguishable from other I/O failures so the
    /// event polling loop can treat it as "no frame this tick".
    #[error("read timeout")]
    ReadTimeout,

    #[error("write timeout")]
    WriteTimeout,

    #[error("connection closed by remote")]
    ConnectionClosed,

    #[error("framing error: {0}")]
    Framing(#[from] bioterm_core::Error),

    #[error("proxy refused CONNECT: {status}")]
    ProxyRefused { status: String },

    #[error("malformed proxy response: {0}")]
    ProxyProtocol(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl Error {
    /// True when a read deadline elapsed rather than the connection failing
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReadTimeout)
    }
}
