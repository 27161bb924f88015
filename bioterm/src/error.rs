//! High-level error types

use bioterm_core::Command;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("core protocol error: {0}")]
    Core(#[from] bioterm_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] bioterm_transport::Error),

    #[error("not connected")]
    NotConnected,

    /// The peer answered under a different session, e.g. a stale or
    /// duplicated packet. Fatal; the session can no longer be trusted.
    #[error("session mismatch: expected {expected}, got {actual}")]
    SessionMismatch { expected: u16, actual: u16 },

    #[error("authentication failed: terminal answered {command}")]
    AuthFailed { command: u16 },

    #[error("unexpected response command {command}")]
    UnexpectedResponse { command: u16 },

    #[error("{request} rejected with {reply}")]
    CommandRejected { request: Command, reply: u16 },

    #[error("event registration failed: terminal answered {command}")]
    RegistrationFailed { command: u16 },

    #[error("prepare-data response too short: {actual} bytes")]
    BulkHeaderTooShort { actual: usize },

    #[error("reply too short: expected at least {expected} bytes, got {actual}")]
    TruncatedReply { expected: usize, actual: usize },

    #[error("terminal clock value {raw} does not decode to a valid date")]
    InvalidTimestamp { raw: u32 },
}
