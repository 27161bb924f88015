//! Error types for bioterm-core

/// Result type alias for core protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Packet is too short to carry a header
    #[error("packet too short: expected at least {expected} bytes, got {actual} bytes")]
    PacketTooShort { expected: usize, actual: usize },

    /// TCP stream no longer starts on an envelope boundary
    #[error("TCP framing desync: expected magic 50 50 82 7D, found {}", hex::encode(found))]
    FrameDesync { found: [u8; 4] },
}
