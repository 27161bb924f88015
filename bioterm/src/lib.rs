//! # bioterm
//!
//! Client for the binary protocol spoken by networked biometric
//! attendance terminals over UDP or TCP port 4370.
//!
//! ## Features
//!
//! - Session management with password authentication
//! - Attendance log and user database download
//! - Real-time event subscription (punches, buttons, alarms, ...)
//! - Clock, display and device control commands
//! - Optional HTTP CONNECT tunneling for terminals behind a relay
//!
//! ## Quick Start
//!
//! ```no_run
//! use bioterm::Client;
//!
//! #[tokio::main]
//! async fn main() -> bioterm::Result<()> {
//!     let mut client = Client::udp("192.168.1.201", 4370);
//!     client.connect().await?;
//!
//!     for record in client.attendance_log().await? {
//!         println!("{} punched at {:?}", record.user_id, record.timestamp);
//!     }
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;

mod events;
mod ops;
mod records;

#[cfg(test)]
mod testutil;

// Re-exports
pub use client::Client;
pub use error::{Error, Result};

// Re-export types
pub use bioterm_core::{Command, EventMask};
pub use bioterm_transport::TunnelConfig;
pub use bioterm_types::{Attendance, Event, EventKind, MemoryInfo, User};
