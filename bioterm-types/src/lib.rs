//! # bioterm-types
//!
//! Plain data types carried across the client API boundary: real-time
//! events, attendance and user records, device capacity info.

pub mod event;
pub mod records;

pub use event::{Event, EventKind};
pub use records::{Attendance, MemoryInfo, User};
