//! Protocol constants

use bitflags::bitflags;

/// Default terminal port
pub const DEFAULT_PORT: u16 = 4370;

/// Default socket timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 25;

bitflags! {
    /// Real-time event flags for CMD_REG_EVENT.
    ///
    /// The registration payload is the union of the wanted flags as a
    /// little-endian u32; incoming event frames carry a single flag value
    /// in the session-id slot of the header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventMask: u32 {
        /// Attendance record punched
        const ATTLOG = 1;
        /// Finger pressed on the reader
        const FINGER = 1 << 1;
        /// User enrolled
        const ENROLL_USER = 1 << 2;
        /// Fingerprint enrolled
        const ENROLL_FINGER = 1 << 3;
        /// Button pressed
        const BUTTON = 1 << 4;
        /// Door unlocked
        const UNLOCK = 1 << 5;
        /// Identity verified
        const VERIFY = 1 << 7;
        /// Fingerprint minutiae captured
        const FPFTR = 1 << 8;
        /// Alarm raised
        const ALARM = 1 << 9;
    }
}

/// Data selectors for CMD_USERTEMP_RRQ and friends
pub mod fct {
    pub const ATTLOG: u8 = 1;
    pub const FINGERTMP: u8 = 2;
    pub const OPLOG: u8 = 4;
    pub const USER: u8 = 5;
    pub const SMS: u8 = 6;
    pub const UDATA: u8 = 7;
    pub const WORKCODE: u8 = 8;
}

/// User privilege levels
pub mod level {
    pub const USER: u8 = 0;
    pub const ADMIN: u8 = 14;
}
