//! Real-time event types

use std::fmt;

use chrono::NaiveDateTime;

/// A real-time event delivered while listening
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Address of the terminal that produced the event
    pub device_addr: String,

    /// Wall-clock time at receipt, independent of any embedded timestamp
    pub received_at: NaiveDateTime,

    /// Decoded event body
    pub kind: EventKind,
}

/// Event body, keyed by the event-type flag in the frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Attendance punch
    Attendance {
        user_id: String,
        state: u8,
        /// Timestamp embedded by the terminal; `None` when out of range
        timestamp: Option<NaiveDateTime>,
    },

    /// User enrolled on the terminal
    EnrollUser { user_id: String },

    /// Identity verified
    Verify { user_id: String },

    /// Finger pressed on the reader
    Finger { user_id: String, finger: u8 },

    /// Fingerprint enrolled
    EnrollFinger { user_id: String, finger: u8 },

    /// Fingerprint minutiae captured
    FingerFeature { user_id: String, finger: u8 },

    /// Button pressed
    Button { button_id: u16 },

    /// Door unlocked
    Unlock { door_id: u8, unlock_type: u8 },

    /// Alarm raised
    Alarm { alarm_type: u16 },

    /// Unrecognized or truncated event, payload kept verbatim
    Raw { event_type: u32, data: Vec<u8> },
}

impl EventKind {
    /// Human-readable event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Attendance { .. } => "attendance",
            Self::EnrollUser { .. } => "enroll_user",
            Self::Verify { .. } => "verify",
            Self::Finger { .. } => "finger",
            Self::EnrollFinger { .. } => "enroll_finger",
            Self::FingerFeature { .. } => "finger_feature",
            Self::Button { .. } => "button",
            Self::Unlock { .. } => "unlock",
            Self::Alarm { .. } => "alarm",
            Self::Raw { .. } => "unknown",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind.name(), self.device_addr)
    }
}
