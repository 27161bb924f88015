//! Fixed-layout device records

use std::fmt;

use chrono::NaiveDateTime;

/// One attendance log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendance {
    /// Internal record id
    pub uid: u16,

    /// User identifier as enrolled (up to 9 ASCII characters)
    pub user_id: String,

    /// Verification state (password / fingerprint / card)
    pub state: u8,

    /// Punch time; `None` when the stored value is out of range
    pub timestamp: Option<NaiveDateTime>,

    /// Punch type (check-in, check-out, overtime, ...)
    pub punch: u8,
}

/// One enrolled user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Internal user index
    pub uid: u16,

    /// User identifier (up to 23 ASCII characters)
    pub user_id: String,

    /// Display name
    pub name: String,

    /// Device password (up to 8 characters, often empty)
    pub password: String,

    /// Privilege level (0 = user, 14 = admin)
    pub role: u8,

    /// Card number, 0 when no card is assigned
    pub card_no: u32,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User[{}: {} ({})]", self.uid, self.user_id, self.name)
    }
}

/// Storage usage and capacity counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryInfo {
    pub admin_count: u32,
    pub user_count: u32,
    pub user_capacity: u32,
    pub log_count: u32,
    pub log_capacity: u32,
}

impl fmt::Display for MemoryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "users {}/{}, logs {}/{}, admins {}",
            self.user_count, self.user_capacity, self.log_count, self.log_capacity, self.admin_count
        )
    }
}
