//! Packed device timestamp codec
//!
//! Terminals store timestamps as a mixed-radix u32 counted from 2000-01-01:
//! seconds, minutes, hours, then days/months with fixed radices of 31 days
//! per month and 12 months per year. The encoding is not calendar-aware;
//! the radices are part of the wire format.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Encode a timestamp into the packed device format.
///
/// Only the last two digits of the year participate; the device calendar
/// starts at 2000.
pub fn encode_time(t: NaiveDateTime) -> u32 {
    let y = (t.year() % 100) as u32;
    let m = t.month();
    let d = t.day();
    (y * 12 * 31 + (m - 1) * 31 + d - 1) * 24 * 60 * 60
        + (t.hour() * 60 + t.minute()) * 60
        + t.second()
}

/// Decode a packed device timestamp.
///
/// Returns `None` when the raw value names a day that does not exist in the
/// real calendar (the fixed 31-day radix admits e.g. February 31st); the
/// caller decides whether that discards the timestamp or the whole record.
pub fn decode_time(mut raw: u32) -> Option<NaiveDateTime> {
    let second = raw % 60;
    raw /= 60;
    let minute = raw % 60;
    raw /= 60;
    let hour = raw % 24;
    raw /= 24;
    let day = raw % 31 + 1;
    raw /= 31;
    let month = raw % 12 + 1;
    raw /= 12;
    let year = 2000 + raw as i32;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}
