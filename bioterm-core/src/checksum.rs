//! Packet checksum
//!
//! The terminals use a ones'-complement-style word sum with a peculiar
//! finishing sequence: negate the folded sum, decrement by one, then add
//! 65535 back in until the value is non-negative. The exact order of those
//! steps is part of the wire contract; devices reject anything else.

use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

const USHRT_MAX: i64 = 65535;

/// Compute the checksum over a fully serialized packet.
///
/// The buffer must contain the complete packet with the checksum field
/// (bytes 2..4) set to zero.
///
/// # Examples
///
/// ```
/// // CMD_CONNECT header with session 0 and reply 65534
/// let buf = [0xE8, 0x03, 0x00, 0x00, 0x00, 0x00, 0xFE, 0xFF];
/// assert_eq!(bioterm_core::checksum(&buf), 0xFC17);
/// ```
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: i64 = 0;

    let mut i = 0;
    while i + 1 < data.len() {
        sum += LittleEndian::read_u16(&data[i..i + 2]) as i64;
        if sum > USHRT_MAX {
            sum -= USHRT_MAX;
        }
        i += 2;
    }

    // Trailing odd byte is added directly
    if data.len() % 2 != 0 {
        sum += data[data.len() - 1] as i64;
    }

    while sum > USHRT_MAX {
        sum -= USHRT_MAX;
    }

    if sum > 0 {
        sum = -sum;
    }
    sum -= 1;
    while sum < 0 {
        sum += USHRT_MAX;
    }

    trace!(len = data.len(), checksum = format!("0x{:04X}", sum), "calculated checksum");

    sum as u16
}
