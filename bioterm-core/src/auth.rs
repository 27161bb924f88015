//! Password authentication key derivation
//!
//! When a terminal has a communication password set, the CONNECT reply comes
//! back as CMD_ACK_UNAUTH and the client must answer CMD_AUTH with a 4-byte
//! key derived from the password and the session id. The scramble below was
//! reverse-engineered from the vendor tooling and must be reproduced
//! bit-for-bit.

/// Derive the 4-byte authentication key for CMD_AUTH.
///
/// # Algorithm
///
/// 1. Reverse all 32 bits of the password
/// 2. Add the session id
/// 3. Serialize as little-endian u32 and XOR with `"ZKSO"`
/// 4. Swap the two 16-bit halves
/// 5. XOR bytes 0, 1 and 3 with `0x32`; byte 2 becomes exactly `0x32`
///
/// # Examples
///
/// ```
/// use bioterm_core::make_commkey;
///
/// assert_eq!(make_commkey(0, 0), [0x61, 0x7D, 0x32, 0x79]);
/// ```
pub fn make_commkey(password: u32, session_id: u16) -> [u8; 4] {
    let mut k: u32 = 0;
    for i in 0..32 {
        if password & (1 << i) != 0 {
            k = (k << 1) | 1;
        } else {
            k <<= 1;
        }
    }

    k = k.wrapping_add(session_id as u32);

    let mut b = k.to_le_bytes();
    for (byte, key) in b.iter_mut().zip(*b"ZKSO") {
        *byte ^= key;
    }

    let low = u16::from_le_bytes([b[0], b[1]]);
    let high = u16::from_le_bytes([b[2], b[3]]);
    let mut out = [0u8; 4];
    out[0..2].copy_from_slice(&high.to_le_bytes());
    out[2..4].copy_from_slice(&low.to_le_bytes());

    let mask = 0x32;
    out[0] ^= mask;
    out[1] ^= mask;
    out[2] = mask;
    out[3] ^= mask;

    out
}
