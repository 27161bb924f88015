//! User and attendance database operations.
//!
//! Downloads arrive through the bulk sub-protocol and parse into
//! fixed-size records. Read and write layouts differ: the terminal
//! reports users as 72-byte records keyed at one set of offsets, while
//! uploads use a shifted 72-byte layout.

use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use bioterm_core::{constants::fct, decode_time, Command};
use bioterm_types::{Attendance, User};

use crate::client::Client;
use crate::error::Result;

const ATT_RECORD_SIZE: usize = 40;
const USER_RECORD_SIZE: usize = 72;

impl Client {
    /// Download the attendance log
    pub async fn attendance_log(&mut self) -> Result<Vec<Attendance>> {
        let data = self.exchange_bulk(Command::AttLogRrq, &[]).await?;
        if data.len() <= 8 {
            return Ok(Vec::new());
        }

        // 8-byte sub-header plus 2 bytes of table metadata
        let body = if data.len() > 10 { &data[10..] } else { &data[..] };

        let records: Vec<Attendance> = body
            .chunks_exact(ATT_RECORD_SIZE)
            .filter_map(parse_attendance)
            .collect();

        debug!(count = records.len(), "attendance log downloaded");
        Ok(records)
    }

    /// Erase the attendance log. Destructive.
    pub async fn clear_attendance_log(&mut self) -> Result<()> {
        self.expect_ok(Command::ClearAttLog, &[]).await
    }

    /// Download all enrolled users
    pub async fn users(&mut self) -> Result<Vec<User>> {
        let data = self.exchange_bulk(Command::UserTempRrq, &[fct::USER]).await?;
        if data.len() <= 8 {
            return Ok(Vec::new());
        }

        let users: Vec<User> = data[8..]
            .chunks_exact(USER_RECORD_SIZE)
            .map(parse_user)
            .collect();

        debug!(count = users.len(), "user database downloaded");
        Ok(users)
    }

    /// Create or update a user. Oversized string fields are truncated to
    /// the wire field widths.
    pub async fn set_user(&mut self, user: &User) -> Result<()> {
        let mut rec = [0u8; USER_RECORD_SIZE];

        LittleEndian::write_u16(&mut rec[0..2], user.uid);
        rec[2] = user.role;
        copy_field(&mut rec[3..11], &user.password);
        copy_field(&mut rec[11..35], &user.name);
        LittleEndian::write_u32(&mut rec[35..39], user.card_no);
        rec[39] = 1;
        copy_field(&mut rec[48..57], &user.user_id);

        self.expect_ok(Command::SetUser, &rec).await
    }

    /// Remove one user by internal index
    pub async fn delete_user(&mut self, uid: u16) -> Result<()> {
        self.expect_ok(Command::DeleteUser, &uid.to_le_bytes()).await
    }

    /// Erase all users, fingerprints and logs. Destructive.
    pub async fn clear_data(&mut self) -> Result<()> {
        self.expect_ok(Command::ClearData, &[]).await
    }

    /// Demote all administrators to plain users
    pub async fn clear_admins(&mut self) -> Result<()> {
        self.expect_ok(Command::ClearAdmin, &[]).await
    }

    /// Fetch the fingerprint templates enrolled for a user, keyed by
    /// finger index 0-9.
    ///
    /// The terminal answers per finger and errors out on empty slots, so
    /// failures here mean "no template" rather than a broken session.
    pub async fn fingerprint_templates(&mut self, uid: u16) -> Result<BTreeMap<u8, Vec<u8>>> {
        let mut templates = BTreeMap::new();

        for finger in 0u8..=9 {
            let mut payload = [0u8; 3];
            LittleEndian::write_u16(&mut payload[0..2], uid);
            payload[2] = finger;

            let data = match self.exchange_bulk(Command::UserTempRrq, &payload).await {
                Ok(data) => data,
                Err(_) => continue,
            };
            if data.len() <= 8 {
                continue;
            }

            // size(2) + uid(2) + finger(1) + flag(1) + template bytes
            let body = &data[8..];
            if body.len() < 6 {
                continue;
            }
            let size = LittleEndian::read_u16(&body[0..2]) as usize;
            if size > 0 && body.len() >= 6 + size {
                templates.insert(finger, body[6..6 + size].to_vec());
            }
        }

        debug!(uid, count = templates.len(), "fingerprint templates fetched");
        Ok(templates)
    }
}

/// Decode a 40-byte attendance record; deleted slots (uid 0) yield `None`
fn parse_attendance(rec: &[u8]) -> Option<Attendance> {
    let uid = LittleEndian::read_u16(&rec[2..4]);
    if uid == 0 {
        return None;
    }

    Some(Attendance {
        uid,
        user_id: ascii_field(&rec[4..13]),
        state: rec[28],
        timestamp: decode_time(LittleEndian::read_u32(&rec[29..33])),
        punch: rec[33],
    })
}

/// Decode a 72-byte user record
fn parse_user(rec: &[u8]) -> User {
    User {
        uid: LittleEndian::read_u16(&rec[1..3]),
        role: rec[3],
        password: ascii_field(&rec[4..12]),
        name: ascii_field(&rec[12..36]),
        card_no: LittleEndian::read_u32(&rec[36..40]),
        user_id: ascii_field(&rec[49..72]),
    }
}

/// NUL-padded ASCII field to owned string
pub(crate) fn ascii_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()
}

fn copy_field(dst: &mut [u8], src: &str) {
    let bytes = src.as_bytes();
    let n = bytes.len().min(dst.len());
    dst[..n].copy_from_slice(&bytes[..n]);
}
