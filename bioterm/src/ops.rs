//! Device control, clock, display and option operations

use byteorder::{ByteOrder, LittleEndian};
use chrono::NaiveDateTime;
use tracing::debug;

use bioterm_core::{decode_time, encode_time, Command, Packet};
use bioterm_types::MemoryInfo;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::records::ascii_field;

impl Client {
    /// Resume normal operation after [`disable_device`](Self::disable_device)
    pub async fn enable_device(&mut self) -> Result<()> {
        self.expect_ok(Command::EnableDevice, &[]).await
    }

    /// Lock the terminal out of user interaction (shows "working...")
    pub async fn disable_device(&mut self) -> Result<()> {
        self.expect_ok(Command::DisableDevice, &[0x00, 0x00]).await
    }

    /// Reboot the terminal; the session does not survive this
    pub async fn restart(&mut self) -> Result<()> {
        self.expect_ok(Command::Restart, &[0x00, 0x00]).await
    }

    /// Power the terminal off
    pub async fn power_off(&mut self) -> Result<()> {
        self.expect_ok(Command::PowerOff, &[0x00, 0x00]).await
    }

    pub async fn sleep(&mut self) -> Result<()> {
        self.expect_ok(Command::Sleep, &[0x00, 0x00]).await
    }

    pub async fn resume(&mut self) -> Result<()> {
        self.expect_ok(Command::Resume, &[0x00, 0x00]).await
    }

    /// Play the built-in voice prompt with the given index
    pub async fn test_voice(&mut self, index: u32) -> Result<()> {
        self.expect_ok(Command::TestVoice, &index.to_le_bytes()).await
    }

    /// Show a message on the terminal display
    pub async fn write_lcd(&mut self, message: &str) -> Result<()> {
        // Rank 2 targets the free-text line; the space separates it from
        // the clock segment.
        let rank: u16 = 2;
        let mut payload = Vec::with_capacity(4 + message.len());
        payload.extend_from_slice(&rank.to_le_bytes());
        payload.push(0x00);
        payload.push(b' ');
        payload.extend_from_slice(message.as_bytes());
        self.expect_ok(Command::WriteLcd, &payload).await
    }

    /// Restore the default display
    pub async fn clear_lcd(&mut self) -> Result<()> {
        self.expect_ok(Command::ClearLcd, &[]).await
    }

    /// Read the terminal clock
    pub async fn get_time(&mut self) -> Result<NaiveDateTime> {
        let resp = self.exchange(Command::GetTime, &[]).await?;
        let pkt = Packet::parse(&resp)?;

        if pkt.payload.len() < 4 {
            return Err(Error::TruncatedReply { expected: 4, actual: pkt.payload.len() });
        }

        let raw = LittleEndian::read_u32(&pkt.payload[0..4]);
        decode_time(raw).ok_or(Error::InvalidTimestamp { raw })
    }

    /// Set the terminal clock
    pub async fn set_time(&mut self, t: NaiveDateTime) -> Result<()> {
        self.expect_ok(Command::SetTime, &encode_time(t).to_le_bytes()).await
    }

    /// Firmware version string
    pub async fn firmware_version(&mut self) -> Result<String> {
        let resp = self.exchange(Command::GetVersion, &[]).await?;
        let pkt = Packet::parse(&resp)?;
        Ok(ascii_field(&pkt.payload))
    }

    /// Read a device option by key, e.g. `~SerialNumber` or `~Platform`.
    ///
    /// The terminal answers with `key=value`; only the value is returned.
    pub async fn read_option(&mut self, key: &str) -> Result<String> {
        let resp = self.exchange(Command::Options, key.as_bytes()).await?;
        let pkt = Packet::parse(&resp)?;

        if !pkt.is(Command::AckOk) && !pkt.is(Command::AckData) {
            return Err(Error::CommandRejected { request: Command::Options, reply: pkt.command });
        }

        let text = ascii_field(&pkt.payload);
        let value = match text.split_once('=') {
            Some((_, v)) => v.to_string(),
            None => text,
        };
        debug!(key, value, "device option");
        Ok(value)
    }

    /// Write a device option as `key=value`
    pub async fn write_option(&mut self, key: &str, value: &str) -> Result<()> {
        let payload = format!("{key}={value}");
        self.expect_ok(Command::OptionsWrq, payload.as_bytes()).await
    }

    pub async fn serial_number(&mut self) -> Result<String> {
        self.read_option("~SerialNumber").await
    }

    pub async fn device_name(&mut self) -> Result<String> {
        self.read_option("~DeviceName").await
    }

    pub async fn platform(&mut self) -> Result<String> {
        self.read_option("~Platform").await
    }

    pub async fn oem_vendor(&mut self) -> Result<String> {
        self.read_option("~OEMVendor").await
    }

    /// Storage usage and capacity counters
    pub async fn memory_info(&mut self) -> Result<MemoryInfo> {
        let resp = self.exchange(Command::GetFreeSizes, &[]).await?;
        let pkt = Packet::parse(&resp)?;

        if !pkt.is(Command::AckOk) && !pkt.is(Command::AckData) {
            return Err(Error::CommandRejected {
                request: Command::GetFreeSizes,
                reply: pkt.command,
            });
        }
        if pkt.payload.len() < 68 {
            return Err(Error::TruncatedReply { expected: 68, actual: pkt.payload.len() });
        }

        let p = &pkt.payload;
        Ok(MemoryInfo {
            user_count: LittleEndian::read_u32(&p[16..20]),
            log_count: LittleEndian::read_u32(&p[32..36]),
            admin_count: LittleEndian::read_u32(&p[48..52]),
            user_capacity: LittleEndian::read_u32(&p[60..64]),
            log_capacity: LittleEndian::read_u32(&p[64..68]),
        })
    }
}
