//! Real-time event subscription and decoding.
//!
//! After registering an event mask the terminal pushes unsolicited frames
//! on the same socket. The listener polls in one-second slices so that a
//! quiet terminal never pins the task past the caller's deadline, and so
//! that cancellation stays responsive.

use std::time::{Duration, Instant};

use byteorder::{ByteOrder, LittleEndian};
use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::{debug, info, trace};

use bioterm_core::{Command, EventMask, Packet};
use bioterm_types::{Event, EventKind};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::records::ascii_field;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

impl Client {
    /// Listen for attendance punches only
    pub async fn listen_attendance<F>(&mut self, duration: Option<Duration>, handler: F) -> Result<()>
    where
        F: FnMut(Event),
    {
        self.listen_events(EventMask::ATTLOG, duration, handler).await
    }

    /// Register for the events in `mask` and deliver each to `handler`.
    ///
    /// Runs until `duration` elapses, or indefinitely when `None`. Frames
    /// that are not event frames, carry a type outside the mask, or are
    /// too short to identify are dropped silently.
    pub async fn listen_events<F>(
        &mut self,
        mask: EventMask,
        duration: Option<Duration>,
        mut handler: F,
    ) -> Result<()>
    where
        F: FnMut(Event),
    {
        let resp = self.exchange(Command::RegEvent, &mask.bits().to_le_bytes()).await?;
        let pkt = Packet::parse(&resp)?;
        if !pkt.is(Command::AckOk) {
            return Err(Error::RegistrationFailed { command: pkt.command });
        }
        info!(?mask, "listening for real-time events");

        let device_addr = self.remote_addr();
        let started = Instant::now();

        loop {
            if let Some(total) = duration {
                if started.elapsed() >= total {
                    break;
                }
            }

            let mut poll = POLL_INTERVAL;
            if let Some(total) = duration {
                poll = poll.min(total.saturating_sub(started.elapsed()));
            }

            let frame = match self.receive_frame(poll).await {
                Ok(frame) => frame,
                Err(Error::Transport(ref e)) if e.is_timeout() => continue,
                Err(e) => return Err(e),
            };

            if frame.len() < 6 {
                trace!(len = frame.len(), "dropping short frame");
                continue;
            }
            if LittleEndian::read_u16(&frame[0..2]) != Command::RegEvent.code() {
                trace!("dropping non-event frame");
                continue;
            }

            // Event frames carry the event type in the session-id slot
            let event_type = LittleEndian::read_u16(&frame[4..6]) as u32;
            if !mask.intersects(EventMask::from_bits_truncate(event_type)) {
                trace!(event_type, "event outside mask");
                continue;
            }

            let event = decode_event(&frame, event_type, &device_addr);
            debug!(%event, "event received");
            handler(event);
        }

        Ok(())
    }
}

fn decode_event(frame: &[u8], event_type: u32, device_addr: &str) -> Event {
    let kind = if frame.len() <= 8 {
        EventKind::Raw { event_type, data: frame.to_vec() }
    } else {
        decode_kind(&frame[8..], event_type)
    };

    Event {
        device_addr: device_addr.to_string(),
        received_at: Local::now().naive_local(),
        kind,
    }
}

fn decode_kind(body: &[u8], event_type: u32) -> EventKind {
    let raw = |body: &[u8]| EventKind::Raw { event_type, data: body.to_vec() };

    match event_type {
        t if t == EventMask::ATTLOG.bits() => {
            if body.len() < 32 {
                return raw(body);
            }
            EventKind::Attendance {
                user_id: ascii_field(&body[0..9]),
                state: body[24],
                timestamp: decode_event_time(&body[26..32]),
            }
        }
        t if t == EventMask::ENROLL_USER.bits() && body.len() >= 9 => {
            EventKind::EnrollUser { user_id: ascii_field(&body[0..9]) }
        }
        t if t == EventMask::VERIFY.bits() && body.len() >= 9 => {
            EventKind::Verify { user_id: ascii_field(&body[0..9]) }
        }
        t if t == EventMask::FINGER.bits() && body.len() >= 10 => {
            EventKind::Finger { user_id: ascii_field(&body[0..9]), finger: body[9] }
        }
        t if t == EventMask::ENROLL_FINGER.bits() && body.len() >= 10 => {
            EventKind::EnrollFinger { user_id: ascii_field(&body[0..9]), finger: body[9] }
        }
        t if t == EventMask::FPFTR.bits() && body.len() >= 10 => {
            EventKind::FingerFeature { user_id: ascii_field(&body[0..9]), finger: body[9] }
        }
        t if t == EventMask::BUTTON.bits() && body.len() >= 2 => {
            EventKind::Button { button_id: LittleEndian::read_u16(&body[0..2]) }
        }
        t if t == EventMask::UNLOCK.bits() && body.len() >= 2 => {
            EventKind::Unlock { door_id: body[0], unlock_type: body[1] }
        }
        t if t == EventMask::ALARM.bits() && body.len() >= 2 => {
            EventKind::Alarm { alarm_type: LittleEndian::read_u16(&body[0..2]) }
        }
        _ => raw(body),
    }
}

/// Attendance events embed the punch time as six calendar bytes rather
/// than a packed u32.
fn decode_event_time(b: &[u8]) -> Option<NaiveDateTime> {
    let month = b[1] as u32;
    let day = b[2] as u32;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    NaiveDate::from_ymd_opt(2000 + b[0] as i32, month, day)?
        .and_hms_opt(b[3] as u32, b[4] as u32, b[5] as u32)
}
