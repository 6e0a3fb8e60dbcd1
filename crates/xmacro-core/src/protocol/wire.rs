//! Decoder for intercepted core-protocol input events.
//!
//! The interception recorder receives every keyboard/pointer event as the
//! raw 32-byte record the X server sends to its clients.  This module turns
//! such a record into a [`RawInputEvent`] for the capture policy.
//!
//! Wire layout (offsets in bytes, multi-byte fields in the record's byte order):
//! ```text
//! [type:1][detail:1][sequence:2][time:4][root:4][event:4][child:4]
//! [root_x:2][root_y:2][event_x:2][event_y:2][state:2][same_screen:1][pad:1]
//! ```
//! The top bit of `type` marks events produced by `SendEvent`; only the low
//! 7 bits select the event type.

use thiserror::Error;
use tracing::{debug, trace};

use crate::domain::event::EventType;
use crate::domain::session::RawInputEvent;

/// Size of one core-protocol event on the wire.
pub const WIRE_EVENT_SIZE: usize = 32;

/// Byte offsets of every field in a wire event.
pub mod offsets {
    pub const TYPE: usize = 0;
    pub const DETAIL: usize = 1;
    pub const SEQUENCE: usize = 2;
    pub const TIME: usize = 4;
    pub const ROOT: usize = 8;
    pub const EVENT: usize = 12;
    pub const CHILD: usize = 16;
    pub const ROOT_X: usize = 20;
    pub const ROOT_Y: usize = 22;
    pub const EVENT_X: usize = 24;
    pub const EVENT_Y: usize = 26;
    pub const STATE: usize = 28;
    pub const SAME_SCREEN: usize = 30;
}

const TYPE_MASK: u8 = 0x7F;
const SEND_EVENT_BIT: u8 = 0x80;

/// Errors raised for buffers that cannot hold a wire event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ends before the last field.
    #[error("truncated wire event: need {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// The buffer is longer than any event this decoder knows.
    #[error("unsupported wire event length: {0} bytes")]
    UnsupportedLength(usize),
}

/// Byte order of the multi-byte fields in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// The byte order of the machine running the decoder.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// The other byte order.
    pub fn swapped(self) -> Self {
        match self {
            ByteOrder::Little => ByteOrder::Big,
            ByteOrder::Big => ByteOrder::Little,
        }
    }
}

/// Every field of one decoded wire event.
///
/// Only `type_code`, `detail`, and the root coordinates are used
/// downstream; the rest is decoded for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireEvent {
    pub type_code: u8,
    pub send_event: bool,
    pub detail: u8,
    pub sequence: u16,
    pub time: u32,
    pub root: u32,
    pub event: u32,
    pub child: u32,
    pub root_x: i16,
    pub root_y: i16,
    pub event_x: i16,
    pub event_y: i16,
    pub state: i16,
    pub same_screen: bool,
}

impl WireEvent {
    /// Converts the event into the policy's raw form.
    ///
    /// Returns `None` for event types outside the keyboard/pointer range.
    pub fn to_raw(&self) -> Option<RawInputEvent> {
        let raw = match EventType::try_from(self.type_code).ok()? {
            EventType::KeyPress => RawInputEvent::KeyPress { keycode: self.detail },
            EventType::KeyRelease => RawInputEvent::KeyRelease { keycode: self.detail },
            EventType::ButtonPress => RawInputEvent::ButtonPress {
                button: u32::from(self.detail),
            },
            EventType::ButtonRelease => RawInputEvent::ButtonRelease {
                button: u32::from(self.detail),
            },
            EventType::MotionNotify => RawInputEvent::Motion {
                x: i32::from(self.root_x),
                y: i32::from(self.root_y),
            },
        };
        Some(raw)
    }
}

/// Decodes the fixed fields of one wire event.
///
/// # Errors
///
/// Returns [`WireError::Truncated`] for buffers shorter than
/// [`WIRE_EVENT_SIZE`] and [`WireError::UnsupportedLength`] for longer ones.
pub fn decode_wire_event(buf: &[u8], order: ByteOrder) -> Result<WireEvent, WireError> {
    if buf.len() < WIRE_EVENT_SIZE {
        return Err(WireError::Truncated {
            needed: WIRE_EVENT_SIZE,
            available: buf.len(),
        });
    }
    if buf.len() > WIRE_EVENT_SIZE {
        return Err(WireError::UnsupportedLength(buf.len()));
    }

    let event = WireEvent {
        type_code: buf[offsets::TYPE] & TYPE_MASK,
        send_event: buf[offsets::TYPE] & SEND_EVENT_BIT != 0,
        detail: buf[offsets::DETAIL],
        sequence: read_u16(buf, offsets::SEQUENCE, order),
        time: read_u32(buf, offsets::TIME, order),
        root: read_u32(buf, offsets::ROOT, order),
        event: read_u32(buf, offsets::EVENT, order),
        child: read_u32(buf, offsets::CHILD, order),
        root_x: read_i16(buf, offsets::ROOT_X, order),
        root_y: read_i16(buf, offsets::ROOT_Y, order),
        event_x: read_i16(buf, offsets::EVENT_X, order),
        event_y: read_i16(buf, offsets::EVENT_Y, order),
        state: read_i16(buf, offsets::STATE, order),
        same_screen: buf[offsets::SAME_SCREEN] != 0,
    };
    trace!(?event, "decoded wire event");
    Ok(event)
}

/// Encodes a [`WireEvent`] into its 32-byte wire form.
pub fn encode_wire_event(event: &WireEvent, order: ByteOrder) -> [u8; WIRE_EVENT_SIZE] {
    let mut buf = [0u8; WIRE_EVENT_SIZE];
    buf[offsets::TYPE] = (event.type_code & TYPE_MASK) | if event.send_event { SEND_EVENT_BIT } else { 0 };
    buf[offsets::DETAIL] = event.detail;
    write_bytes(&mut buf, offsets::SEQUENCE, &event.sequence.to_be_bytes(), order);
    write_bytes(&mut buf, offsets::TIME, &event.time.to_be_bytes(), order);
    write_bytes(&mut buf, offsets::ROOT, &event.root.to_be_bytes(), order);
    write_bytes(&mut buf, offsets::EVENT, &event.event.to_be_bytes(), order);
    write_bytes(&mut buf, offsets::CHILD, &event.child.to_be_bytes(), order);
    write_bytes(&mut buf, offsets::ROOT_X, &event.root_x.to_be_bytes(), order);
    write_bytes(&mut buf, offsets::ROOT_Y, &event.root_y.to_be_bytes(), order);
    write_bytes(&mut buf, offsets::EVENT_X, &event.event_x.to_be_bytes(), order);
    write_bytes(&mut buf, offsets::EVENT_Y, &event.event_y.to_be_bytes(), order);
    write_bytes(&mut buf, offsets::STATE, &event.state.to_be_bytes(), order);
    buf[offsets::SAME_SCREEN] = u8::from(event.same_screen);
    buf
}

// ── Intercepted records ───────────────────────────────────────────────────────

/// Origin of an intercepted record, using the interception extension's codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RecordCategory {
    FromServer = 0,
    FromClient = 1,
    ClientStarted = 2,
    ClientDied = 3,
    StartOfData = 4,
    EndOfData = 5,
}

impl TryFrom<i32> for RecordCategory {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RecordCategory::FromServer),
            1 => Ok(RecordCategory::FromClient),
            2 => Ok(RecordCategory::ClientStarted),
            3 => Ok(RecordCategory::ClientDied),
            4 => Ok(RecordCategory::StartOfData),
            5 => Ok(RecordCategory::EndOfData),
            _ => Err(()),
        }
    }
}

/// One buffer handed over by the interception callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRecord {
    pub category: RecordCategory,
    /// `true` when the recorded data uses the opposite byte order.
    pub client_swapped: bool,
    pub data: Vec<u8>,
}

impl InterceptedRecord {
    /// A server-originated record in native byte order.
    pub fn from_server(data: Vec<u8>) -> Self {
        Self {
            category: RecordCategory::FromServer,
            client_swapped: false,
            data,
        }
    }

    fn byte_order(&self) -> ByteOrder {
        if self.client_swapped {
            ByteOrder::native().swapped()
        } else {
            ByteOrder::native()
        }
    }
}

/// Why a record produced no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Recording is no longer enabled (the session stopped).
    Disabled,
    /// The record did not originate from the server.
    NotFromServer(RecordCategory),
    /// A server event outside the keyboard/pointer range.
    UnsupportedType(u8),
}

/// Result of decoding one intercepted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Event(RawInputEvent),
    Skip(SkipReason),
}

/// Decodes an intercepted record into a raw input event, or a skip.
///
/// `enabled` is the recorder's "still recording" flag; records arriving
/// after it dropped are skipped without being parsed.
///
/// # Errors
///
/// Returns [`WireError`] when a server record has the wrong size.
pub fn decode_record(record: &InterceptedRecord, enabled: bool) -> Result<Decoded, WireError> {
    match record.category {
        RecordCategory::StartOfData => debug!("interception: start of data"),
        RecordCategory::EndOfData => debug!("interception: end of data"),
        _ => {}
    }
    if record.category != RecordCategory::FromServer {
        return Ok(Decoded::Skip(SkipReason::NotFromServer(record.category)));
    }
    if !enabled {
        return Ok(Decoded::Skip(SkipReason::Disabled));
    }

    let event = decode_wire_event(&record.data, record.byte_order())?;
    Ok(match event.to_raw() {
        Some(raw) => Decoded::Event(raw),
        None => Decoded::Skip(SkipReason::UnsupportedType(event.type_code)),
    })
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn field<const N: usize>(buf: &[u8], offset: usize, order: ByteOrder) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&buf[offset..offset + N]);
    if order == ByteOrder::Little {
        bytes.reverse();
    }
    bytes
}

fn read_u16(buf: &[u8], offset: usize, order: ByteOrder) -> u16 {
    u16::from_be_bytes(field(buf, offset, order))
}

fn read_i16(buf: &[u8], offset: usize, order: ByteOrder) -> i16 {
    i16::from_be_bytes(field(buf, offset, order))
}

fn read_u32(buf: &[u8], offset: usize, order: ByteOrder) -> u32 {
    u32::from_be_bytes(field(buf, offset, order))
}

/// Writes big-endian `bytes` at `offset`, reversed for little-endian output.
fn write_bytes(buf: &mut [u8], offset: usize, bytes: &[u8], order: ByteOrder) {
    let dst = &mut buf[offset..offset + bytes.len()];
    dst.copy_from_slice(bytes);
    if order == ByteOrder::Little {
        dst.reverse();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
