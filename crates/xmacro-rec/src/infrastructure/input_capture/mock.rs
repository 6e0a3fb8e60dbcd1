//! Scripted capture source for unit testing.
//!
//! Hands out a fixed list of items, as if captured from hardware, and
//! remembers how many were pulled so tests can check where a record loop
//! stopped.

use std::collections::VecDeque;

use xmacro_core::protocol::{encode_wire_event, ByteOrder, WireEvent};
use xmacro_core::{InterceptedRecord, RawInputEvent};

/// A capture source that yields a fixed script of items.
#[derive(Debug, Clone)]
pub struct ScriptedSource<T> {
    items: VecDeque<T>,
    pulled: usize,
}

impl<T> ScriptedSource<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items.into_iter().collect(),
            pulled: 0,
        }
    }

    /// Number of items handed out so far.
    pub fn pulled(&self) -> usize {
        self.pulled
    }

    /// Number of items never pulled.
    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl<T> Iterator for ScriptedSource<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let item = self.items.pop_front()?;
        self.pulled += 1;
        Some(item)
    }
}

impl ScriptedSource<InterceptedRecord> {
    /// Builds the interception buffers a server would send for `raws`.
    pub fn intercepted(raws: impl IntoIterator<Item = RawInputEvent>) -> Self {
        Self::new(raws.into_iter().map(server_record))
    }
}

/// Encodes `raw` as a native-order server record.
pub fn server_record(raw: RawInputEvent) -> InterceptedRecord {
    let (detail, x, y) = match raw {
        RawInputEvent::KeyPress { keycode } | RawInputEvent::KeyRelease { keycode } => {
            (keycode, 0, 0)
        }
        RawInputEvent::ButtonPress { button } | RawInputEvent::ButtonRelease { button } => {
            (u8::try_from(button).unwrap_or(u8::MAX), 0, 0)
        }
        RawInputEvent::Motion { x, y } => (0, clamp_i16(x), clamp_i16(y)),
    };
    let wire = WireEvent {
        type_code: raw.event_type() as u8,
        detail,
        root_x: x,
        root_y: y,
        same_screen: true,
        ..WireEvent::default()
    };
    InterceptedRecord::from_server(encode_wire_event(&wire, ByteOrder::native()).to_vec())
}

fn clamp_i16(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

// ── Tests ─────────────────────────────────────────────────────────────────────
