//! Mock synthetic input backend for unit testing.
//!
//! # Why a mock backend?
//!
//! The real backend (`XTestInput`) makes X11 calls that:
//!
//! - Require a running X server.
//! - Actually move the pointer or press keys on that display.
//! - Cannot be observed directly from Rust test code.
//!
//! `MockSyntheticInput` replaces all X11 calls with in-memory recording.
//! Every call is pushed, in order, into a single `Mutex<Vec<SyntheticCall>>`
//! so tests can assert the exact interleaving of key, flush, and shift
//! events.
//!
//! # Usage in tests
//!
//! ```ignore
//! let input = MockSyntheticInput::new();
//! let mut dispatcher = ReplayDispatcher::new(&config, &input, &keymap, &mut echo);
//!
//! dispatcher.dispatch(&InputEvent::ButtonPress(1)).unwrap();
//!
//! assert_eq!(input.calls()[0], SyntheticCall::Button { button: 1, pressed: true, delay_ms: 10 });
//! ```
//!
//! # `should_fail` flag
//!
//! Build with [`MockSyntheticInput::failing`] to make every call return
//! `EmulationError::Platform`.

use std::sync::Mutex;

use xmacro_core::Keycode;

use crate::application::replay::{EmulationError, SyntheticInput};

/// One recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticCall {
    Key { keycode: Keycode, pressed: bool, delay_ms: u64 },
    Button { button: u32, pressed: bool, delay_ms: u64 },
    Motion { x: i32, y: i32, delay_ms: u64 },
    Flush,
    Discard,
}

/// A backend that records every call without touching a display.
#[derive(Debug, Default)]
pub struct MockSyntheticInput {
    calls: Mutex<Vec<SyntheticCall>>,
    /// When `true`, every method returns `EmulationError::Platform`.
    pub should_fail: bool,
}

impl MockSyntheticInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose every call fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Snapshot of the calls recorded so far, in order.
    pub fn calls(&self) -> Vec<SyntheticCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Recorded calls other than flushes and discards.
    pub fn input_calls(&self) -> Vec<SyntheticCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, SyntheticCall::Flush | SyntheticCall::Discard))
            .collect()
    }

    fn record(&self, call: SyntheticCall) -> Result<(), EmulationError> {
        if self.should_fail {
            return Err(EmulationError::Platform("mock failure".into()));
        }
        self.calls
            .lock()
            .map_err(|_| EmulationError::Platform("mock lock poisoned".into()))?
            .push(call);
        Ok(())
    }
}

impl SyntheticInput for MockSyntheticInput {
    fn fake_key(&self, keycode: Keycode, pressed: bool, delay_ms: u64) -> Result<(), EmulationError> {
        self.record(SyntheticCall::Key { keycode, pressed, delay_ms })
    }

    fn fake_button(&self, button: u32, pressed: bool, delay_ms: u64) -> Result<(), EmulationError> {
        self.record(SyntheticCall::Button { button, pressed, delay_ms })
    }

    fn fake_motion(&self, x: i32, y: i32, delay_ms: u64) -> Result<(), EmulationError> {
        self.record(SyntheticCall::Motion { x, y, delay_ms })
    }

    fn flush(&self) -> Result<(), EmulationError> {
        self.record(SyntheticCall::Flush)
    }

    fn discard(&self) -> Result<(), EmulationError> {
        self.record(SyntheticCall::Discard)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
