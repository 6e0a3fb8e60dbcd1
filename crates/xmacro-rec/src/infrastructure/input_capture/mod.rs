//! Input capture infrastructure for the recorders.
//!
//! Two strategies acquire live input on the local display:
//!
//! - **`grab`** grabs the pointer and keyboard exclusively and blocks in
//!   `XWindowEvent` for the next device event.  Events arrive already
//!   structured, as [`RawInputEvent`](xmacro_core::RawInputEvent)s.
//! - **`intercept`** registers a RECORD context and receives every device
//!   event as a raw wire buffer through an asynchronous callback, without
//!   taking the devices away from other clients.
//!
//! Both are plain iterators that never end on their own: the record loop
//! stops pulling once the session sees the quit key, and dropping the
//! source releases the grab or the RECORD context.
//!
//! # Testability
//!
//! The OS-backed sources are only compiled on Linux.  Tests use
//! [`mock::ScriptedSource`] instead.

use thiserror::Error;
use tracing::warn;
use xmacro_core::{CaptureSession, Keycode};

pub mod mock;
pub mod quit_key;

#[cfg(target_os = "linux")]
pub mod grab;
#[cfg(target_os = "linux")]
pub mod intercept;

/// Error type for input capture operations.
///
/// Every variant is fatal for the recorder.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("cannot open X display '{0}'")]
    DisplayUnavailable(String),

    #[error("display '{display}' does not support the {extension} extension")]
    ExtensionMissing {
        display: String,
        extension: &'static str,
    },

    #[error("could not grab the {device} (status {status})")]
    GrabFailed { device: &'static str, status: i32 },

    #[error("could not set up event interception: {0}")]
    ContextFailed(&'static str),

    #[error("input ended before a key was pressed")]
    InputClosed,
}

/// Starts a capture session at the pointer position reported by the server.
///
/// `pointer` is `None` when the pointer is on another screen; events that
/// need a position are then dropped until the first motion.
pub fn session_at(quit_key: Keycode, pointer: Option<(i32, i32)>) -> CaptureSession {
    match pointer {
        Some((x, y)) => CaptureSession::new(quit_key).with_initial_position(x, y),
        None => {
            warn!("pointer is on another screen; waiting for the first motion");
            CaptureSession::new(quit_key)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
