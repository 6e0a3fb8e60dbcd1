//! Linux X11 input emulation via the XTest extension.
//!
//! Uses `XTestFakeKeyEvent`, `XTestFakeMotionEvent`, and `XTestFakeButtonEvent`
//! to inject input events into the target X server.
//!
//! # What is XTest? (for beginners)
//!
//! XTest is an X11 protocol extension that lets a process synthesize keyboard
//! and mouse events as if the user had physically interacted with the hardware.
//! These events are delivered to the focused window exactly like real input.
//!
//! The key functions are:
//! - `XTestFakeKeyEvent(display, keycode, is_press, delay)` simulates a key
//!   press or release.
//! - `XTestFakeMotionEvent(display, screen, x, y, delay)` moves the cursor to
//!   absolute pixel coordinates.
//! - `XTestFakeButtonEvent(display, button, is_press, delay)` simulates a
//!   mouse button press or release.
//!
//! The `delay` argument is in milliseconds: the server holds the event back
//! that long after the previous one.
//!
//! # Session hygiene
//!
//! On connect the backend enables `XTestGrabControl`, so injection keeps
//! working while another client grabs the server.  `discard` resets any
//! keys or buttons the previous session left pressed.

use std::os::raw::{c_int, c_uint, c_ulong};

use tracing::info;
use x11::{xlib, xtest};
use xmacro_core::Keycode;

use crate::application::replay::{EmulationError, SyntheticInput};
use crate::infrastructure::display::XDisplay;

/// XTest-backed synthetic input on one display.
pub struct XTestInput {
    display: XDisplay,
    screen: c_int,
}

impl XTestInput {
    /// Opens `name` and checks that it supports XTest.
    ///
    /// # Errors
    ///
    /// Returns `EmulationError::Platform` if the display cannot be opened or
    /// lacks the XTest extension.
    pub fn connect(name: Option<&str>) -> Result<Self, EmulationError> {
        let display = XDisplay::open(name).map_err(|e| EmulationError::Platform(e.to_string()))?;

        let (mut event_base, mut error_base, mut major, mut minor) = (0, 0, 0, 0);
        // SAFETY: live display; out-pointers refer to locals.
        let supported = unsafe {
            xtest::XTestQueryExtension(
                display.as_ptr(),
                &mut event_base,
                &mut error_base,
                &mut major,
                &mut minor,
            )
        };
        if supported == xlib::False {
            return Err(EmulationError::Platform(format!(
                "display '{}' does not support the XTest extension",
                display.name()
            )));
        }
        let display_name = display.name();
        info!(display = %display_name, "XTest extension version {major}.{minor}");

        // SAFETY: live display.
        unsafe {
            xtest::XTestGrabControl(display.as_ptr(), xlib::True);
        }
        let screen = display.default_screen();
        Ok(Self { display, screen })
    }

    /// The underlying display, e.g. for keyboard mapping queries.
    pub fn display(&self) -> &XDisplay {
        &self.display
    }
}

fn bool_arg(pressed: bool) -> c_int {
    if pressed {
        xlib::True
    } else {
        xlib::False
    }
}

fn check(status: c_int, what: &str) -> Result<(), EmulationError> {
    if status == 0 {
        return Err(EmulationError::Platform(format!("{what} failed")));
    }
    Ok(())
}

impl SyntheticInput for XTestInput {
    fn fake_key(&self, keycode: Keycode, pressed: bool, delay_ms: u64) -> Result<(), EmulationError> {
        // SAFETY: live display.
        let status = unsafe {
            xtest::XTestFakeKeyEvent(
                self.display.as_ptr(),
                c_uint::from(keycode),
                bool_arg(pressed),
                delay_ms as c_ulong,
            )
        };
        check(status, "XTestFakeKeyEvent")
    }

    fn fake_button(&self, button: u32, pressed: bool, delay_ms: u64) -> Result<(), EmulationError> {
        // SAFETY: live display.
        let status = unsafe {
            xtest::XTestFakeButtonEvent(
                self.display.as_ptr(),
                button as c_uint,
                bool_arg(pressed),
                delay_ms as c_ulong,
            )
        };
        check(status, "XTestFakeButtonEvent")
    }

    fn fake_motion(&self, x: i32, y: i32, delay_ms: u64) -> Result<(), EmulationError> {
        // SAFETY: live display.
        let status = unsafe {
            xtest::XTestFakeMotionEvent(self.display.as_ptr(), self.screen, x, y, delay_ms as c_ulong)
        };
        check(status, "XTestFakeMotionEvent")
    }

    fn flush(&self) -> Result<(), EmulationError> {
        self.display.flush();
        Ok(())
    }

    fn discard(&self) -> Result<(), EmulationError> {
        // SAFETY: live display.
        unsafe {
            xtest::XTestDiscard(self.display.as_ptr());
        }
        Ok(())
    }
}
