//! Grab-based capture: exclusive pointer and keyboard grabs.
//!
//! # How the grab works (for beginners)
//!
//! `XGrabPointer` and `XGrabKeyboard` redirect every pointer and keyboard
//! event on the display to this client; other applications see nothing
//! until the grab is released.  The pointer is grabbed in synchronous mode,
//! so the server freezes pointer processing after each event until the
//! client calls `XAllowEvents(SyncPointer)`.  The loop therefore allows
//! one event, then blocks in `XWindowEvent` until it arrives:
//!
//! ```text
//! loop {
//!     XAllowEvents(SyncPointer)      -- let one more pointer event through
//!     XWindowEvent(root, mask)       -- block until it arrives
//!     yield RawInputEvent
//! }
//! ```
//!
//! Dropping the [`GrabSource`] releases both grabs.

use std::os::raw::{c_int, c_long, c_uint};

use tracing::debug;
use x11::xlib;
use xmacro_core::{Keycode, RawInputEvent};
use xmacro_play::infrastructure::display::XDisplay;

use super::CaptureError;

const POINTER_MASK: c_long =
    xlib::PointerMotionMask | xlib::ButtonPressMask | xlib::ButtonReleaseMask;
const DEVICE_MASK: c_long = xlib::KeyPressMask | xlib::KeyReleaseMask | POINTER_MASK;

/// Live device events from grabbed input devices.
pub struct GrabSource<'d> {
    display: &'d XDisplay,
    root: xlib::Window,
    mask: c_long,
}

impl<'d> GrabSource<'d> {
    /// Grabs the pointer and the keyboard of `display`.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::GrabFailed`] if either device is already
    /// grabbed by another client.
    pub fn acquire(display: &'d XDisplay) -> Result<Self, CaptureError> {
        let source = Self::new(display, DEVICE_MASK);
        // SAFETY: live display; `root` belongs to it.
        let pointer = unsafe {
            xlib::XGrabPointer(
                display.as_ptr(),
                source.root,
                xlib::False,
                POINTER_MASK as c_uint,
                xlib::GrabModeSync,
                xlib::GrabModeAsync,
                source.root,
                0,
                xlib::CurrentTime,
            )
        };
        check_grab("pointer", pointer)?;
        source.grab_keyboard()?;
        let display_name = display.name();
        debug!(display = %display_name, "pointer and keyboard grabbed");
        Ok(source)
    }

    /// Grabs only the keyboard and reports key presses.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::GrabFailed`] if the keyboard is already
    /// grabbed by another client.
    pub fn keyboard_only(display: &'d XDisplay) -> Result<Self, CaptureError> {
        let source = Self::new(display, xlib::KeyPressMask);
        source.grab_keyboard()?;
        Ok(source)
    }

    fn new(display: &'d XDisplay, mask: c_long) -> Self {
        Self {
            display,
            root: display.root_window(),
            mask,
        }
    }

    fn grab_keyboard(&self) -> Result<(), CaptureError> {
        // SAFETY: live display; `root` belongs to it.
        let status = unsafe {
            xlib::XGrabKeyboard(
                self.display.as_ptr(),
                self.root,
                xlib::False,
                xlib::GrabModeSync,
                xlib::GrabModeAsync,
                xlib::CurrentTime,
            )
        };
        check_grab("keyboard", status)
    }

    fn next_event(&mut self) -> xlib::XEvent {
        let mut event = xlib::XEvent { pad: [0; 24] };
        // SAFETY: live display; `event` is a properly sized out-parameter.
        unsafe {
            xlib::XAllowEvents(self.display.as_ptr(), xlib::SyncPointer, xlib::CurrentTime);
            xlib::XWindowEvent(self.display.as_ptr(), self.root, self.mask, &mut event);
        }
        event
    }
}

impl Iterator for GrabSource<'_> {
    type Item = RawInputEvent;

    fn next(&mut self) -> Option<RawInputEvent> {
        loop {
            let event = self.next_event();
            if let Some(raw) = raw_from_xevent(&event) {
                return Some(raw);
            }
        }
    }
}

impl Drop for GrabSource<'_> {
    fn drop(&mut self) {
        // SAFETY: live display; ungrabbing a device that is not grabbed is a no-op.
        unsafe {
            xlib::XUngrabPointer(self.display.as_ptr(), xlib::CurrentTime);
            xlib::XUngrabKeyboard(self.display.as_ptr(), xlib::CurrentTime);
        }
        self.display.flush();
        debug!("input devices released");
    }
}

fn check_grab(device: &'static str, status: c_int) -> Result<(), CaptureError> {
    if status == xlib::GrabSuccess {
        Ok(())
    } else {
        Err(CaptureError::GrabFailed { device, status })
    }
}

/// Converts a device event into the policy's raw form.
fn raw_from_xevent(event: &xlib::XEvent) -> Option<RawInputEvent> {
    // SAFETY: each arm reads the union member that matches the event type.
    unsafe {
        match event.get_type() {
            xlib::KeyPress => Some(RawInputEvent::KeyPress {
                keycode: Keycode::try_from(event.key.keycode).ok()?,
            }),
            xlib::KeyRelease => Some(RawInputEvent::KeyRelease {
                keycode: Keycode::try_from(event.key.keycode).ok()?,
            }),
            xlib::ButtonPress => Some(RawInputEvent::ButtonPress {
                button: event.button.button,
            }),
            xlib::ButtonRelease => Some(RawInputEvent::ButtonRelease {
                button: event.button.button,
            }),
            xlib::MotionNotify => Some(RawInputEvent::Motion {
                x: event.motion.x_root,
                y: event.motion.y_root,
            }),
            _ => None,
        }
    }
}
