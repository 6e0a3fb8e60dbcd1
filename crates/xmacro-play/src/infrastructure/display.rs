//! Owned X11 display connection.
//!
//! [`XDisplay`] wraps the raw `*mut Display` returned by `XOpenDisplay` and
//! closes it on drop.  It also implements [`KeyboardMapping`] on top of the
//! display's keyboard map, so the same connection that injects or captures
//! events can translate keys.
//!
//! # Safety
//!
//! Xlib connections are not thread-safe by default.  `XDisplay` is neither
//! `Send` nor `Sync` (it holds a raw pointer), so the compiler keeps each
//! connection on the thread that opened it.

use std::ffi::{CStr, CString};
use std::os::raw::{c_int, c_ulong, c_void};
use std::ptr::NonNull;

use thiserror::Error;
use tracing::debug;
use x11::xlib;
use xmacro_core::{keymap::keysym, KeyboardMapping, Keycode, Keysym};

/// The display could not be opened.
#[derive(Debug, Error)]
#[error("cannot open X display '{name}'")]
pub struct DisplayError {
    pub name: String,
}

/// An open connection to an X server.
pub struct XDisplay {
    raw: NonNull<xlib::Display>,
    name: String,
}

impl XDisplay {
    /// Opens the display `name`, or the one named by `$DISPLAY` for `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError`] if the name contains a NUL byte or the
    /// server cannot be reached.
    pub fn open(name: Option<&str>) -> Result<Self, DisplayError> {
        let label = name.unwrap_or("$DISPLAY").to_string();
        let c_name = match name {
            Some(n) => Some(CString::new(n).map_err(|_| DisplayError { name: label.clone() })?),
            None => None,
        };
        let ptr = c_name.as_ref().map_or(std::ptr::null(), |c| c.as_ptr());

        // SAFETY: `ptr` is null or a valid NUL-terminated string that
        // outlives the call.
        let raw = unsafe { xlib::XOpenDisplay(ptr) };
        let raw = NonNull::new(raw).ok_or(DisplayError { name: label })?;

        // SAFETY: `raw` is a live display; the returned string is owned by Xlib.
        let name = unsafe { c_string(xlib::XDisplayString(raw.as_ptr())) }.unwrap_or_default();
        debug!(display = %name, "display opened");
        Ok(Self { raw, name })
    }

    /// Raw pointer for FFI calls.  Valid for the lifetime of `self`.
    pub fn as_ptr(&self) -> *mut xlib::Display {
        self.raw.as_ptr()
    }

    /// The server's name for this display, e.g. `":0"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_screen(&self) -> c_int {
        // SAFETY: live display.
        unsafe { xlib::XDefaultScreen(self.as_ptr()) }
    }

    pub fn root_window(&self) -> xlib::Window {
        // SAFETY: live display; the screen number comes from the server.
        unsafe { xlib::XRootWindow(self.as_ptr(), self.default_screen()) }
    }

    /// Sends all queued requests.
    pub fn flush(&self) {
        // SAFETY: live display.
        unsafe {
            xlib::XFlush(self.as_ptr());
        }
    }

    /// Sends all queued requests and waits until the server processed them.
    pub fn sync(&self) {
        // SAFETY: live display.
        unsafe {
            xlib::XSync(self.as_ptr(), xlib::False);
        }
    }

    /// Current pointer position relative to the root window.
    pub fn query_pointer(&self) -> Option<(i32, i32)> {
        let (mut root, mut child) = (0, 0);
        let (mut root_x, mut root_y, mut win_x, mut win_y) = (0, 0, 0, 0);
        let mut mask = 0;
        // SAFETY: live display; every out-pointer refers to a local.
        let same_screen = unsafe {
            xlib::XQueryPointer(
                self.as_ptr(),
                self.root_window(),
                &mut root,
                &mut child,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut mask,
            )
        };
        (same_screen != xlib::False).then_some((root_x, root_y))
    }
}

impl Drop for XDisplay {
    fn drop(&mut self) {
        debug!(display = %self.name, "closing display");
        // SAFETY: the pointer came from XOpenDisplay and is closed exactly once.
        unsafe {
            xlib::XCloseDisplay(self.raw.as_ptr());
        }
    }
}

impl KeyboardMapping for XDisplay {
    fn keycode_for_keysym(&self, sym: Keysym) -> Option<Keycode> {
        // SAFETY: live display.
        let code = unsafe { xlib::XKeysymToKeycode(self.as_ptr(), c_ulong::from(sym)) };
        (code != 0).then_some(code)
    }

    fn keysyms_for_keycode(&self, code: Keycode) -> Vec<Keysym> {
        let mut per_code: c_int = 0;
        // SAFETY: live display; asks for exactly one keycode.
        let syms = unsafe { xlib::XGetKeyboardMapping(self.as_ptr(), code, 1, &mut per_code) };
        if syms.is_null() {
            return Vec::new();
        }
        let len = usize::try_from(per_code).unwrap_or(0);
        // SAFETY: Xlib returned `per_code` keysyms for the one keycode.
        let out = unsafe { std::slice::from_raw_parts(syms, len) }
            .iter()
            .map(|&s| Keysym::try_from(s).unwrap_or(0))
            .collect();
        // SAFETY: the array was allocated by Xlib and is freed once.
        unsafe {
            xlib::XFree(syms.cast::<c_void>());
        }
        out
    }

    fn keysym_from_name(&self, name: &str) -> Option<Keysym> {
        let c_name = CString::new(name).ok()?;
        // SAFETY: valid NUL-terminated string.
        let sym = unsafe { xlib::XStringToKeysym(c_name.as_ptr()) };
        match Keysym::try_from(sym) {
            Ok(0) | Err(_) => keysym::keysym_from_name(name),
            Ok(sym) => Some(sym),
        }
    }

    fn keysym_name(&self, sym: Keysym) -> String {
        // SAFETY: the returned string is static Xlib data, or null.
        unsafe { c_string(xlib::XKeysymToString(c_ulong::from(sym))) }
            .unwrap_or_else(|| keysym::keysym_to_name(sym))
    }
}

/// Copies a C string owned by Xlib.
///
/// # Safety
///
/// `ptr` must be null or point to a valid NUL-terminated string.
unsafe fn c_string(ptr: *const std::os::raw::c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}
