//! Interception-based capture through the RECORD extension.
//!
//! # How interception works (for beginners)
//!
//! RECORD lets a client see a copy of the protocol traffic of every other
//! client.  The recorder asks for the device events `KeyPress` through
//! `MotionNotify` of all clients.  Nothing is grabbed: the user keeps
//! working normally while the recorder listens.
//!
//! The extension needs two connections.  The *data* connection enables the
//! context and receives the intercepted buffers; the *control* connection
//! is the one that later disables and frees it.
//!
//! ```text
//! next()
//!  └─ XRecordProcessReplies(data)       -- may call on_intercept() N times
//!       └─ on_intercept()               -- copy buffer into queue, free it
//!  └─ pop one InterceptedRecord from the queue
//! ```
//!
//! The callback never blocks: it only copies the buffer.  Decoding and
//! the capture policy run in the record loop, one buffer per `next()`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::os::raw::{c_char, c_int};
use std::time::Duration;

use tracing::{debug, info, warn};
use x11::{xlib, xrecord};
use xmacro_core::protocol::RecordCategory;
use xmacro_core::{EventType, InterceptedRecord};
use xmacro_play::infrastructure::display::XDisplay;

use super::CaptureError;

/// Sleep between reply polls while nothing was intercepted.
const IDLE_POLL: Duration = Duration::from_millis(1);

type RecordQueue = RefCell<VecDeque<InterceptedRecord>>;

/// Intercepted device-event buffers from every client of a display.
pub struct InterceptSource<'d> {
    control: &'d XDisplay,
    data: XDisplay,
    context: xrecord::XRecordContext,
    // Set once XRecordEnableContextAsync succeeds.
    enabled: bool,
    range: *mut xrecord::XRecordRange,
    // Boxed so the address handed to the callback stays put.
    queue: Box<RecordQueue>,
}

impl<'d> InterceptSource<'d> {
    /// Opens a second connection to `control`'s display and starts
    /// intercepting device events of all clients.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if the data connection cannot be opened,
    /// the server lacks RECORD, or the context cannot be set up.
    pub fn start(control: &'d XDisplay) -> Result<Self, CaptureError> {
        let data = XDisplay::open(Some(control.name()))
            .map_err(|e| CaptureError::DisplayUnavailable(e.name))?;

        let (mut major, mut minor): (c_int, c_int) = (0, 0);
        // SAFETY: live display; out-pointers refer to locals.
        if unsafe { xrecord::XRecordQueryVersion(data.as_ptr(), &mut major, &mut minor) } == 0 {
            return Err(CaptureError::ExtensionMissing {
                display: data.name().to_string(),
                extension: "RECORD",
            });
        }
        info!(display = %data.name(), "RECORD extension version {major}.{minor}");

        // SAFETY: plain allocation; checked for null below.
        let range = unsafe { xrecord::XRecordAllocRange() };
        if range.is_null() {
            return Err(CaptureError::ContextFailed("cannot allocate record range"));
        }
        // SAFETY: `range` is a valid, zeroed allocation.
        unsafe {
            (*range).device_events.first = EventType::KeyPress as u8;
            (*range).device_events.last = EventType::MotionNotify as u8;
        }

        let mut clients: xrecord::XRecordClientSpec = xrecord::XRecordAllClients;
        let mut ranges = range;
        // SAFETY: live display; one client spec and one range, both valid.
        let context =
            unsafe { xrecord::XRecordCreateContext(data.as_ptr(), 0, &mut clients, 1, &mut ranges, 1) };

        let mut source = Self {
            control,
            data,
            context,
            enabled: false,
            range,
            queue: Box::new(RefCell::new(VecDeque::new())),
        };
        if context == 0 {
            return Err(CaptureError::ContextFailed("cannot create record context"));
        }

        let closure = (&*source.queue as *const RecordQueue).cast_mut().cast::<c_char>();
        // SAFETY: live display and context; `closure` points into the boxed
        // queue, which outlives the context (disabled in `drop`).
        let enabled = unsafe {
            xrecord::XRecordEnableContextAsync(
                source.data.as_ptr(),
                source.context,
                Some(on_intercept),
                closure,
            )
        };
        if enabled == 0 {
            return Err(CaptureError::ContextFailed("cannot enable record context"));
        }
        source.enabled = true;
        debug!(context = source.context, "record context enabled");
        Ok(source)
    }
}

impl Iterator for InterceptSource<'_> {
    type Item = InterceptedRecord;

    fn next(&mut self) -> Option<InterceptedRecord> {
        loop {
            if let Some(record) = self.queue.borrow_mut().pop_front() {
                return Some(record);
            }
            // SAFETY: live display with an enabled context.
            unsafe {
                xrecord::XRecordProcessReplies(self.data.as_ptr());
            }
            if self.queue.borrow().is_empty() {
                std::thread::sleep(IDLE_POLL);
            }
        }
    }
}

/// What `Drop` has to undo for a context in a given state.
#[derive(Debug, PartialEq, Eq)]
struct Teardown {
    disable: bool,
    free: bool,
}

impl Teardown {
    fn for_context(context: xrecord::XRecordContext, enabled: bool) -> Self {
        Self {
            disable: context != 0 && enabled,
            free: context != 0,
        }
    }
}

impl Drop for InterceptSource<'_> {
    fn drop(&mut self) {
        let teardown = Teardown::for_context(self.context, self.enabled);
        // SAFETY: the context was created on this server; it is disabled
        // through the control connection, as RECORD requires.
        unsafe {
            if teardown.disable
                && xrecord::XRecordDisableContext(self.control.as_ptr(), self.context) == 0
            {
                warn!("XRecordDisableContext failed");
            }
            if teardown.free && xrecord::XRecordFreeContext(self.control.as_ptr(), self.context) == 0 {
                warn!("XRecordFreeContext failed");
            }
        }
        if teardown.free {
            self.control.sync();
        }
        // SAFETY: allocated by XRecordAllocRange and freed exactly once.
        unsafe {
            xlib::XFree(self.range.cast());
        }
        debug!("record context released");
    }
}

/// RECORD callback: copies one intercepted buffer into the queue.
///
/// Runs inside `XRecordProcessReplies` on the recording thread.
unsafe extern "C" fn on_intercept(closure: *mut c_char, data: *mut xrecord::XRecordInterceptData) {
    if data.is_null() {
        return;
    }
    // SAFETY: the server hands us a valid record until XRecordFreeData.
    let intercepted = unsafe { &*data };
    if let Ok(category) = RecordCategory::try_from(intercepted.category) {
        // `data_len` counts 4-byte units.
        let len = intercepted.data_len as usize * 4;
        let bytes = if intercepted.data.is_null() || len == 0 {
            Vec::new()
        } else {
            // SAFETY: the record owns `len` bytes at `data`.
            unsafe { std::slice::from_raw_parts(intercepted.data, len) }.to_vec()
        };
        // SAFETY: `closure` is the boxed queue registered in `start`.
        let queue = unsafe { &*(closure as *const RecordQueue) };
        if let Ok(mut queue) = queue.try_borrow_mut() {
            queue.push_back(InterceptedRecord {
                category,
                client_swapped: intercepted.client_swapped != 0,
                data: bytes,
            });
        }
    }
    // SAFETY: every record handed to the callback is freed exactly once.
    unsafe {
        xrecord::XRecordFreeData(data);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_context_is_disabled_then_freed() {
        assert_eq!(Teardown::for_context(7, true), Teardown { disable: true, free: true });
    }

    #[test]
    fn test_context_that_failed_to_enable_is_only_freed() {
        assert_eq!(Teardown::for_context(7, false), Teardown { disable: false, free: true });
    }

    #[test]
    fn test_missing_context_needs_no_teardown() {
        assert_eq!(Teardown::for_context(0, false), Teardown { disable: false, free: false });
    }
}
