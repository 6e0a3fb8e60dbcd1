//! Capture policy shared by every capture strategy.
//!
//! Both recorders (the exclusive-grab loop and the protocol-interception
//! loop) acquire raw pointer/keyboard events in different ways, but they
//! must turn them into the *same* [`InputEvent`] sequence.  That policy
//! lives here, in [`CaptureSession`], and the strategies only feed it
//! [`RawInputEvent`]s.
//!
//! # Policy rules
//!
//! 1. **Stale releases** – the first two events of a session may be a
//!    `KeyRelease` left over from the key that started the recorder (the
//!    Return key of the shell prompt, for instance).  While the stale
//!    counter is positive every `KeyRelease` is dropped and the counter
//!    decremented; any other event resets it to 0.
//! 2. **Quit key** – a `KeyPress` of the configured quit keycode stops the
//!    session.  It is never emitted, and once stopped every later event
//!    (including the quit key's own release) is dropped.
//! 3. **Position gating** – until the pointer position is known (one
//!    motion seen, or seeded with [`CaptureSession::with_initial_position`])
//!    every non-motion event is dropped: replay could not place it.
//! 4. **Motion buffering** – while no button is held, motion is only
//!    remembered ("pending") and emitted right before the next non-motion
//!    event.  While a button is held (a drag), every motion is emitted.

use tracing::debug;

use super::event::{EventType, InputEvent, Key, Keycode};

/// Number of leading `KeyRelease` events that may be stale at session start.
pub const STALE_RELEASE_WINDOW: u8 = 2;

/// A live input event before any policy has been applied.
///
/// Coordinates are root-window relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInputEvent {
    KeyPress { keycode: Keycode },
    KeyRelease { keycode: Keycode },
    ButtonPress { button: u32 },
    ButtonRelease { button: u32 },
    Motion { x: i32, y: i32 },
}

impl RawInputEvent {
    /// The core protocol event type of this event.
    pub fn event_type(&self) -> EventType {
        match self {
            RawInputEvent::KeyPress { .. } => EventType::KeyPress,
            RawInputEvent::KeyRelease { .. } => EventType::KeyRelease,
            RawInputEvent::ButtonPress { .. } => EventType::ButtonPress,
            RawInputEvent::ButtonRelease { .. } => EventType::ButtonRelease,
            RawInputEvent::Motion { .. } => EventType::MotionNotify,
        }
    }
}

/// Why the session swallowed a raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// A `KeyRelease` inside the stale-release window.
    StaleRelease,
    /// A non-motion event before the pointer position was known.
    UnknownPosition,
    /// The session has already been stopped by the quit key.
    Stopped,
}

/// Outcome of feeding one raw event to a [`CaptureSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The event passed the policy.  The vector holds the stream events to
    /// emit, in order; it is empty when a motion was only buffered.
    Accepted(Vec<InputEvent>),
    /// The event was swallowed.
    Dropped(DropReason),
    /// The quit key was pressed; the session is now stopped.
    Stop,
}

/// Lifecycle of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Stopped,
}

/// Per-session capture state: counters, last known position, quit key.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    quit_key: Keycode,
    stale_releases: u8,
    buttons_held: u32,
    position: Option<(i32, i32)>,
    motion_pending: bool,
    state: SessionState,
}

impl CaptureSession {
    /// Starts a session with an unknown pointer position.
    pub fn new(quit_key: Keycode) -> Self {
        Self {
            quit_key,
            stale_releases: STALE_RELEASE_WINDOW,
            buttons_held: 0,
            position: None,
            motion_pending: false,
            state: SessionState::Running,
        }
    }

    /// Seeds the pointer position (e.g. from a pointer query at start-up).
    ///
    /// The seeded position counts as pending motion, so the stream begins
    /// with a `MotionNotify` before the first non-motion event.
    pub fn with_initial_position(mut self, x: i32, y: i32) -> Self {
        self.position = Some((x, y));
        self.motion_pending = true;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn quit_key(&self) -> Keycode {
        self.quit_key
    }

    /// Last known pointer position, if any.
    pub fn position(&self) -> Option<(i32, i32)> {
        self.position
    }

    /// Returns `true` when a motion is buffered but not yet emitted.
    pub fn has_pending_motion(&self) -> bool {
        self.motion_pending
    }

    pub fn buttons_held(&self) -> u32 {
        self.buttons_held
    }

    /// Applies the capture policy to one raw event.
    pub fn process(&mut self, raw: RawInputEvent) -> Disposition {
        if self.state == SessionState::Stopped {
            return Disposition::Dropped(DropReason::Stopped);
        }

        if self.stale_releases > 0 {
            if let RawInputEvent::KeyRelease { keycode } = raw {
                self.stale_releases -= 1;
                debug!(keycode, remaining = self.stale_releases, "skipping stale KeyRelease");
                return Disposition::Dropped(DropReason::StaleRelease);
            }
            self.stale_releases = 0;
        }

        if let RawInputEvent::KeyPress { keycode } = raw {
            if keycode == self.quit_key {
                self.state = SessionState::Stopped;
                return Disposition::Stop;
            }
        }

        if self.position.is_none() && !matches!(raw, RawInputEvent::Motion { .. }) {
            debug!(?raw, "pointer position unknown; move the pointer first");
            return Disposition::Dropped(DropReason::UnknownPosition);
        }

        let mut out = Vec::with_capacity(2);
        match raw {
            RawInputEvent::Motion { x, y } => {
                self.position = Some((x, y));
                if self.buttons_held > 0 {
                    self.motion_pending = false;
                    out.push(InputEvent::MotionNotify { x, y });
                } else {
                    self.motion_pending = true;
                }
            }
            RawInputEvent::ButtonPress { button } => {
                self.flush_motion(&mut out);
                self.buttons_held += 1;
                out.push(InputEvent::ButtonPress(button));
            }
            RawInputEvent::ButtonRelease { button } => {
                self.flush_motion(&mut out);
                self.buttons_held = self.buttons_held.saturating_sub(1);
                out.push(InputEvent::ButtonRelease(button));
            }
            RawInputEvent::KeyPress { keycode } => {
                self.flush_motion(&mut out);
                out.push(InputEvent::KeyPress(Key::Code(keycode)));
            }
            RawInputEvent::KeyRelease { keycode } => {
                self.flush_motion(&mut out);
                out.push(InputEvent::KeyRelease(Key::Code(keycode)));
            }
        }
        Disposition::Accepted(out)
    }

    fn flush_motion(&mut self, out: &mut Vec<InputEvent>) {
        if self.motion_pending {
            if let Some((x, y)) = self.position {
                out.push(InputEvent::MotionNotify { x, y });
            }
            self.motion_pending = false;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const QUIT: Keycode = 9;

    fn emitted(session: &mut CaptureSession, raws: &[RawInputEvent]) -> Vec<InputEvent> {
        raws.iter()
            .filter_map(|raw| match session.process(*raw) {
                Disposition::Accepted(events) => Some(events),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn test_new_session_is_running_with_unknown_position() {
        let session = CaptureSession::new(QUIT);
        assert!(session.is_running());
        assert_eq!(session.position(), None);
        assert!(!session.has_pending_motion());
    }

    #[test]
    fn test_stale_window_drops_two_leading_releases() {
        // Arrange
        let mut session = CaptureSession::new(QUIT).with_initial_position(0, 0);
        let release = RawInputEvent::KeyRelease { keycode: 36 };

        // Act
        let first = session.process(release);
        let second = session.process(release);
        let third = session.process(release);

        // Assert
        assert_eq!(first, Disposition::Dropped(DropReason::StaleRelease));
        assert_eq!(second, Disposition::Dropped(DropReason::StaleRelease));
        assert!(matches!(third, Disposition::Accepted(_)));
    }

    #[test]
    fn test_non_release_event_closes_stale_window() {
        // Arrange
        let mut session = CaptureSession::new(QUIT);

        // Act
        session.process(RawInputEvent::Motion { x: 1, y: 1 });
        let release = session.process(RawInputEvent::KeyRelease { keycode: 36 });

        // Assert
        assert_eq!(
            release,
            Disposition::Accepted(vec![
                InputEvent::MotionNotify { x: 1, y: 1 },
                InputEvent::KeyRelease(Key::Code(36)),
            ])
        );
    }

    #[test]
    fn test_motion_without_button_is_buffered() {
        let mut session = CaptureSession::new(QUIT);

        let d = session.process(RawInputEvent::Motion { x: 3, y: 4 });

        assert_eq!(d, Disposition::Accepted(vec![]));
        assert!(session.has_pending_motion());
        assert_eq!(session.position(), Some((3, 4)));
    }

    #[test]
    fn test_motion_coalesces_into_latest_before_button() {
        let mut session = CaptureSession::new(QUIT);

        let out = emitted(
            &mut session,
            &[
                RawInputEvent::Motion { x: 1, y: 1 },
                RawInputEvent::Motion { x: 2, y: 2 },
                RawInputEvent::ButtonPress { button: 1 },
            ],
        );

        assert_eq!(
            out,
            vec![InputEvent::MotionNotify { x: 2, y: 2 }, InputEvent::ButtonPress(1)]
        );
    }

    #[test]
    fn test_drag_emits_every_motion() {
        let mut session = CaptureSession::new(QUIT);

        let out = emitted(
            &mut session,
            &[
                RawInputEvent::Motion { x: 0, y: 0 },
                RawInputEvent::ButtonPress { button: 1 },
                RawInputEvent::Motion { x: 5, y: 5 },
                RawInputEvent::Motion { x: 6, y: 7 },
                RawInputEvent::ButtonRelease { button: 1 },
            ],
        );

        assert_eq!(
            out,
            vec![
                InputEvent::MotionNotify { x: 0, y: 0 },
                InputEvent::ButtonPress(1),
                InputEvent::MotionNotify { x: 5, y: 5 },
                InputEvent::MotionNotify { x: 6, y: 7 },
                InputEvent::ButtonRelease(1),
            ]
        );
        assert_eq!(session.buttons_held(), 0);
    }

    #[test]
    fn test_button_counter_floors_at_zero() {
        let mut session = CaptureSession::new(QUIT).with_initial_position(0, 0);

        session.process(RawInputEvent::ButtonRelease { button: 1 });
        session.process(RawInputEvent::ButtonRelease { button: 1 });

        assert_eq!(session.buttons_held(), 0);
    }

    #[test]
    fn test_unknown_position_drops_button() {
        let mut session = CaptureSession::new(QUIT);

        let d = session.process(RawInputEvent::ButtonPress { button: 1 });

        assert_eq!(d, Disposition::Dropped(DropReason::UnknownPosition));
        assert_eq!(session.buttons_held(), 0);
    }

    #[test]
    fn test_initial_position_is_emitted_before_first_event() {
        let mut session = CaptureSession::new(QUIT).with_initial_position(10, 20);

        let out = emitted(&mut session, &[RawInputEvent::KeyPress { keycode: 38 }]);

        assert_eq!(
            out,
            vec![
                InputEvent::MotionNotify { x: 10, y: 20 },
                InputEvent::KeyPress(Key::Code(38)),
            ]
        );
    }

    #[test]
    fn test_quit_key_stops_session_without_emitting() {
        let mut session = CaptureSession::new(QUIT).with_initial_position(0, 0);

        let d = session.process(RawInputEvent::KeyPress { keycode: QUIT });

        assert_eq!(d, Disposition::Stop);
        assert_eq!(session.state(), SessionState::Stopped);
        // Pending motion is not flushed by the quit key.
        assert!(session.has_pending_motion());
    }

    #[test]
    fn test_quit_key_recognised_before_position_known() {
        let mut session = CaptureSession::new(QUIT);
        assert_eq!(session.process(RawInputEvent::KeyPress { keycode: QUIT }), Disposition::Stop);
    }

    #[test]
    fn test_events_after_stop_are_dropped() {
        let mut session = CaptureSession::new(QUIT).with_initial_position(0, 0);
        session.process(RawInputEvent::KeyPress { keycode: QUIT });

        let release = session.process(RawInputEvent::KeyRelease { keycode: QUIT });
        let motion = session.process(RawInputEvent::Motion { x: 1, y: 1 });

        assert_eq!(release, Disposition::Dropped(DropReason::Stopped));
        assert_eq!(motion, Disposition::Dropped(DropReason::Stopped));
    }

    #[test]
    fn test_raw_event_type_mapping() {
        assert_eq!(RawInputEvent::Motion { x: 0, y: 0 }.event_type(), EventType::MotionNotify);
        assert_eq!(RawInputEvent::KeyRelease { keycode: 1 }.event_type(), EventType::KeyRelease);
    }
}
