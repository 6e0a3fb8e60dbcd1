//! The semantic input event shared by every xmacro component.
//!
//! An [`InputEvent`] is produced either by a capture session (from live
//! input) or by the text stream reader (from a recorded macro), and is
//! consumed exactly once by the stream encoder or the replay dispatcher.
//!
//! # Key representations (for beginners)
//!
//! X11 identifies a key in two different ways:
//!
//! | Representation | Example        | Portable across keyboards? |
//! |----------------|----------------|----------------------------|
//! | Keycode        | `38`           | No (physical position)     |
//! | Keysym         | `0x0061` (`a`) | Yes (meaning of the key)   |
//!
//! A keysym can also be written by its symbolic name (`"a"`, `"Return"`).
//! [`Key`] carries whichever of the three forms the producer had; the
//! player translates symbolic forms to a keycode on the target display.

use std::fmt;

/// A display-specific physical/logical key identifier (X11 keycodes are 8 bits).
pub type Keycode = u8;

/// A display-independent key meaning, as defined in `X11/keysymdef.h`.
pub type Keysym = u32;

/// Event type codes of the core X protocol that xmacro understands.
///
/// The numeric values are the ones used on the wire (byte 0 of an event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    KeyPress = 2,
    KeyRelease = 3,
    ButtonPress = 4,
    ButtonRelease = 5,
    MotionNotify = 6,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(EventType::KeyPress),
            3 => Ok(EventType::KeyRelease),
            4 => Ok(EventType::ButtonPress),
            5 => Ok(EventType::ButtonRelease),
            6 => Ok(EventType::MotionNotify),
            _ => Err(()),
        }
    }
}

/// How a key is identified inside an [`InputEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Raw destination keycode; replayed without translation.
    Code(Keycode),
    /// Numeric keysym id.
    Sym(Keysym),
    /// Symbolic keysym name such as `"Return"` or `"a"`.
    Name(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Code(code) => write!(f, "keycode {code}"),
            Key::Sym(sym) => write!(f, "keysym 0x{sym:04X}"),
            Key::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// One semantic input event, or a stream directive that is not input at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A key went down.
    KeyPress(Key),
    /// A key went up.
    KeyRelease(Key),
    /// A key press immediately followed by its release.
    KeyStroke(Key),
    /// A pointer button went down.
    ButtonPress(u32),
    /// A pointer button went up.
    ButtonRelease(u32),
    /// Absolute pointer position, before any replay-time scaling.
    MotionNotify { x: i32, y: i32 },
    /// Pause for the given number of milliseconds.
    Delay(u64),
    /// Raw text typed character by character on replay.
    Text(String),
    /// Free text after a `#`; ignored by the player.
    Comment(String),
    /// An unrecognised directive line, kept verbatim for diagnostics.
    Unknown(String),
}

impl InputEvent {
    /// Returns `true` for events that move the pointer.
    pub fn is_motion(&self) -> bool {
        matches!(self, InputEvent::MotionNotify { .. })
    }

    /// Returns `true` for events that only produce diagnostics on replay.
    pub fn is_passive(&self) -> bool {
        matches!(self, InputEvent::Comment(_) | InputEvent::Unknown(_))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
