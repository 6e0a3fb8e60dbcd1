//! # xmacro-core
//!
//! Shared library for the xmacro recorder and player: the input event model,
//! the capture policy, the wire-event decoder, the macro text format, and
//! cross-keyboard key translation.
//!
//! It has no dependencies on a display server, so everything here can be
//! tested without X11.
//!
//! # Architecture overview (for beginners)
//!
//! xmacro records keyboard and mouse activity on one X display as a plain
//! text macro, and plays such a macro back on another (possibly remote)
//! display:
//!
//! ```text
//! capture ─► RawInputEvent ─► CaptureSession ─► InputEvent ─► text line
//!                                                               │
//! synthetic input ◄─ KeyTranslator ◄─ InputEvent ◄─ EventStreamReader
//! ```
//!
//! - **`domain`** – the [`InputEvent`] union and the [`CaptureSession`]
//!   policy that decides which live events make it into a macro.
//! - **`protocol`** – the 32-byte wire records delivered by the
//!   interception extension, and the line-oriented text format.
//! - **`keymap`** – keysym names, case conversion, and the
//!   [`KeyTranslator`] that finds keycodes on the target keyboard.
//! - **`config`** – the [`MacroConfig`] shared by all binaries.

pub mod config;
pub mod domain;
pub mod keymap;
pub mod protocol;

pub use config::{ConfigError, ConfigOverrides, MacroConfig};
pub use domain::event::{EventType, InputEvent, Key, Keycode, Keysym};
pub use domain::session::{CaptureSession, Disposition, DropReason, RawInputEvent, SessionState};
pub use keymap::{CharStroke, KeyTranslator, KeyboardMapping, StaticKeymap, TranslateError};
pub use protocol::text::{encode_event, EventStreamReader, StreamError};
pub use protocol::wire::{decode_record, Decoded, InterceptedRecord, WireError};
