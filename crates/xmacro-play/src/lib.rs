//! xmacro-play library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`,
//! the `xmacroplay` binary, and the recorder's live mirror share the same
//! module tree.
//!
//! # What does the player do? (for beginners)
//!
//! The player reads a macro (one directive per line, see
//! `xmacro_core::protocol::text`) from standard input and replays it as
//! synthetic input on a possibly remote X display:
//!
//! 1. Opens the target display and checks for the XTest extension.
//! 2. Parses each line into an `InputEvent`.
//! 3. Translates key names and keysyms into keycodes of the *target*
//!    keyboard, adding Shift where a typed character needs it.
//! 4. Scales pointer coordinates by the configured factor.
//! 5. Injects the events with XTest and echoes every directive to standard
//!    output.

/// Application layer: the replay use case.
pub mod application;

/// Command-line options shared by all xmacro binaries.
pub mod cli;

/// Infrastructure layer: X11 display and synthetic input backends.
pub mod infrastructure;
