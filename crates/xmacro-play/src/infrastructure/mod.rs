//! Infrastructure layer for the player.
//!
//! Contains the display-facing adapters.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `xmacro_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`display`** – owned X11 display connection that also serves as the
//!   target [`KeyboardMapping`](xmacro_core::KeyboardMapping) (Linux only).
//! - **`input_emulation`** – implementations of `SyntheticInput`: XTest on
//!   Linux and a recording mock for tests.

#[cfg(target_os = "linux")]
pub mod display;
pub mod input_emulation;
