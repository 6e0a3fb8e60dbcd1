//! Synthetic input backends.
//!
//! The X11 backend is only compiled on Linux via `#[cfg(target_os = "linux")]`.

pub mod mock;

#[cfg(target_os = "linux")]
pub mod xtest;
