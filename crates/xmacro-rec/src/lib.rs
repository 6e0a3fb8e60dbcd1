//! xmacro-rec library entry point.
//!
//! Shared by the `xmacrorec` and `xmacrorec2` binaries and by the
//! integration tests in `tests/`.
//!
//! # What does the recorder do? (for beginners)
//!
//! A recorder watches the keyboard and pointer of the local X display and
//! writes what it sees to standard output, one directive per line, until
//! the quit key is pressed.  Two capture strategies exist:
//!
//! | Binary       | Strategy                    | Live mirror |
//! |--------------|-----------------------------|-------------|
//! | `xmacrorec`  | exclusive grab of both devices | yes, to a remote display |
//! | `xmacrorec2` | passive interception (RECORD) | no |
//!
//! Both feed the same `CaptureSession` policy from `xmacro_core`, so equal
//! input yields an equal macro.

/// Application layer: the record use case.
pub mod application;

/// Infrastructure layer: capture sources.
pub mod infrastructure;
