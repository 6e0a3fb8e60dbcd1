//! Infrastructure layer for the recorder.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `xmacro_core`, but MUST NOT be imported by the `application` layer.

pub mod input_capture;
