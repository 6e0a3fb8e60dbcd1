//! Application layer for the recorder.

pub mod record_macro;
