//! Encoders and decoders for the two formats xmacro speaks.
//!
//! - [`wire`] – the 32-byte core-protocol event records delivered by the
//!   interception extension.
//! - [`text`] – the line-oriented macro stream shared by recorders and the
//!   player.

pub mod text;
pub mod wire;

pub use text::{encode_event, parse_line, write_event, EventStreamReader, StreamError};
pub use wire::{
    decode_record, decode_wire_event, encode_wire_event, ByteOrder, Decoded, InterceptedRecord, RecordCategory,
    SkipReason, WireError, WireEvent, WIRE_EVENT_SIZE,
};
