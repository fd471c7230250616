//! Protocol module - wire format and framing.
//!
//! This module implements the host stream protocol:
//! - 4-byte LE length prefix and the status byte table
//! - Frame codec over buffers and async streams

mod frame;
mod wire_format;

pub use frame::{
    build_frame, decode_frame, encode_frame, read_frame, read_value, write_frame, Frame,
};
pub use wire_format::{
    decode_length, encode_length, status, validate_length, DEFAULT_MAX_FRAME_SIZE,
    LENGTH_PREFIX_SIZE,
};
