//! Wire format constants and the length prefix.
//!
//! Every message on the host stream is either a single status byte or a
//! frame:
//! ```text
//! ┌──────────────┬──────────────────────────┐
//! │ Length (L)   │ Payload                  │
//! │ 4 bytes      │ L bytes of UTF-8 JSON    │
//! │ uint32 LE    │                          │
//! └──────────────┴──────────────────────────┘
//! ```
//!
//! The length prefix is Little Endian.

use crate::error::{CanvasError, Result};

/// Length prefix size in bytes (fixed, exactly 4).
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum payload size accepted from the host (64 MB).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

/// Status bytes sent by the host ahead of each turn.
///
/// Codes are disjoint across phases, so a byte that arrives in the wrong
/// phase can never be mistaken for a valid one.
pub mod status {
    /// Handshake: host is up and wants the window options.
    pub const HOST_READY: u8 = 0;
    /// Handshake: window exists, host wants the canvas options.
    pub const CANVAS_READY: u8 = 1;
    /// Steady state: client sends its queued task batch.
    pub const FLUSH: u8 = 2;
    /// Steady state: host sends an event batch frame.
    pub const DELIVER_EVENTS: u8 = 3;
    /// Steady state: nothing to do, client answers with an empty batch.
    pub const IDLE: u8 = 4;

    /// Human readable name of a status byte, for logs.
    pub fn name(status: u8) -> &'static str {
        match status {
            HOST_READY => "HOST_READY",
            CANVAS_READY => "CANVAS_READY",
            FLUSH => "FLUSH",
            DELIVER_EVENTS => "DELIVER_EVENTS",
            IDLE => "IDLE",
            _ => "UNKNOWN",
        }
    }
}

/// Encode a payload length as a 4-byte LE prefix.
///
/// # Example
///
/// ```
/// use canvaswire_client::protocol::encode_length;
///
/// assert_eq!(encode_length(5).unwrap(), [5, 0, 0, 0]);
/// ```
pub fn encode_length(len: usize) -> Result<[u8; LENGTH_PREFIX_SIZE]> {
    let len = u32::try_from(len).map_err(|_| {
        CanvasError::Protocol(format!("Payload size {} does not fit a u32 prefix", len))
    })?;
    Ok(len.to_le_bytes())
}

/// Decode a 4-byte LE length prefix.
///
/// Returns `None` if the buffer is too short.
#[inline]
pub fn decode_length(buf: &[u8]) -> Option<u32> {
    let prefix: [u8; LENGTH_PREFIX_SIZE] = buf.get(..LENGTH_PREFIX_SIZE)?.try_into().ok()?;
    Some(u32::from_le_bytes(prefix))
}

/// Reject lengths above the configured maximum.
pub fn validate_length(len: u32, max_frame_size: u32) -> Result<()> {
    if len > max_frame_size {
        return Err(CanvasError::Protocol(format!(
            "Payload size {} exceeds maximum {}",
            len, max_frame_size
        )));
    }
    Ok(())
}
