//! Frame codec: length-prefixed JSON payloads.
//!
//! A frame is a 4-byte LE length followed by exactly that many bytes of
//! JSON. Both a buffer form ([`encode_frame`] / [`decode_frame`]) and a
//! stream form ([`read_frame`] / [`write_frame`]) are provided. The stream
//! form never returns a short payload: partial reads are retried until the
//! declared length has arrived or the stream ends.
//!
//! # Example
//!
//! ```
//! use canvaswire_client::protocol::{decode_frame, encode_frame};
//!
//! let bytes = encode_frame(&vec!["present"]).unwrap();
//! assert_eq!(&bytes[..4], &[11, 0, 0, 0]);
//!
//! let batch: Vec<String> = decode_frame(&bytes).unwrap();
//! assert_eq!(batch, vec!["present".to_string()]);
//! ```

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::wire_format::{decode_length, encode_length, validate_length, LENGTH_PREFIX_SIZE};
use crate::codec::JsonCodec;
use crate::error::{CanvasError, Result};

/// A complete frame payload, read off the stream but not yet decoded.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Payload bytes (without the length prefix).
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame from payload bytes.
    pub fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Deserialize the JSON payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        JsonCodec::decode(&self.payload)
    }
}

/// Build a complete frame from an already-encoded payload.
pub fn build_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let prefix = encode_length(payload.len())?;
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&prefix);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Serialize a value to JSON and prepend its length.
pub fn encode_frame<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let payload = JsonCodec::encode(value)?;
    build_frame(&payload)
}

/// Decode one complete frame held in memory.
///
/// The buffer must contain exactly one frame: the prefix has to match the
/// number of payload bytes that follow it.
pub fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let len = decode_length(bytes).ok_or_else(|| {
        CanvasError::Protocol(format!(
            "Frame too short: {} bytes, need at least {}",
            bytes.len(),
            LENGTH_PREFIX_SIZE
        ))
    })?;

    let payload = &bytes[LENGTH_PREFIX_SIZE..];
    if payload.len() != len as usize {
        return Err(CanvasError::Protocol(format!(
            "Length prefix {} does not match payload size {}",
            len,
            payload.len()
        )));
    }

    JsonCodec::decode(payload)
}

/// Read one frame from the stream.
///
/// Blocks (asynchronously) until the full payload is available. End of
/// stream before the declared length is an I/O error.
pub async fn read_frame<R>(reader: &mut R, max_frame_size: u32) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    reader.read_exact(&mut prefix).await?;
    let len = u32::from_le_bytes(prefix);
    validate_length(len, max_frame_size)?;

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;

    tracing::trace!(len, "Frame read");
    Ok(Frame::new(Bytes::from(payload)))
}

/// Read one frame and deserialize its payload.
pub async fn read_value<R, T>(reader: &mut R, max_frame_size: u32) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    read_frame(reader, max_frame_size).await?.decode()
}

/// Serialize a value and write it as one frame, then flush.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let bytes = encode_frame(value)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    tracing::trace!(len = bytes.len() - LENGTH_PREFIX_SIZE, "Frame written");
    Ok(())
}
