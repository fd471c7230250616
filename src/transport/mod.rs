//! Transport module - how the host process connects.
//!
//! The host connects to the client over TCP. Any other
//! `AsyncRead + AsyncWrite` stream can be handed to
//! [`CanvasBuilder::build`](crate::CanvasBuilder::build) directly.

mod tcp;

pub use tcp::HostListener;
