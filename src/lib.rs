//! # canvaswire-client
//!
//! Rust client for driving a process-separate canvas/window host.
//!
//! The client never shares memory with the host. It queues drawing and
//! window commands, sends them in batches when the host asks for them, and
//! receives input events back.
//!
//! ## Architecture
//!
//! - **Frames**: 4-byte LE length prefix + UTF-8 JSON payload
//! - **Session**: status-byte driven handshake, then flush / deliver / idle turns
//! - **Commands and events**: bare tag or `{ tag: params }`, batched as JSON arrays
//! - **Native transport**: the same events decoded from fixed-size binary
//!   buffers through schema-driven layouts, for running the library in-process
//!
//! ## Example
//!
//! ```ignore
//! use canvaswire_client::CanvasBuilder;
//!
//! #[tokio::main]
//! async fn main() -> canvaswire_client::Result<()> {
//!     let mut canvas = CanvasBuilder::new("Hello", 640, 480)
//!         .centered(true)
//!         .listen()
//!         .await?;
//!
//!     while let Some(event) = canvas.next_event().await? {
//!         if event.is_draw() {
//!             canvas.clear();
//!             canvas.present();
//!         } else if event.is_quit() {
//!             canvas.quit();
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod event;
pub mod layout;
pub mod native;
pub mod options;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod session;
pub mod task;
pub mod transport;

mod canvas;

pub use canvas::{Canvas, CanvasBuilder, DEFAULT_LISTEN_ADDR};
pub use error::{CanvasError, Result};
pub use event::Event;
pub use options::{CanvasOptions, WindowFlags, WindowOptions};
pub use registry::ResourceHandle;
pub use task::Task;
