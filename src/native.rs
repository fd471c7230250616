//! In-process transport: driving a native library directly.
//!
//! Instead of talking to a host process, the client can own the native
//! library itself. [`NativeContext`] is the host handle: creating it
//! initializes the library, dropping it shuts the library down, and every
//! call goes through it. There is no global "initialized" flag.
//!
//! Commands are applied one at a time and a failure is reported at the call
//! that caused it; the context stays usable. Events are pulled with a
//! non-blocking poll. When nothing is pending the poll yields exactly one
//! synthetic `draw` event instead of waiting or polling again.
//!
//! # Example
//!
//! ```ignore
//! use canvaswire_client::native::NativeContext;
//! use canvaswire_client::task::Task;
//!
//! let mut ctx = NativeContext::new(MySdlBackend::default())?;
//! ctx.apply(&Task::bare("clear"))?;
//!
//! for event in ctx.events() {
//!     let event = event?;
//!     if event.is_quit() {
//!         break;
//!     }
//!     if event.is_draw() {
//!         ctx.apply(&Task::bare("present"))?;
//!     }
//! }
//! ```

use crate::error::{CanvasError, Result};
use crate::event::{Event, EventDemux};
use crate::layout::RawWindow;
use crate::queue::CommandQueue;
use crate::task::Task;

/// A native rendering library.
///
/// Errors are the library's own description of what failed.
///
/// # Safety
///
/// Buffers filled by [`poll_event`](NativeBackend::poll_event) are read with
/// pointer fields followed. Implementors guarantee every pointer-string
/// field they write is null or points to a NUL-terminated string that stays
/// valid until the next call on the backend.
pub unsafe trait NativeBackend {
    /// Bring the library up. Called once, before anything else.
    fn init(&mut self) -> std::result::Result<(), String>;

    /// Copy the next pending event into `buf` and return true, or return
    /// false at once if none is pending. Must not block.
    fn poll_event(&mut self, buf: &mut [u8]) -> bool;

    /// Carry out one command.
    fn apply(&mut self, task: &Task) -> std::result::Result<(), String>;

    /// Tear the library down. Called once.
    fn shutdown(&mut self);
}

/// Owning handle to an initialized native library.
pub struct NativeContext<B: NativeBackend> {
    backend: B,
    demux: EventDemux,
    buf: Vec<u8>,
    closed: bool,
}

impl<B: NativeBackend> NativeContext<B> {
    /// Initialize `backend` with the SDL event table.
    pub fn new(backend: B) -> Result<Self> {
        Self::with_demux(backend, EventDemux::default())
    }

    /// Initialize `backend`, decoding its events with `demux`.
    pub fn with_demux(mut backend: B, demux: EventDemux) -> Result<Self> {
        backend.init().map_err(|e| {
            tracing::error!(error = %e, "Native library failed to initialize");
            CanvasError::Host(e)
        })?;
        tracing::debug!(buffer_size = demux.buffer_size(), "Native context initialized");

        Ok(Self {
            buf: vec![0u8; demux.buffer_size()],
            backend,
            demux,
            closed: false,
        })
    }

    /// Apply one command.
    ///
    /// A failure is returned as `CanvasError::Host` and leaves the context
    /// open.
    pub fn apply(&mut self, task: &Task) -> Result<()> {
        self.ensure_open()?;
        self.backend.apply(task).map_err(|e| {
            tracing::warn!(task = %task.tag, error = %e, "Native command failed");
            CanvasError::Host(e)
        })
    }

    /// Apply every queued command in order.
    ///
    /// Stops at the first failure; the commands after it are discarded.
    pub fn apply_queue(&mut self, queue: &mut CommandQueue) -> Result<()> {
        for task in queue.flush() {
            self.apply(&task)?;
        }
        Ok(())
    }

    /// Poll once: the next pending event, or a `draw` event if none is
    /// pending.
    pub fn poll(&mut self) -> Result<Event> {
        self.ensure_open()?;
        self.buf.fill(0);
        if !self.backend.poll_event(&mut self.buf) {
            return Ok(Event::draw());
        }
        // SAFETY: `NativeBackend` implementors guarantee pointer fields in
        // polled buffers are null or valid until the next backend call, and
        // the window does not outlive this borrow.
        let window = unsafe { RawWindow::new(&self.buf) };
        self.demux.decode_native(&window)
    }

    /// Endless sequence of polls. Each item is one poll cycle.
    pub fn events(&mut self) -> NativeEvents<'_, B> {
        NativeEvents { ctx: self }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Shut the library down. Later calls fail with `SessionClosed`.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.backend.shutdown();
            tracing::debug!("Native context closed");
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(CanvasError::SessionClosed);
        }
        Ok(())
    }
}

impl<B: NativeBackend> Drop for NativeContext<B> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Iterator over poll cycles of a [`NativeContext`].
///
/// Ends once the context is closed.
pub struct NativeEvents<'a, B: NativeBackend> {
    ctx: &'a mut NativeContext<B>,
}

impl<B: NativeBackend> Iterator for NativeEvents<'_, B> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ctx.is_closed() {
            return None;
        }
        Some(self.ctx.poll())
    }
}
