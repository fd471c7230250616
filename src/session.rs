//! Session state machine over the host stream.
//!
//! The host leads every exchange. Before each message it sends one status
//! byte, and the client answers according to the byte and its current
//! phase:
//!
//! ```text
//! AwaitingHost       --0 HOST_READY-->     send WindowOptions  --> AwaitingWindowAck
//! AwaitingWindowAck  --1 CANVAS_READY-->   send CanvasOptions  --> Ready
//! Ready              --2 FLUSH-->          send task batch, clear queue
//! Ready              --3 DELIVER_EVENTS--> read event batch, yield each event
//! Ready              --4 IDLE-->           send []
//! any                --other-->            Failed (stream closed)
//! ```
//!
//! Every completed Ready cycle yields one synthetic `draw` event after the
//! cycle's own events. A flush that carries `quit` is still delivered, then
//! the client closes the stream and the session is Closed.
//!
//! Exactly one request is in flight at a time; the session never reads
//! ahead of the byte it is answering.

use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{CanvasError, Result};
use crate::event::{Event, EventDemux};
use crate::options::{CanvasOptions, WindowOptions};
use crate::protocol::{read_frame, status, write_frame, DEFAULT_MAX_FRAME_SIZE};
use crate::queue::CommandQueue;
use crate::task::Task;

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the host to come up.
    AwaitingHost,
    /// Window options sent, waiting for the window to exist.
    AwaitingWindowAck,
    /// Handshake done, steady-state turns.
    Ready,
    /// Shut down after `quit` or after the host hung up.
    Closed,
    /// A protocol violation or I/O failure ended the session.
    Failed,
}

impl Phase {
    /// No further turns are taken in Closed or Failed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Closed | Phase::Failed)
    }
}

/// One client session over a host stream.
pub struct Session<S> {
    stream: S,
    phase: Phase,
    window: WindowOptions,
    canvas: CanvasOptions,
    max_frame_size: u32,
    pending: VecDeque<Event>,
    closing: bool,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a session that will configure the host with these options.
    pub fn new(stream: S, window: WindowOptions, canvas: CanvasOptions) -> Self {
        Self {
            stream,
            phase: Phase::AwaitingHost,
            window,
            canvas,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            pending: VecDeque::new(),
            closing: false,
        }
    }

    /// Set the maximum event batch size accepted from the host.
    pub fn with_max_frame_size(mut self, max_frame_size: u32) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Close after the next flush has been delivered.
    pub fn mark_closing(&mut self) {
        self.closing = true;
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Next event, taking as many host turns as needed.
    ///
    /// Returns `Ok(None)` once the session is Closed. A Failed session
    /// returns `CanvasError::SessionClosed`.
    pub async fn next_event(&mut self, queue: &mut CommandQueue) -> Result<Option<Event>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            match self.phase {
                Phase::Closed => return Ok(None),
                Phase::Failed => return Err(CanvasError::SessionClosed),
                _ => {}
            }

            if let Err(e) = self.turn(queue).await {
                self.terminate(&e).await;
                return Err(e);
            }
        }
    }

    /// Answer one status byte.
    async fn turn(&mut self, queue: &mut CommandQueue) -> Result<()> {
        let byte = self.read_status().await?;
        tracing::trace!(
            "Status {} ({}) in phase {:?}",
            byte,
            status::name(byte),
            self.phase
        );

        match (self.phase, byte) {
            (Phase::AwaitingHost, status::HOST_READY) => {
                write_frame(&mut self.stream, &self.window).await?;
                self.transition(Phase::AwaitingWindowAck);
            }
            (Phase::AwaitingWindowAck, status::CANVAS_READY) => {
                write_frame(&mut self.stream, &self.canvas).await?;
                self.transition(Phase::Ready);
            }
            (Phase::Ready, status::FLUSH) => {
                let quitting = self.closing || queue.contains("quit");
                write_frame(&mut self.stream, &queue.pending()).await?;
                let batch = queue.flush();
                tracing::debug!("Flushed {} tasks", batch.len());

                if quitting {
                    // The host may already have closed its end.
                    if let Err(e) = self.stream.shutdown().await {
                        tracing::debug!("Shutdown after quit: {}", e);
                    }
                    self.transition(Phase::Closed);
                    return Ok(());
                }
                self.pending.push_back(Event::draw());
            }
            (Phase::Ready, status::DELIVER_EVENTS) => {
                let frame = read_frame(&mut self.stream, self.max_frame_size).await?;
                let events = EventDemux::decode_batch(frame.payload())?;
                tracing::debug!("Received {} events", events.len());
                self.pending.extend(events);
                self.pending.push_back(Event::draw());
            }
            (Phase::Ready, status::IDLE) => {
                write_frame(&mut self.stream, &[] as &[Task]).await?;
                self.pending.push_back(Event::draw());
            }
            (phase, byte) => {
                tracing::error!(
                    "Invalid status {} ({}) in phase {:?}",
                    byte,
                    status::name(byte),
                    phase
                );
                return Err(CanvasError::Session {
                    phase,
                    status: byte,
                });
            }
        }
        Ok(())
    }

    async fn read_status(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        match self.stream.read_exact(&mut byte).await {
            Ok(_) => Ok(byte[0]),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(CanvasError::ConnectionClosed)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn transition(&mut self, next: Phase) {
        tracing::debug!("Session {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// End the session after `error`. A host hang-up closes it; anything
    /// else fails it.
    async fn terminate(&mut self, error: &CanvasError) {
        match error {
            CanvasError::ConnectionClosed => {
                tracing::warn!("Host disconnected in phase {:?}", self.phase);
                self.transition(Phase::Closed);
            }
            _ => self.transition(Phase::Failed),
        }
        let _ = self.stream.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::read_value;
    use serde_json::{json, Value};
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{DuplexStream, ReadBuf};

    fn session(stream: DuplexStream) -> Session<DuplexStream> {
        Session::new(
            stream,
            WindowOptions::new("test", 320, 240),
            CanvasOptions::default(),
        )
    }

    async fn host_read(host: &mut DuplexStream) -> Value {
        read_value(host, DEFAULT_MAX_FRAME_SIZE).await.unwrap()
    }

    /// Scripted host input whose `fail_at`-th write breaks the pipe.
    struct BrokenWriter {
        input: Cursor<Vec<u8>>,
        writes: usize,
        fail_at: usize,
    }

    impl AsyncRead for BrokenWriter {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.input).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            self.writes += 1;
            if self.writes == self.fail_at {
                return Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()));
            }
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_handshake_sends_options_in_order() {
        let (client, mut host) = tokio::io::duplex(4096);
        let mut session = session(client);
        let mut queue = CommandQueue::new();

        host.write_all(&[status::HOST_READY, status::CANVAS_READY, status::IDLE])
            .await
            .unwrap();

        let event = session.next_event(&mut queue).await.unwrap().unwrap();
        assert!(event.is_draw());
        assert_eq!(session.phase(), Phase::Ready);

        let window = host_read(&mut host).await;
        assert_eq!(window["title"], json!("test"));
        assert_eq!(window["width"], json!(320));
        assert_eq!(host_read(&mut host).await, json!({"software": false}));
        assert_eq!(host_read(&mut host).await, json!([]));
    }

    #[tokio::test]
    async fn test_out_of_phase_status_fails() {
        let (client, mut host) = tokio::io::duplex(4096);
        let mut session = session(client);
        let mut queue = CommandQueue::new();

        host.write_all(&[status::FLUSH]).await.unwrap();
        let err = session.next_event(&mut queue).await.unwrap_err();
        assert!(matches!(
            err,
            CanvasError::Session {
                phase: Phase::AwaitingHost,
                status: 2
            }
        ));
        assert_eq!(session.phase(), Phase::Failed);

        // Failed is absorbing.
        assert!(matches!(
            session.next_event(&mut queue).await,
            Err(CanvasError::SessionClosed)
        ));

        let mut rest = Vec::new();
        host.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_flush_clears_queue_and_yields_draw() {
        let (client, mut host) = tokio::io::duplex(4096);
        let mut session = session(client);
        let mut queue = CommandQueue::new();

        queue.push(Task::bare("clear"));
        queue.push(Task::bare("present"));
        host.write_all(&[0, 1, status::FLUSH]).await.unwrap();

        let event = session.next_event(&mut queue).await.unwrap().unwrap();
        assert!(event.is_draw());
        assert!(queue.is_empty());

        host_read(&mut host).await;
        host_read(&mut host).await;
        assert_eq!(host_read(&mut host).await, json!(["clear", "present"]));
    }

    #[tokio::test]
    async fn test_deliver_events_then_draw() {
        let (client, mut host) = tokio::io::duplex(4096);
        let mut session = session(client);
        let mut queue = CommandQueue::new();

        host.write_all(&[0, 1, status::DELIVER_EVENTS]).await.unwrap();
        let batch = crate::protocol::encode_frame(&json!([
            {"mouse_button_down": {"x": 5, "y": 6, "clicks": 1, "which": 0, "button": 1}},
            "app_low_memory"
        ]))
        .unwrap();
        host.write_all(&batch).await.unwrap();

        let mut kinds = Vec::new();
        for _ in 0..3 {
            kinds.push(session.next_event(&mut queue).await.unwrap().unwrap().kind);
        }
        assert_eq!(kinds, ["mouse_button_down", "app_low_memory", "draw"]);
    }

    #[tokio::test]
    async fn test_quit_flush_closes_stream() {
        let (client, mut host) = tokio::io::duplex(4096);
        let mut session = session(client);
        let mut queue = CommandQueue::new();

        host.write_all(&[0, 1, status::FLUSH]).await.unwrap();
        queue.push(Task::bare("quit"));
        session.mark_closing();

        assert!(session.next_event(&mut queue).await.unwrap().is_none());
        assert_eq!(session.phase(), Phase::Closed);
        assert!(session.next_event(&mut queue).await.unwrap().is_none());

        host_read(&mut host).await;
        host_read(&mut host).await;
        assert_eq!(host_read(&mut host).await, json!(["quit"]));

        // The client closed its side after the batch.
        let mut rest = Vec::new();
        host.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_host_hangup_closes_session() {
        let (client, host) = tokio::io::duplex(4096);
        let mut session = session(client);
        let mut queue = CommandQueue::new();
        drop(host);

        assert!(matches!(
            session.next_event(&mut queue).await,
            Err(CanvasError::ConnectionClosed)
        ));
        assert_eq!(session.phase(), Phase::Closed);
        assert!(session.next_event(&mut queue).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_event_batch_fails() {
        let (client, mut host) = tokio::io::duplex(4096);
        let mut session = session(client).with_max_frame_size(8);
        let mut queue = CommandQueue::new();

        host.write_all(&[0, 1, status::DELIVER_EVENTS]).await.unwrap();
        host.write_all(&100u32.to_le_bytes()).await.unwrap();

        assert!(matches!(
            session.next_event(&mut queue).await,
            Err(CanvasError::Protocol(_))
        ));
        assert_eq!(session.phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_queue() {
        let stream = BrokenWriter {
            input: Cursor::new(vec![0, 1, status::FLUSH]),
            writes: 0,
            fail_at: 3,
        };
        let mut session = Session::new(
            stream,
            WindowOptions::new("test", 320, 240),
            CanvasOptions::default(),
        );
        let mut queue = CommandQueue::new();
        queue.push(Task::bare("clear"));

        let result = session.next_event(&mut queue).await;
        match result {
            Err(CanvasError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("expected I/O error, got {:?}", other),
        }
        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_idle_leaves_queue_for_next_flush() {
        let (client, mut host) = tokio::io::duplex(4096);
        let mut session = session(client);
        let mut queue = CommandQueue::new();
        queue.push(Task::bare("clear"));

        host.write_all(&[0, 1, status::IDLE]).await.unwrap();
        assert!(session.next_event(&mut queue).await.unwrap().unwrap().is_draw());
        assert_eq!(queue.len(), 1);

        host_read(&mut host).await;
        host_read(&mut host).await;
        assert_eq!(host_read(&mut host).await, json!([]));

        host.write_all(&[status::FLUSH]).await.unwrap();
        assert!(session.next_event(&mut queue).await.unwrap().unwrap().is_draw());
        assert!(queue.is_empty());
        assert_eq!(host_read(&mut host).await, json!(["clear"]));
    }
}
