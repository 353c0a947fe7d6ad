//! Per-client WebSocket connection and event loop.
//!
//! Each accepted client gets a [`Connection`] that spawns one tokio task.
//! The task handles:
//!
//! - Incoming text frames, handed to the [`MessageHandler`]
//! - Outgoing text frames queued by [`Connection::send`]
//! - Close requests queued by [`Connection::close`]
//!
//! The loop does not run until [`EventLoop::spawn`] is called, so the owner
//! can finish registering the connection before any inbound frame is handled.
//! Commands queued in the meantime are buffered. When the loop ends it reports
//! a [`CloseReason`] on the receiver returned from [`EventLoop::spawn`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;

use super::CloseReason;

// ============================================================================
// Types
// ============================================================================

/// Callback for each inbound text frame.
pub type MessageHandler = Box<dyn Fn(ConnectionId, &str) + Send + Sync>;

/// Write half of the WebSocket stream.
type WsSink = futures_util::stream::SplitSink<WebSocketStream<TcpStream>, Message>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a text frame.
    Send(String),
    /// Send a close frame and stop.
    Close(String),
}

// ============================================================================
// EventLoop
// ============================================================================

/// A connection's I/O task, created but not yet running.
pub(crate) struct EventLoop {
    id: ConnectionId,
    ws_stream: WebSocketStream<TcpStream>,
    command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    handler: MessageHandler,
    open: Arc<AtomicBool>,
}

impl EventLoop {
    /// Starts the task. The receiver resolves with the reason it ended.
    pub(crate) fn spawn(self) -> oneshot::Receiver<CloseReason> {
        let (closed_tx, closed_rx) = oneshot::channel();

        tokio::spawn(Connection::run_event_loop(
            self.id,
            self.ws_stream,
            self.command_rx,
            self.handler,
            self.open,
            closed_tx,
        ));

        closed_rx
    }
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to one chat client.
///
/// Cheap to clone; clones share the same event loop.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync`. All operations are non-blocking.
#[derive(Clone)]
pub struct Connection {
    /// Connection identifier.
    id: ConnectionId,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Cleared once a close is requested or the loop exits.
    open: Arc<AtomicBool>,
}

impl Connection {
    /// Creates a connection from an upgraded WebSocket stream.
    ///
    /// The returned [`EventLoop`] must be spawned for any frame to move.
    pub(crate) fn new(
        id: ConnectionId,
        ws_stream: WebSocketStream<TcpStream>,
        handler: MessageHandler,
    ) -> (Self, EventLoop) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));

        let event_loop = EventLoop {
            id,
            ws_stream,
            command_rx,
            handler,
            open: Arc::clone(&open),
        };

        let connection = Self {
            id,
            command_tx,
            open,
        };

        (connection, event_loop)
    }

    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns `true` until a close is requested or the stream ends.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection is closing or
    /// its event loop has exited.
    pub fn send(&self, text: &str) -> Result<()> {
        if !self.is_open() {
            return Err(Error::connection_closed(self.id));
        }

        self.command_tx
            .send(ConnectionCommand::Send(text.to_owned()))
            .map_err(|_| Error::connection_closed(self.id))
    }

    /// Requests a close with the given reason.
    ///
    /// Frames queued before this call are still written first. Repeated
    /// calls are ignored.
    pub fn close(&self, reason: &str) {
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self
                .command_tx
                .send(ConnectionCommand::Close(reason.to_owned()));
        }
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        id: ConnectionId,
        ws_stream: WebSocketStream<TcpStream>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        handler: MessageHandler,
        open: Arc<AtomicBool>,
        closed_tx: oneshot::Sender<CloseReason>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        let reason = loop {
            tokio::select! {
                // Frames from the client
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(connection_id = %id, len = text.as_str().len(), "Text frame received");
                            handler(id, text.as_str());
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!(connection_id = %id, "WebSocket closed by client");
                            break CloseReason::Remote;
                        }

                        Some(Err(e)) => {
                            debug!(connection_id = %id, error = %e, "WebSocket error");
                            break CloseReason::Error(e.to_string());
                        }

                        None => {
                            debug!(connection_id = %id, "WebSocket stream ended");
                            break CloseReason::Ended;
                        }

                        Some(Ok(Message::Binary(_))) => {
                            debug!(connection_id = %id, "Ignoring binary frame");
                        }

                        // Ping/Pong are answered by tungstenite
                        _ => {}
                    }
                }

                // Commands from the engine
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(connection_id = %id, error = %e, "Failed to write frame");
                                break CloseReason::Error(e.to_string());
                            }
                        }

                        Some(ConnectionCommand::Close(reason)) => {
                            Self::send_close(id, &mut ws_write, &reason).await;
                            break CloseReason::Local(reason);
                        }

                        // Unreachable while a Connection handle is alive
                        None => break CloseReason::Ended,
                    }
                }
            }
        };

        open.store(false, Ordering::SeqCst);
        let _ = closed_tx.send(reason);

        debug!(connection_id = %id, "Event loop terminated");
    }

    /// Writes a normal close frame carrying `reason` and closes the sink.
    async fn send_close(id: ConnectionId, ws_write: &mut WsSink, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_owned().into(),
        };

        if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
            debug!(connection_id = %id, error = %e, "Close frame not delivered");
        }
        let _ = ws_write.close().await;
    }
}
