//! Chat server: accept loop and handshake policy.
//!
//! The server owns the [`ConnectionRegistry`] and the [`PairingEngine`] and
//! wires each accepted WebSocket into the engine's event handlers.
//!
//! # Connection Flow
//!
//! 1. TCP accept
//! 2. WebSocket upgrade; the handshake checks path and origin and assigns a
//!    [`ConnectionId`] (resumed from `?session=` when possible)
//! 3. Register the connection, call `on_connect`, then start its event loop
//! 4. Inbound text frames go to `on_message`
//! 5. When the event loop ends: `on_disconnect`, then deregister

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::result::Result as StdResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::ORIGIN;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

use crate::engine::{EngineStats, PairingEngine};
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::transport::{CloseReason, Connection, ConnectionRegistry, MessageHandler};

use super::builder::ServerBuilder;
use super::options::ServerOptions;

// ============================================================================
// Constants
// ============================================================================

/// Response header carrying the assigned connection id.
pub const SESSION_HEADER: &str = "x-pairchat-session";

/// Query parameter a client uses to present a previous connection id.
pub const SESSION_PARAM: &str = "session";

/// How often the accept loop wakes to check the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How often expired reconnect records are purged.
const PURGE_INTERVAL: Duration = Duration::from_secs(1);

/// Close reason sent to every client on shutdown.
const SHUTDOWN_REASON: &str = "server shutting down";

// ============================================================================
// ChatServer
// ============================================================================

/// WebSocket endpoint hosting the pairing engine.
///
/// # Example
///
/// ```no_run
/// use pairchat::{ChatServer, ServerOptions};
///
/// # async fn example() -> pairchat::Result<()> {
/// let server = ChatServer::bind(ServerOptions::default()).await?;
/// println!("Listening on {}", server.ws_url());
///
/// // ...
///
/// server.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct ChatServer {
    /// Actual bound address.
    local_addr: SocketAddr,

    /// Validated options.
    options: ServerOptions,

    /// Live connections; the engine's transport.
    registry: Arc<ConnectionRegistry>,

    /// Pairing engine.
    engine: Arc<PairingEngine<ConnectionRegistry>>,

    /// Shutdown flag.
    shutdown: AtomicBool,
}

impl fmt::Debug for ChatServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatServer")
            .field("local_addr", &self.local_addr)
            .field("path", &self.options.path)
            .field("connections", &self.connection_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ChatServer - Constructor
// ============================================================================

impl ChatServer {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds the server and starts the accept loop.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid
    /// - [`Error::Io`] if binding fails
    pub async fn bind(options: ServerOptions) -> Result<Arc<Self>> {
        let options = options.validated()?;
        let listener = TcpListener::bind(options.socket_addr()).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "Chat server bound");

        let registry = Arc::new(ConnectionRegistry::new());
        let engine = Arc::new(PairingEngine::new(
            Arc::clone(&registry),
            options.engine.clone(),
        ));

        let server = Arc::new(Self {
            local_addr,
            options,
            registry,
            engine,
            shutdown: AtomicBool::new(false),
        });

        // Spawn accept loop
        let server_clone = Arc::clone(&server);
        tokio::spawn(async move {
            server_clone.accept_loop(listener).await;
        });

        info!(url = %server.ws_url(), "Chat server started");

        Ok(server)
    }
}

// ============================================================================
// ChatServer - Public API
// ============================================================================

impl ChatServer {
    /// Returns the WebSocket URL clients connect to.
    ///
    /// Format: `ws://{ip}:{port}{path}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}{}", self.local_addr, self.options.path)
    }

    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the validated options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Returns the number of live connections.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the pairing engine's structure sizes.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    /// Returns the pairing engine.
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &PairingEngine<ConnectionRegistry> {
        &self.engine
    }

    /// Stops accepting and closes every connection.
    ///
    /// Disconnect handling for each closed connection still runs on its
    /// own task.
    pub async fn shutdown(&self) {
        info!("Chat server shutting down");

        // Signal accept loop to stop
        self.shutdown.store(true, Ordering::SeqCst);

        let closed = self.registry.close_all(SHUTDOWN_REASON);

        info!(closed, "Chat server shutdown complete");
    }
}

// ============================================================================
// ChatServer - Accept Loop
// ============================================================================

impl ChatServer {
    /// Background task that accepts new connections.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        let mut last_purge = Instant::now();

        loop {
            // Check shutdown flag
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("Accept loop shutting down");
                break;
            }

            if last_purge.elapsed() >= PURGE_INTERVAL {
                let purged = self.engine.purge_expired();
                if purged > 0 {
                    debug!(purged, "Expired reconnect records purged");
                }
                last_purge = Instant::now();
            }

            // Accept with timeout to allow checking shutdown flag
            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, addr).await {
                            warn!(error = %e, ?addr, "Connection handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }
                Err(_) => {
                    // Timeout - just continue to check shutdown flag
                    continue;
                }
            }
        }

        debug!("Accept loop terminated");
    }

    /// Runs one client from upgrade to disconnect.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        debug!(?addr, "New TCP connection");

        let mut assigned = None;
        let ws_stream = tokio_tungstenite::accept_hdr_async(
            stream,
            |request: &Request, response: Response| {
                self.handshake(request, response, &mut assigned)
            },
        )
        .await?;

        let id = assigned.ok_or_else(|| Error::handshake("no connection id assigned"))?;

        let engine = Arc::clone(&self.engine);
        let handler: MessageHandler = Box::new(move |id: ConnectionId, text: &str| {
            engine.on_message(id, text);
        });
        let (connection, event_loop) = Connection::new(id, ws_stream, handler);

        if let Err(e) = self.registry.register(connection.clone()) {
            connection.close("session already active");
            event_loop.spawn();
            return Err(e);
        }

        info!(connection_id = %id, ?addr, "WebSocket connection established");

        // Inbound frames are only read once the engine knows the connection
        self.engine.on_connect(id);
        let closed = event_loop.spawn();

        let reason = closed.await.unwrap_or(CloseReason::Ended);

        info!(connection_id = %id, %reason, "WebSocket connection closed");

        // The id stays registered until the engine has released it, so it
        // cannot be resumed while the old pair is still being torn down
        self.engine.on_disconnect(id, &reason);
        self.registry.remove(id);

        Ok(())
    }

    /// Upgrade callback: path, origin and id assignment.
    fn handshake(
        &self,
        request: &Request,
        mut response: Response,
        assigned: &mut Option<ConnectionId>,
    ) -> StdResult<Response, ErrorResponse> {
        let path = request.uri().path();
        if path != self.options.path {
            debug!(path, "Rejected handshake for unknown path");
            return Err(reject(StatusCode::NOT_FOUND, "Not Found"));
        }

        let origin = request
            .headers()
            .get(ORIGIN)
            .map(|value| value.to_str().unwrap_or_default());
        if let Err(e) = self.options.origins.check(origin) {
            warn!(error = %e, "Rejected handshake");
            return Err(reject(StatusCode::FORBIDDEN, "Forbidden"));
        }

        let id = self.assign_id(request.uri().query());
        if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
        *assigned = Some(id);

        Ok(response)
    }

    /// Reuses a presented id if it is valid and not live, else a fresh one.
    fn assign_id(&self, query: Option<&str>) -> ConnectionId {
        let requested = query.and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == SESSION_PARAM)
                .map(|(_, value)| value.parse::<ConnectionId>())
        });

        match requested {
            Some(Ok(id)) if !self.registry.contains(id) && !self.engine.is_tracked(id) => {
                debug!(connection_id = %id, "Resuming presented session id");
                id
            }
            Some(Ok(id)) => {
                warn!(connection_id = %id, "Presented session id is live; assigning a new one");
                ConnectionId::new()
            }
            Some(Err(e)) => {
                debug!(error = %e, "Ignoring presented session id");
                ConnectionId::new()
            }
            None => ConnectionId::new(),
        }
    }
}

/// Builds a handshake rejection.
fn reject(status: StatusCode, message: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(message.to_owned()));
    *response.status_mut() = status;
    response
}

// ============================================================================
// Tests
// ============================================================================
