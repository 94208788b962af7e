//! WebSocket listener and per-connection loop.
//!
//! `WsListener` accepts TCP connections and runs each one on its own thread:
//!
//! 1. Perform the WebSocket handshake, accepting only the `/ws` path and, when the
//!    browser sends an `Origin`, only the configured frontend origin.
//! 2. Register with the [`Broadcaster`], which queues the initial snapshot.
//! 3. Loop: read one inbound frame (bounded by a short read timeout), drain the
//!    outbound queue into the socket, and service the heartbeat.
//! 4. On close, error or heartbeat expiry, unregister from the broadcaster.
//!
//! Malformed client frames are logged and ignored; they never end the connection.

use crate::broadcast::{Broadcaster, ConnectionId, Outbound};
use crate::model::heartbeat::{Heartbeat, HeartbeatAction};
use crossbeam_channel::{Receiver, TryRecvError, unbounded};
use log::{debug, error, info, warn};
use market_common::net::WS_PATH;
use market_common::wire::ClientMessage;
use market_common::{MarketError, Result};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::{Message, WebSocket};

/// How long the accept loop sleeps when no connection is pending.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Per-connection tunables.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Origin accepted from browsers; `None` accepts any origin.
    pub allowed_origin: Option<String>,
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
    /// Read timeout between two outbound drains.
    pub poll_interval: Duration,
    /// Upper bound for the opening handshake.
    pub handshake_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            allowed_origin: None,
            heartbeat_interval: Duration::from_secs(25),
            heartbeat_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(50),
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

/// TCP listener that upgrades connections to the market feed.
pub struct WsListener {
    socket: TcpListener,
    broadcaster: Arc<Broadcaster>,
    settings: Arc<SessionSettings>,
}

impl WsListener {
    /// Bind a new listener to `bind_addr` (e.g., `0.0.0.0:3001`).
    pub fn bind(
        bind_addr: &str,
        broadcaster: Arc<Broadcaster>,
        settings: SessionSettings,
    ) -> Result<Self> {
        let socket = TcpListener::bind(bind_addr)?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            broadcaster,
            settings: Arc::new(settings),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Accept connections until `shutdown` is set, one thread per connection.
    pub fn accept_loop(&self, shutdown: &AtomicBool) -> Result<()> {
        info!("WebSocket feed listening on ws://{}{}", self.local_addr()?, WS_PATH);

        while !shutdown.load(Ordering::Relaxed) {
            match self.socket.accept() {
                Ok((stream, peer)) => {
                    debug!("Accepted TCP connection from {}", peer);
                    let broadcaster = Arc::clone(&self.broadcaster);
                    let settings = Arc::clone(&self.settings);
                    let spawned = thread::Builder::new()
                        .name(format!("ws-{}", peer))
                        .spawn(move || {
                            match handle_connection(stream, peer, &broadcaster, &settings) {
                                Ok(()) => {}
                                Err(e) if e.is_disconnect() => {
                                    debug!("Connection from {} dropped: {}", peer, e)
                                }
                                Err(e) => warn!("Connection from {} failed: {}", peer, e),
                            }
                        });
                    if let Err(e) = spawned {
                        error!("Failed to spawn connection thread for {}: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) => error!("TCP accept error: {}", e),
            }
        }
        info!("Accept loop stopped");
        Ok(())
    }
}

/// Handshake callback: enforce the path and origin.
fn check_request(
    request: &Request,
    response: Response,
    allowed_origin: Option<&str>,
) -> std::result::Result<Response, ErrorResponse> {
    if request.uri().path() != WS_PATH {
        return Err(reject(StatusCode::NOT_FOUND, "Not Found"));
    }
    if let (Some(allowed), Some(origin)) = (allowed_origin, request.headers().get("origin")) {
        let origin = origin.to_str().unwrap_or_default().trim_end_matches('/');
        if origin != allowed {
            return Err(reject(StatusCode::FORBIDDEN, "Origin not allowed"));
        }
    }
    Ok(response)
}

fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}

fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broadcaster: &Broadcaster,
    settings: &SessionSettings,
) -> Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(settings.handshake_timeout))?;

    let allowed_origin = settings.allowed_origin.as_deref();
    let mut ws = tungstenite::accept_hdr(stream, |request: &Request, response: Response| {
        check_request(request, response, allowed_origin)
    })
    .map_err(|e| MarketError::Handshake(e.to_string()))?;
    ws.get_ref().set_read_timeout(Some(settings.poll_interval))?;

    let (tx, rx) = unbounded::<Outbound>();
    let id = broadcaster.on_connect(tx)?;
    info!(
        "Client {} connected from {} ({} connected)",
        id,
        peer,
        broadcaster.connection_count()?
    );

    let result = run_session(&mut ws, id, &rx, broadcaster, settings);

    broadcaster.on_disconnect(id)?;
    let _ = ws.close(None);
    let _ = ws.flush();
    result
}

fn run_session(
    ws: &mut WebSocket<TcpStream>,
    id: ConnectionId,
    rx: &Receiver<Outbound>,
    broadcaster: &Broadcaster,
    settings: &SessionSettings,
) -> Result<()> {
    let mut heartbeat = Heartbeat::new(
        settings.heartbeat_interval,
        settings.heartbeat_timeout,
        Instant::now(),
    );

    loop {
        match ws.read() {
            Ok(Message::Text(text)) => {
                heartbeat.record_activity(Instant::now());
                handle_client_message(&text, id, broadcaster)?;
            }
            Ok(Message::Close(_)) => {
                debug!("Client {} sent close", id);
                return Ok(());
            }
            Ok(_) => heartbeat.record_activity(Instant::now()),
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(tungstenite::Error::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        loop {
            match rx.try_recv() {
                Ok(msg) => ws.write(Message::Text(msg.to_json()?))?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("Client {} was pruned by the broadcaster", id);
                    return Ok(());
                }
            }
        }

        match heartbeat.poll(Instant::now()) {
            HeartbeatAction::Idle => {}
            HeartbeatAction::SendPing => ws.write(Message::Ping(Vec::new()))?,
            HeartbeatAction::Expired => {
                warn!("Client {} timed out: no frames within {:?}", id, settings.heartbeat_timeout);
                return Ok(());
            }
        }
        ws.flush()?;
    }
}

fn handle_client_message(text: &str, id: ConnectionId, broadcaster: &Broadcaster) -> Result<()> {
    match ClientMessage::parse(text) {
        Ok(ClientMessage::Subscribe { symbols }) => {
            broadcaster.subscribe(id, &symbols)?;
        }
        Ok(ClientMessage::Unsubscribe { symbols }) => {
            broadcaster.unsubscribe(id, &symbols)?;
        }
        Err(e) => {
            warn!("Ignoring malformed message from client {}: {}", id, e);
            return Ok(());
        }
    }
    if let Some((state, topics)) = broadcaster.session(id)? {
        debug!("Client {} is {:?} with topics {:?}", id, state, topics);
    }
    Ok(())
}
