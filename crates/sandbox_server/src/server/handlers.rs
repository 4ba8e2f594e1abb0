//! Per-connection handling.
//!
//! Each accepted socket gets one task running [`handle_connection`]: it
//! upgrades the socket to a WebSocket, spawns the connection's single writer
//! task and then reads one wire line per frame until the peer leaves, the
//! transport fails, the hub evicts the connection or the server shuts down. Whatever the exit path,
//! [`GatewaySession`] undoes the connection's registrations when the task
//! lets go of it.

use super::{BridgeState, CommandDispatcher, HandshakeSequencer};
use crate::connection::{ConnectionId, OutboundQueue};
use crate::error::ServerError;
use crate::protocol::{self, WireLine};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, info, warn};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// How long a closing connection may take to flush its queued lines.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Serves one client from WebSocket upgrade to disconnect.
///
/// Only a failed upgrade or an unsupported frame is returned as an error.
/// Everything that goes wrong with a single line is logged and skipped.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<BridgeState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| ServerError::Network(format!("WebSocket handshake with {addr} failed: {e}")))?;

    let connection_id = state.next_connection_id();
    info!("🔗 Connection {} established from {}", connection_id, addr);

    let (ws_sink, mut ws_receiver) = ws_stream.split();
    let (queue, lines) = mpsc::channel(state.outbound_queue_capacity);
    let mut writer = tokio::spawn(write_lines(connection_id, ws_sink, lines));

    let evicted = state.hub.eviction_signal(connection_id);
    let guard = GatewaySession {
        state: state.clone(),
        connection_id,
        addr,
    };

    let result = loop {
        let message = tokio::select! {
            _ = shutdown.recv() => {
                debug!("Connection {} stopping for shutdown", connection_id);
                break Ok(());
            }
            _ = evicted.notified() => {
                warn!("Connection {} fell behind on its outbound queue, closing", connection_id);
                break Ok(());
            }
            message = ws_receiver.next() => message,
        };

        match message {
            Some(Ok(Message::Text(text))) => handle_line(&state, connection_id, &queue, text.as_str()).await,
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(line) => handle_line(&state, connection_id, &queue, line).await,
                Err(_) => warn!("Connection {} sent a line that is not UTF-8", connection_id),
            },
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) => {
                info!("Connection {} requested close", connection_id);
                break Ok(());
            }
            // tungstenite only yields raw frames when writing, so a read
            // never lands here today.
            Some(Ok(Message::Frame(frame))) => {
                break Err(ServerError::UnsupportedFrame(format!("{:?}", frame.header().opcode)));
            }
            Some(Err(e)) => {
                warn!("WebSocket error for connection {}: {}", connection_id, e);
                break Ok(());
            }
            None => break Ok(()),
        }
    };

    // Cleanup first, so the writer sees every sender gone and finishes.
    drop(guard);
    drop(queue);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        warn!("Connection {} did not drain its queue in time", connection_id);
        writer.abort();
    }

    result
}

/// Decodes one inbound line and acts on it.
async fn handle_line(
    state: &Arc<BridgeState>,
    connection_id: ConnectionId,
    queue: &OutboundQueue,
    raw: &str,
) {
    debug!("⬅️ {}: {}", connection_id, raw.trim_end());

    if protocol::is_version_announce(raw) {
        if state.registry.session(connection_id).is_some() {
            warn!("Connection {} announced its version twice, ignoring", connection_id);
            return;
        }
        if let Err(e) = run_handshake(state.clone(), connection_id, queue.clone()).await {
            warn!("Handshake for connection {} stopped early: {}", connection_id, e);
        }
        return;
    }

    let line = match protocol::decode(raw) {
        Ok(line) => line,
        Err(e) => {
            warn!("Rejected line from connection {}: {}", connection_id, e);
            return;
        }
    };

    if let Err(e) = CommandDispatcher::new(state).dispatch(connection_id, line) {
        warn!("Command from connection {} failed: {}", connection_id, e);
    }
}

/// Runs the join sequence on the blocking pool. The snapshot reads every
/// cell of the viewport from the world, which must not hold up the other
/// connections sharing this worker.
async fn run_handshake(
    state: Arc<BridgeState>,
    connection_id: ConnectionId,
    queue: OutboundQueue,
) -> Result<String, ServerError> {
    tokio::task::spawn_blocking(move || HandshakeSequencer::new(&state, connection_id).run(queue))
        .await
        .map_err(|e| ServerError::Internal(format!("handshake task failed: {e}")))?
}

/// The connection's only writer. Lines leave in queue order, each as one
/// binary frame.
async fn write_lines(connection_id: ConnectionId, mut sink: WsSink, mut lines: mpsc::Receiver<Arc<str>>) {
    while let Some(line) = lines.recv().await {
        if let Err(e) = sink.send(Message::binary(line.as_bytes().to_vec())).await {
            debug!("Write to connection {} failed: {}", connection_id, e);
            return;
        }
    }
    let _ = sink.close().await;
}

/// Registrations of one live connection, released on drop.
///
/// Dropping detaches the connection from broadcasts and, if it had joined,
/// unregisters its session and tells everyone else it left.
pub struct GatewaySession {
    state: Arc<BridgeState>,
    connection_id: ConnectionId,
    addr: SocketAddr,
}

impl Drop for GatewaySession {
    fn drop(&mut self) {
        self.state.hub.detach(self.connection_id);
        if let Some(session) = self.state.registry.unregister(self.connection_id) {
            info!(
                "👋 {} left after {:?}",
                session.display_name,
                session.joined_at.elapsed()
            );
            self.state
                .hub
                .broadcast_all(&WireLine::text(format!("{} has left.", session.display_name)));
        }
        info!("Connection {} from {} closed", self.connection_id, self.addr);
    }
}

/// One unit of the server's connection budget, returned on drop.
#[derive(Debug)]
pub struct ConnectionSlot {
    active: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    /// Takes a slot unless `max` connections are already active.
    pub fn acquire(active: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < max).then_some(current + 1)
            })
            .ok()
            .map(|_| Self {
                active: active.clone(),
            })
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}
