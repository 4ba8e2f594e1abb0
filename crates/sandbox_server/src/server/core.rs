//! Core bridge server implementation.
//!
//! This module contains [`BridgeServer`]: it binds the listener, runs the
//! accept loop, hands every accepted socket to its own connection task and
//! exposes the notification entry points the hosting game calls.

use super::handlers::{handle_connection, ConnectionSlot};
use super::{BridgeState, CommandDispatcher};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::world::{BlockPos, BlockTypeId, BlockTypeTable, ChatSink, WorldProvider};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Backlog passed to `listen(2)`.
const LISTEN_BACKLOG: i32 = 1024;

/// The WebSocket bridge between web clients and one game world.
///
/// # Lifecycle
///
/// 1. [`BridgeServer::new`] wires the configuration to the world collaborators
/// 2. [`BridgeServer::start`] binds and serves until [`BridgeServer::shutdown`]
/// 3. While running, the game reports its own block and chat changes through
///    [`BridgeServer::notify_block_change`] and [`BridgeServer::notify_chat`]
pub struct BridgeServer {
    /// Server configuration settings
    config: ServerConfig,

    /// State shared with every connection task
    state: Arc<BridgeState>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,

    /// Number of connections currently being served
    active_connections: Arc<AtomicUsize>,
}

impl BridgeServer {
    /// Creates a server for the given world.
    pub fn new(
        config: ServerConfig,
        world: Arc<dyn WorldProvider>,
        block_types: Arc<dyn BlockTypeTable>,
        chat: Arc<dyn ChatSink>,
    ) -> Self {
        let state = Arc::new(BridgeState::new(&config, world, block_types, chat));
        let (shutdown_sender, _) = broadcast::channel(1);

        Self {
            config,
            state,
            shutdown_sender,
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn start(&self) -> Result<(), ServerError> {
        info!("🚀 Starting WebSandbox bridge on {}", self.config.bind_address);
        let listener = self.bind()?;
        self.run_with_listener(listener).await
    }

    fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.bind_address;
        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::Network(format!("Socket creation failed: {e}")))?;
        if let Err(e) = socket.set_reuse_address(true) {
            warn!("Failed to set SO_REUSEADDR: {}", e);
        }

        socket
            .bind(&address.into())
            .map_err(|e| ServerError::Network(format!("Bind failed: {e}")))?;
        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| ServerError::Network(format!("Listen failed: {e}")))?;

        let std_listener: StdTcpListener = socket.into();
        std_listener
            .set_nonblocking(true)
            .map_err(|e| ServerError::Network(format!("Failed to make listener non-blocking: {e}")))?;

        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::Network(format!("Tokio listener creation failed: {e}")))?;
        info!("✅ Listener bound on {}", address);
        Ok(listener)
    }

    /// Serves connections from an already bound listener until shutdown.
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        info!(
            "🌍 Mirroring {} blocks around {} (radius {}, y offset {})",
            self.state.viewport.cell_count(),
            self.state.viewport.center,
            self.state.viewport.radius,
            self.state.viewport.y_offset
        );

        loop {
            let (stream, addr) = tokio::select! {
                _ = shutdown_receiver.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            let Some(slot) = ConnectionSlot::acquire(&self.active_connections, self.config.max_connections) else {
                warn!(
                    "🚫 Refusing {}: {} connections already active",
                    addr, self.config.max_connections
                );
                continue;
            };

            if let Err(e) = stream.set_nodelay(true) {
                debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
            }

            let state = self.state.clone();
            let shutdown = self.shutdown_sender.subscribe();
            tokio::spawn(async move {
                let _slot = slot;
                if let Err(e) = handle_connection(stream, addr, state, shutdown).await {
                    warn!("Connection from {} ended with error: {}", addr, e);
                }
            });
        }

        info!("Server stopped");
        Ok(())
    }

    /// Stops the accept loop and every connection task.
    pub fn shutdown(&self) {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
    }

    /// Called by the game whenever a block changes on its side.
    pub fn notify_block_change(&self, world_pos: BlockPos, block: BlockTypeId) -> usize {
        CommandDispatcher::new(&self.state).notify_block_change(world_pos, block)
    }

    /// Called by the game for every chat line its players write.
    pub fn notify_chat(&self, message: &str) -> usize {
        CommandDispatcher::new(&self.state).notify_chat(message)
    }

    /// Gets the state shared with connection tasks.
    pub fn state(&self) -> Arc<BridgeState> {
        self.state.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Number of sockets currently being served, joined or not.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }
}
