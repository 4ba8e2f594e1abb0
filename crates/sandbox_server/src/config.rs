//! Server configuration types and defaults.

use crate::viewport::Viewport;
use std::net::SocketAddr;

/// Default WebSocket port of the web client.
pub const DEFAULT_PORT: u16 = 4081;

/// Configuration structure for the bridge server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Capacity, in lines, of each connection's outbound queue
    pub outbound_queue_capacity: usize,

    /// World region mirrored to every client
    pub viewport: Viewport,

    /// Whether client edits may land outside the mirrored region
    pub allow_out_of_viewport_edits: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 1000,
            outbound_queue_capacity: 65536,
            viewport: Viewport::default(),
            allow_out_of_viewport_edits: false,
        }
    }
}

impl ServerConfig {
    /// Smallest outbound queue that holds a complete handshake.
    pub fn min_queue_capacity(viewport: &Viewport) -> usize {
        viewport.cell_count() + 16
    }
}
