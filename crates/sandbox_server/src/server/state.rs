//! Shared server state.

use crate::config::ServerConfig;
use crate::connection::{BroadcastHub, ConnectionId, SessionRegistry};
use crate::viewport::Viewport;
use crate::world::{BlockTypeTable, ChatSink, WorldProvider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Context handed to every connection task.
///
/// The viewport and edit policy are fixed at construction. The registry and
/// the hub are the only mutable parts and guard themselves.
pub struct BridgeState {
    pub viewport: Viewport,
    pub allow_out_of_viewport_edits: bool,
    pub outbound_queue_capacity: usize,
    pub world: Arc<dyn WorldProvider>,
    pub block_types: Arc<dyn BlockTypeTable>,
    pub chat: Arc<dyn ChatSink>,
    pub registry: SessionRegistry,
    pub hub: BroadcastHub,
    next_connection_id: AtomicUsize,
}

impl BridgeState {
    pub fn new(
        config: &ServerConfig,
        world: Arc<dyn WorldProvider>,
        block_types: Arc<dyn BlockTypeTable>,
        chat: Arc<dyn ChatSink>,
    ) -> Self {
        Self {
            viewport: config.viewport,
            allow_out_of_viewport_edits: config.allow_out_of_viewport_edits,
            outbound_queue_capacity: config.outbound_queue_capacity.max(1),
            world,
            block_types,
            chat,
            registry: SessionRegistry::new(),
            hub: BroadcastHub::new(),
            next_connection_id: AtomicUsize::new(1),
        }
    }

    /// Hands out the id for a freshly accepted connection.
    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl std::fmt::Debug for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeState")
            .field("viewport", &self.viewport)
            .field("allow_out_of_viewport_edits", &self.allow_out_of_viewport_edits)
            .field("sessions", &self.registry.len())
            .field("attached", &self.hub.len())
            .finish_non_exhaustive()
    }
}
