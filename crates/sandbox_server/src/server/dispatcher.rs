//! Routing of client commands and game-side notifications.

use super::BridgeState;
use crate::connection::ConnectionId;
use crate::error::ServerError;
use crate::protocol::WireLine;
use crate::world::{BlockPos, BlockTypeId, WorldError};
use tracing::{debug, info};

/// What a dispatched line did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// A client edit was written to the world at this absolute position.
    BlockApplied(BlockPos),
    /// A chat line was relayed; carries the formatted text.
    ChatRelayed(String),
    /// The line has no effect on the server.
    Ignored,
}

/// Applies decoded client lines to the world and chat, and turns world and
/// chat events from the game into broadcasts.
pub struct CommandDispatcher<'a> {
    state: &'a BridgeState,
}

impl<'a> CommandDispatcher<'a> {
    pub fn new(state: &'a BridgeState) -> Self {
        Self { state }
    }

    /// Handles one line received from `connection_id`.
    pub fn dispatch(&self, connection_id: ConnectionId, line: WireLine) -> Result<Dispatched, ServerError> {
        match line {
            WireLine::Block {
                x,
                y,
                z,
                block_type,
                ..
            } => self.apply_edit(BlockPos::new(x, y, z), block_type),
            WireLine::Text { body } => self.relay_chat(connection_id, &body),
            other => {
                debug!("Ignoring {:?} from connection {}", other.tag(), connection_id);
                Ok(Dispatched::Ignored)
            }
        }
    }

    fn apply_edit(&self, client: BlockPos, wire_type: i32) -> Result<Dispatched, ServerError> {
        let viewport = &self.state.viewport;
        let world_pos = viewport.inverse(client);
        if !self.state.allow_out_of_viewport_edits && !viewport.contains_world(world_pos) {
            return Err(ServerError::EditOutsideViewport {
                x: world_pos.x,
                y: world_pos.y,
                z: world_pos.z,
            });
        }

        let block = self
            .state
            .block_types
            .to_world(wire_type)
            .ok_or(WorldError::UnknownWireType(wire_type))?;
        self.state.world.set_block_type(world_pos, block)?;
        debug!("Set block {} to {:?}", world_pos, block);

        // Echo in client space so every viewer, the editor included, agrees.
        self.state.hub.broadcast_all(&WireLine::block(client, wire_type));
        self.state.hub.broadcast_all(&WireLine::ChunkRefresh {
            chunk_x: 0,
            chunk_z: 0,
        });
        Ok(Dispatched::BlockApplied(world_pos))
    }

    fn relay_chat(&self, connection_id: ConnectionId, body: &str) -> Result<Dispatched, ServerError> {
        let name = self.state.registry.lookup_name(connection_id)?;
        let formatted = format!("<{name}> {body}");
        self.state.hub.broadcast_all(&WireLine::text(formatted.as_str()));
        self.state.chat.broadcast_system_message(&formatted);
        Ok(Dispatched::ChatRelayed(formatted))
    }

    /// Mirrors a block change made inside the game to every session.
    /// Returns the number of sessions the block line reached.
    pub fn notify_block_change(&self, world_pos: BlockPos, block: BlockTypeId) -> usize {
        let client = self.state.viewport.forward(world_pos);
        let wire_type = self.state.block_types.to_wire(block);
        let delivered = self.state.hub.broadcast_all(&WireLine::block(client, wire_type));
        self.state.hub.broadcast_all(&WireLine::ChunkRefresh {
            chunk_x: 0,
            chunk_z: 0,
        });
        debug!("Block {} ({:?}) sent to {} sessions", world_pos, block, delivered);
        delivered
    }

    /// Relays a chat line written inside the game to every session.
    pub fn notify_chat(&self, message: &str) -> usize {
        info!("💬 Relaying game chat to web: {}", message);
        self.state.hub.broadcast_all(&WireLine::text(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::RegistryError;
    use crate::server::state::testing::{state_with, RecordingChat};
    use crate::viewport::Viewport;
    use crate::world::{MemoryWorld, WorldProvider};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn lines(rx: &mut mpsc::Receiver<Arc<str>>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(line) = rx.try_recv() {
            out.push(line.trim_end_matches('\n').to_string());
        }
        out
    }

    #[test]
    fn test_client_edit_maps_through_inverse() {
        let world = Arc::new(MemoryWorld::default());
        let viewport = Viewport::new(BlockPos::new(5, 5, 5), 1, 0);
        let state = state_with(viewport, world.clone(), Arc::new(RecordingChat::default()));

        let result = CommandDispatcher::new(&state)
            .dispatch(1, crate::protocol::decode("B,0,0,0,7").unwrap())
            .unwrap();

        assert_eq!(result, Dispatched::BlockApplied(BlockPos::new(4, 4, 4)));
        assert_eq!(world.block_type(BlockPos::new(4, 4, 4)).unwrap(), BlockTypeId(7));
    }

    #[test]
    fn test_applied_edit_is_echoed() {
        let viewport = Viewport::new(BlockPos::new(0, 70, 0), 2, 0);
        let state = state_with(
            viewport,
            Arc::new(MemoryWorld::default()),
            Arc::new(RecordingChat::default()),
        );
        let (tx, mut rx) = mpsc::channel(8);
        state.hub.attach(2, tx);

        CommandDispatcher::new(&state)
            .dispatch(1, crate::protocol::decode("B,1,2,3,0").unwrap())
            .unwrap();

        assert_eq!(lines(&mut rx), ["B,0,0,0,1,2,3,0", "R,0,0"]);
    }

    #[test]
    fn test_edit_outside_viewport_is_rejected() {
        let world = Arc::new(MemoryWorld::default());
        let viewport = Viewport::new(BlockPos::new(5, 5, 5), 1, 0);
        let state = state_with(viewport, world.clone(), Arc::new(RecordingChat::default()));

        let result = CommandDispatcher::new(&state).dispatch(1, crate::protocol::decode("B,2,0,0,7").unwrap());

        assert!(matches!(
            result,
            Err(ServerError::EditOutsideViewport { x: 6, y: 4, z: 4 })
        ));
        assert_eq!(world.edit_count(), 0);
    }

    #[test]
    fn test_edit_outside_viewport_allowed_by_policy() {
        let world = Arc::new(MemoryWorld::default());
        let viewport = Viewport::new(BlockPos::new(5, 5, 5), 1, 0);
        let mut state = state_with(viewport, world.clone(), Arc::new(RecordingChat::default()));
        state.allow_out_of_viewport_edits = true;

        let result = CommandDispatcher::new(&state)
            .dispatch(1, crate::protocol::decode("B,40,0,0,7").unwrap())
            .unwrap();

        assert_eq!(result, Dispatched::BlockApplied(BlockPos::new(44, 4, 4)));
        assert_eq!(world.block_type(BlockPos::new(44, 4, 4)).unwrap(), BlockTypeId(7));
    }

    #[test]
    fn test_unknown_wire_type_is_rejected() {
        let world = Arc::new(MemoryWorld::default());
        let viewport = Viewport::new(BlockPos::new(0, 0, 0), 1, 0);
        let state = state_with(viewport, world.clone(), Arc::new(RecordingChat::default()));

        let result = CommandDispatcher::new(&state).dispatch(1, crate::protocol::decode("B,0,0,0,-4").unwrap());

        assert!(matches!(
            result,
            Err(ServerError::World(WorldError::UnknownWireType(-4)))
        ));
        assert_eq!(world.edit_count(), 0);
    }

    #[test]
    fn test_chat_is_broadcast_and_forwarded() {
        let chat = Arc::new(RecordingChat::default());
        let state = state_with(Viewport::default(), Arc::new(MemoryWorld::default()), chat.clone());
        let (tx, mut rx) = mpsc::channel(8);
        state.registry.register(1).unwrap();
        state.hub.attach(1, tx);

        let result = CommandDispatcher::new(&state)
            .dispatch(1, crate::protocol::decode("T, hello").unwrap())
            .unwrap();

        assert_eq!(result, Dispatched::ChatRelayed("<webguest1> hello".to_string()));
        assert_eq!(lines(&mut rx), ["T,<webguest1> hello"]);
        assert_eq!(*chat.messages.lock().unwrap(), ["<webguest1> hello"]);
    }

    #[test]
    fn test_chat_from_unknown_connection_is_dropped() {
        let chat = Arc::new(RecordingChat::default());
        let state = state_with(Viewport::default(), Arc::new(MemoryWorld::default()), chat.clone());
        let (tx, mut rx) = mpsc::channel(8);
        state.hub.attach(1, tx);

        let result = CommandDispatcher::new(&state).dispatch(1, WireLine::text("hi"));

        assert!(matches!(
            result,
            Err(ServerError::Registry(RegistryError::NotFound(_)))
        ));
        assert!(lines(&mut rx).is_empty());
        assert!(chat.messages.lock().unwrap().is_empty());
    }

    #[test]
    fn test_other_commands_are_ignored() {
        let state = state_with(
            Viewport::default(),
            Arc::new(MemoryWorld::default()),
            Arc::new(RecordingChat::default()),
        );
        let dispatcher = CommandDispatcher::new(&state);
        for raw in ["Q,foo,bar", "U,1,2,3,4,5,6", "K,0,0,1", "R,0,0", "E,10,600", "N,1,bob"] {
            let line = crate::protocol::decode(raw).unwrap();
            assert_eq!(dispatcher.dispatch(1, line).unwrap(), Dispatched::Ignored);
        }
    }

    #[test]
    fn test_world_change_notification() {
        let viewport = Viewport::new(BlockPos::new(100, 64, 100), 4, 2);
        let state = state_with(
            viewport,
            Arc::new(MemoryWorld::default()),
            Arc::new(RecordingChat::default()),
        );
        let (tx, mut rx) = mpsc::channel(8);
        state.hub.attach(1, tx);

        let delivered = CommandDispatcher::new(&state).notify_block_change(BlockPos::new(101, 64, 99), BlockTypeId(5));

        assert_eq!(delivered, 1);
        assert_eq!(lines(&mut rx), ["B,0,0,0,5,6,3,5", "R,0,0"]);
    }

    #[test]
    fn test_game_chat_notification() {
        let state = state_with(
            Viewport::default(),
            Arc::new(MemoryWorld::default()),
            Arc::new(RecordingChat::default()),
        );
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        state.hub.attach(1, tx1);
        state.hub.attach(2, tx2);

        assert_eq!(CommandDispatcher::new(&state).notify_chat("<Steve> hi, all"), 2);
        assert_eq!(lines(&mut rx1), ["T,<Steve> hi, all"]);
        assert_eq!(lines(&mut rx2), ["T,<Steve> hi, all"]);
    }
}
