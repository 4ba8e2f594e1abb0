//! The join sequence sent to a session after its version announce.
//!
//! Lines go out in this order, all to the joining connection except the last:
//!
//! 1. `T,Welcome to WebSandboxMC, <name>!` and `T,Worlds loaded: <n>`
//! 2. a placeholder block with `K,0,0,0` and `R,0,0`, so the client starts
//!    from an empty chunk
//! 3. one `B` line per cell of the viewport, X outermost, then Y, then Z
//! 4. `K,0,0,1`, `R,0,0` and `T,Blocks sent`
//! 5. `U,1,...` placing the player above the ground at the viewport center
//! 6. `T,<name> has joined.` to every joined session

use super::BridgeState;
use crate::connection::{ConnectionId, OutboundQueue};
use crate::error::ServerError;
use crate::protocol::WireLine;
use crate::world::BlockPos;
use tracing::{debug, info};

/// Player id the web client uses for itself.
pub const LOCAL_PLAYER_ID: i32 = 1;

/// Walks one new session through the join sequence.
pub struct HandshakeSequencer<'a> {
    state: &'a BridgeState,
    connection_id: ConnectionId,
}

impl<'a> HandshakeSequencer<'a> {
    pub fn new(state: &'a BridgeState, connection_id: ConnectionId) -> Self {
        Self {
            state,
            connection_id,
        }
    }

    /// Registers the session, attaches `queue` to the hub and sends the join
    /// sequence. Returns the display name assigned to the session.
    ///
    /// A world failure part way through stops the sequence where it is. The
    /// session stays registered and attached.
    pub fn run(&self, queue: OutboundQueue) -> Result<String, ServerError> {
        let name = self.state.registry.register(self.connection_id)?;
        self.state.hub.attach(self.connection_id, queue);
        info!("🎮 Connection {} joined as {}", self.connection_id, name);

        self.send(WireLine::text(format!("Welcome to WebSandboxMC, {name}!")))?;
        self.send(WireLine::text(format!(
            "Worlds loaded: {}",
            self.state.world.world_count()
        )))?;

        self.send(WireLine::block(BlockPos::new(0, 30, 0), 1))?;
        self.send(WireLine::ChunkKey {
            chunk_x: 0,
            chunk_z: 0,
            key: 0,
        })?;
        self.send(WireLine::ChunkRefresh {
            chunk_x: 0,
            chunk_z: 0,
        })?;

        let sent = self.send_snapshot()?;
        debug!("Sent {} blocks to {}", sent, name);

        self.send(WireLine::ChunkKey {
            chunk_x: 0,
            chunk_z: 0,
            key: 1,
        })?;
        self.send(WireLine::ChunkRefresh {
            chunk_x: 0,
            chunk_z: 0,
        })?;
        self.send(WireLine::text("Blocks sent"))?;

        let spawn = self.spawn_point()?;
        self.send(WireLine::Position {
            player_id: LOCAL_PLAYER_ID,
            x: spawn.x,
            y: spawn.y,
            z: spawn.z,
            rot_x: 0,
            rot_y: 0,
        })?;

        self.state
            .hub
            .broadcast_all(&WireLine::text(format!("{name} has joined.")));
        Ok(name)
    }

    /// Client coordinate the session starts at: the middle of the cube
    /// horizontally, one block above the highest solid block of the center
    /// column.
    pub fn spawn_point(&self) -> Result<BlockPos, ServerError> {
        let viewport = &self.state.viewport;
        let r = i32::from(viewport.radius);
        let ground = self
            .state
            .world
            .highest_solid_y(viewport.center.x, viewport.center.z)?;
        let y = ground
            .wrapping_add(1)
            .wrapping_sub(r)
            .wrapping_sub(viewport.y_offset);
        Ok(BlockPos::new(r, y, r))
    }

    fn send_snapshot(&self) -> Result<usize, ServerError> {
        let viewport = &self.state.viewport;
        let mut sent = 0;
        for cell in viewport.world_cells() {
            let block = self.state.world.block_type(cell)?;
            let wire = self.state.block_types.to_wire(block);
            self.send(WireLine::block(viewport.forward(cell), wire))?;
            sent += 1;
        }
        Ok(sent)
    }

    fn send(&self, line: WireLine) -> Result<(), ServerError> {
        self.state.hub.send_to(self.connection_id, &line)?;
        Ok(())
    }
}
