//! In-process world collaborators.
//!
//! [`MemoryWorld`] is a flat terrain with sparse overrides held in a
//! [`DashMap`], which makes it safe to mutate from every connection task
//! without further locking.

use super::{BlockPos, BlockTypeId, BlockTypeTable, ChatSink, WorldError, WorldProvider};
use dashmap::DashMap;
use tracing::info;

/// Lowest Y the height query will descend to before giving up on a column.
pub const MIN_BUILD_HEIGHT: i32 = -64;

/// Flat generated terrain plus every block written since startup.
///
/// Cells at or below `ground_level` are solid: `surface` on the top layer and
/// `fill` underneath. Everything above is air until written.
#[derive(Debug)]
pub struct MemoryWorld {
    ground_level: i32,
    surface: BlockTypeId,
    fill: BlockTypeId,
    edits: DashMap<BlockPos, BlockTypeId>,
}

impl MemoryWorld {
    pub fn new(ground_level: i32, surface: BlockTypeId, fill: BlockTypeId) -> Self {
        Self {
            ground_level,
            surface,
            fill,
            edits: DashMap::new(),
        }
    }

    fn generated(&self, pos: BlockPos) -> BlockTypeId {
        if pos.y == self.ground_level {
            self.surface
        } else if pos.y < self.ground_level {
            self.fill
        } else {
            BlockTypeId::AIR
        }
    }

    /// Number of cells that differ from the generated terrain.
    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }
}

impl Default for MemoryWorld {
    fn default() -> Self {
        Self::new(64, BlockTypeId(2), BlockTypeId(1))
    }
}

impl WorldProvider for MemoryWorld {
    fn block_type(&self, pos: BlockPos) -> Result<BlockTypeId, WorldError> {
        Ok(self
            .edits
            .get(&pos)
            .map(|entry| *entry.value())
            .unwrap_or_else(|| self.generated(pos)))
    }

    fn set_block_type(&self, pos: BlockPos, block: BlockTypeId) -> Result<(), WorldError> {
        if block == self.generated(pos) {
            self.edits.remove(&pos);
        } else {
            self.edits.insert(pos, block);
        }
        Ok(())
    }

    fn highest_solid_y(&self, x: i32, z: i32) -> Result<i32, WorldError> {
        let highest_edit = self
            .edits
            .iter()
            .filter(|entry| {
                let pos = entry.key();
                pos.x == x && pos.z == z && !entry.value().is_air()
            })
            .map(|entry| entry.key().y)
            .max();

        let mut y = highest_edit.map_or(self.ground_level, |edit_y| edit_y.max(self.ground_level));
        while y >= MIN_BUILD_HEIGHT {
            if !self.block_type(BlockPos::new(x, y, z))?.is_air() {
                return Ok(y);
            }
            y -= 1;
        }
        Ok(MIN_BUILD_HEIGHT)
    }

    fn world_count(&self) -> usize {
        1
    }
}

/// Block table for worlds whose type ids already are the wire integers.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityBlockTable;

impl BlockTypeTable for IdentityBlockTable {
    fn to_wire(&self, block: BlockTypeId) -> i32 {
        i32::from(block.0)
    }

    fn to_world(&self, wire: i32) -> Option<BlockTypeId> {
        u16::try_from(wire).ok().map(BlockTypeId)
    }
}

/// Chat sink that writes relayed chat to the server log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingChatSink;

impl ChatSink for TracingChatSink {
    fn broadcast_system_message(&self, text: &str) {
        info!("💬 {}", text);
    }
}
