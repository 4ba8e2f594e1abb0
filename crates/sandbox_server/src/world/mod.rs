//! Interfaces to the block world this bridge mirrors.
//!
//! The bridge never stores blocks itself. It reads and writes them through
//! the collaborator traits defined here, which the hosting game engine
//! implements:
//!
//! * [`WorldProvider`] - block reads, block writes and height queries
//! * [`BlockTypeTable`] - translation between world block types and the
//!   integers used on the wire
//! * [`ChatSink`] - the game's own chat, which receives web chat lines
//!
//! Implementations must be safe to call from several connection tasks at
//! once. The bridge adds no lock of its own around them.
//!
//! [`memory`] provides self-contained implementations used by the standalone
//! binary and by the tests.

pub mod memory;

pub use memory::{IdentityBlockTable, MemoryWorld, TracingChatSink};

use std::fmt;

/// Absolute or client-relative block coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Block type identifier as understood by the world provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockTypeId(pub u16);

impl BlockTypeId {
    /// Empty space.
    pub const AIR: Self = Self(0);

    pub fn is_air(self) -> bool {
        self == Self::AIR
    }
}

/// Failures reported by the external world collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The world could not serve the request (unloaded region, engine busy, ...).
    #[error("world unavailable: {0}")]
    Unavailable(String),

    /// A client sent a wire block type that has no world counterpart.
    #[error("unknown wire block type {0}")]
    UnknownWireType(i32),
}

/// Block storage owned by the hosting game engine.
pub trait WorldProvider: Send + Sync {
    /// Block type at an absolute world coordinate.
    fn block_type(&self, pos: BlockPos) -> Result<BlockTypeId, WorldError>;

    /// Replace the block at an absolute world coordinate.
    fn set_block_type(&self, pos: BlockPos, block: BlockTypeId) -> Result<(), WorldError>;

    /// Y coordinate of the highest non-air block in the column `(x, z)`.
    fn highest_solid_y(&self, x: i32, z: i32) -> Result<i32, WorldError>;

    /// Number of worlds loaded by the engine.
    fn world_count(&self) -> usize;
}

/// Translation between world block types and wire block integers.
///
/// `to_wire` is total over the types the world can hold. `to_world` is
/// partial because its input comes from clients.
pub trait BlockTypeTable: Send + Sync {
    fn to_wire(&self, block: BlockTypeId) -> i32;

    fn to_world(&self, wire: i32) -> Option<BlockTypeId>;
}

/// The game's chat channel.
pub trait ChatSink: Send + Sync {
    fn broadcast_system_message(&self, text: &str);
}
