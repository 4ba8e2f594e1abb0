//! Typed protocol messages.

use crate::world::BlockPos;

/// One protocol message.
///
/// Field values must not contain `,` or a line break; text bodies may contain
/// commas but no line break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireLine {
    /// `U`: place a player and set its facing.
    Position {
        player_id: i32,
        x: i32,
        y: i32,
        z: i32,
        rot_x: i32,
        rot_y: i32,
    },
    /// `E`: time of day.
    EnvInfo { time: i64, duration: i64 },
    /// `T`: chat or informational text. Decoding trims the body, so only a
    /// body without surrounding whitespace reads back unchanged; build it
    /// with [`WireLine::text`].
    Text { body: String },
    /// `N`: display name of a player id.
    NameAssign { player_id: i32, name: String },
    /// `B`: one block, in client coordinates.
    Block {
        dim: i32,
        chunk_x: i32,
        chunk_z: i32,
        x: i32,
        y: i32,
        z: i32,
        block_type: i32,
    },
    /// `K`: chunk version key.
    ChunkKey { chunk_x: i32, chunk_z: i32, key: i32 },
    /// `R`: re-render a chunk.
    ChunkRefresh { chunk_x: i32, chunk_z: i32 },
    /// Any line whose tag this server does not know, kept verbatim.
    Unknown { raw: String },
}

impl WireLine {
    /// Text line with surrounding whitespace removed, the same way decoding
    /// reads a `T` body, so the line reads back unchanged.
    pub fn text(body: impl Into<String>) -> Self {
        let body = body.into();
        let trimmed = body.trim();
        if trimmed.len() == body.len() {
            Self::Text { body }
        } else {
            Self::Text {
                body: trimmed.to_string(),
            }
        }
    }

    /// Block line in dimension 0, chunk (0, 0), the only chunk clients track.
    pub fn block(pos: BlockPos, block_type: i32) -> Self {
        Self::Block {
            dim: 0,
            chunk_x: 0,
            chunk_z: 0,
            x: pos.x,
            y: pos.y,
            z: pos.z,
            block_type,
        }
    }

    /// Command letter of this line, `None` for [`WireLine::Unknown`].
    pub fn tag(&self) -> Option<char> {
        match self {
            Self::Position { .. } => Some('U'),
            Self::EnvInfo { .. } => Some('E'),
            Self::Text { .. } => Some('T'),
            Self::NameAssign { .. } => Some('N'),
            Self::Block { .. } => Some('B'),
            Self::ChunkKey { .. } => Some('K'),
            Self::ChunkRefresh { .. } => Some('R'),
            Self::Unknown { .. } => None,
        }
    }
}
