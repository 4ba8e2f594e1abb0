//! # Sandbox Server - WebSocket Bridge to a Block World
//!
//! Mirrors a cubic region of a voxel game world to browser clients over
//! WebSocket and feeds their edits and chat back into the game.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Viewport** ([`viewport`]) - The mirrored cube and the mapping between
//!   world and client coordinates
//! * **Protocol** ([`protocol`]) - The comma-separated line protocol
//! * **Sessions** ([`connection`]) - Guest names and the broadcast hub
//! * **Server** ([`server`]) - Join handshake, command routing and the
//!   per-connection gateway
//! * **World** ([`world`]) - Traits the hosting game implements, plus an
//!   in-memory world for standalone use
//!
//! ### Message Flow
//!
//! 1. A client connects and announces its version with a `V,` line
//! 2. The server names it `webguestN` and streams the viewport's blocks
//! 3. Client `B` lines are mapped back to world coordinates and written to
//!    the world; client `T` lines are relayed to every session and to the
//!    game's chat
//! 4. Block and chat changes made inside the game reach every session
//!    through [`BridgeServer::notify_block_change`] and
//!    [`BridgeServer::notify_chat`]
//!
//! ## Error Handling
//!
//! No error ends the process. [`ServerError`] values are scoped to the line
//! or the connection that caused them: bad lines are logged and dropped, an
//! unsupported WebSocket frame closes only its own connection.
//!
//! ## Thread Safety
//!
//! Every connection runs on its own task. The session registry keeps both
//! directions of its mapping under one lock, the hub is a concurrent map of
//! bounded queues, and each connection has exactly one writer task, so lines
//! reach any one client in order.

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::BridgeServer;

pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod server;
pub mod viewport;
pub mod world;

use std::sync::Arc;
use world::{IdentityBlockTable, MemoryWorld, TracingChatSink};

/// Creates a server over an in-memory world, with block ids used verbatim on
/// the wire and relayed chat written to the log.
pub fn create_standalone_server(config: ServerConfig, world: Arc<MemoryWorld>) -> BridgeServer {
    BridgeServer::new(config, world, Arc::new(IdentityBlockTable), Arc::new(TracingChatSink))
}
