//! Core server implementation.
//!
//! * [`BridgeServer`] - listener setup, accept loop and shutdown
//! * [`BridgeState`] - everything the connection tasks share
//! * [`HandshakeSequencer`] - the join snapshot sent to a new session
//! * [`CommandDispatcher`] - routing of decoded client lines and of
//!   notifications coming from the game
//! * [`handlers`] - the per-connection read loop

pub mod core;
pub mod dispatcher;
pub mod handlers;
pub mod handshake;
pub mod state;

pub use self::core::BridgeServer;
pub use dispatcher::{CommandDispatcher, Dispatched};
pub use handshake::HandshakeSequencer;
pub use state::BridgeState;
