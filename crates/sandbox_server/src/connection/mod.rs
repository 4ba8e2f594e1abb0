//! Connection management for web clients.
//!
//! This module tracks who is connected ([`SessionRegistry`]) and how to reach
//! them ([`BroadcastHub`]). Both are keyed by [`ConnectionId`], which the
//! accept loop hands out once per accepted socket.

pub mod client;
pub mod hub;
pub mod registry;

pub use client::Session;
pub use hub::{BroadcastHub, DeliveryError};
pub use registry::{RegistryError, SessionRegistry};

use std::sync::Arc;
use tokio::sync::mpsc;

/// Type alias for connection identifiers.
///
/// Connection IDs are unique for the lifetime of the server process and are
/// never reused.
pub type ConnectionId = usize;

/// Sending half of a connection's outbound line queue.
///
/// Every line put on the queue is already encoded, so one encoding can be
/// shared by all recipients of a broadcast.
pub type OutboundQueue = mpsc::Sender<Arc<str>>;
