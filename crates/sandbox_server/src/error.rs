//! Error types for the sandbox server.

use crate::connection::{DeliveryError, RegistryError};
use crate::protocol::ProtocolError;
use crate::world::WorldError;

/// Every error the bridge can surface.
///
/// None of these is fatal for the process. Each one is scoped either to a
/// single inbound line or to a single connection; see the variant docs for
/// which.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Listener setup or socket failure.
    #[error("network error: {0}")]
    Network(String),

    /// A line with a known tag had the wrong shape. The line is dropped.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Session bookkeeping was asked for something it does not have.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The world or its type table refused the operation in progress.
    #[error(transparent)]
    World(#[from] WorldError),

    /// The joining connection's queue rejected a handshake line.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// A client edit targeted a block outside the mirrored region.
    #[error("edit at {x},{y},{z} lies outside the viewport")]
    EditOutsideViewport { x: i32, y: i32, z: i32 },

    /// The transport delivered a frame kind this server does not handle.
    /// The connection is closed.
    #[error("unsupported frame: {0}")]
    UnsupportedFrame(String),

    #[error("internal error: {0}")]
    Internal(String),
}
