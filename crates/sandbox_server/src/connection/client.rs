//! Session representation for joined web clients.

use super::ConnectionId;
use std::time::Instant;

/// A web client that has completed the join handshake.
///
/// A session exists from the moment its connection is registered under a
/// display name until that connection closes.
#[derive(Debug, Clone)]
pub struct Session {
    /// The connection this session lives on
    pub connection_id: ConnectionId,

    /// Guest name shown to other players, unique among live sessions
    pub display_name: String,

    /// When the session was registered
    pub joined_at: Instant,
}

impl Session {
    /// Creates a session that joined just now.
    pub fn new(connection_id: ConnectionId, display_name: impl Into<String>) -> Self {
        Self {
            connection_id,
            display_name: display_name.into(),
            joined_at: Instant::now(),
        }
    }
}
