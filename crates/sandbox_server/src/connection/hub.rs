//! Fan-out of encoded lines to joined sessions.
//!
//! The hub never writes to a socket. Each connection has a single writer task
//! draining its [`OutboundQueue`], so lines reach one client in the order the
//! hub accepted them. Enqueueing never waits: a connection whose queue is full
//! or whose writer has gone away is detached on the spot and the caller moves
//! on to the next recipient. The connection's gateway is woken through its
//! [`BroadcastHub::eviction_signal`] so it can close the socket and end the
//! session.

use super::{ConnectionId, OutboundQueue};
use crate::protocol::WireLine;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Why a line could not be handed to a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("connection {0} is not attached")]
    NotAttached(ConnectionId),

    #[error("connection {0} closed its outbound queue")]
    Closed(ConnectionId),

    #[error("outbound queue of connection {0} is full")]
    QueueFull(ConnectionId),
}

/// Delivery set of every joined connection.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    queues: DashMap<ConnectionId, OutboundQueue>,
    evictions: DashMap<ConnectionId, Arc<Notify>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the delivery set, replacing any earlier queue.
    pub fn attach(&self, connection_id: ConnectionId, queue: OutboundQueue) {
        self.queues.insert(connection_id, queue);
    }

    /// Removes a connection from the delivery set. Returns whether it was there.
    ///
    /// This is the orderly path and fires no eviction signal.
    pub fn detach(&self, connection_id: ConnectionId) -> bool {
        self.evictions.remove(&connection_id);
        self.queues.remove(&connection_id).is_some()
    }

    /// Signal fired once the hub drops `connection_id` after a failed
    /// delivery. A permit is stored if nobody is waiting yet.
    pub fn eviction_signal(&self, connection_id: ConnectionId) -> Arc<Notify> {
        self.evictions.entry(connection_id).or_default().clone()
    }

    pub fn is_attached(&self, connection_id: ConnectionId) -> bool {
        self.queues.contains_key(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Queues one line for a single connection.
    pub fn send_to(&self, connection_id: ConnectionId, line: &WireLine) -> Result<(), DeliveryError> {
        self.send_encoded(connection_id, Arc::from(line.encode()))
    }

    /// Queues an already encoded line for a single connection.
    pub fn send_encoded(&self, connection_id: ConnectionId, line: Arc<str>) -> Result<(), DeliveryError> {
        let queue = self
            .queues
            .get(&connection_id)
            .map(|entry| entry.value().clone())
            .ok_or(DeliveryError::NotAttached(connection_id))?;
        self.deliver(connection_id, &queue, line)
    }

    /// Queues one line for every attached connection and returns how many
    /// accepted it.
    ///
    /// Recipients are taken from a snapshot of the delivery set, so
    /// connections attaching or detaching meanwhile do not disturb the walk.
    pub fn broadcast_all(&self, line: &WireLine) -> usize {
        let encoded: Arc<str> = Arc::from(line.encode());
        let recipients: Vec<(ConnectionId, OutboundQueue)> = self
            .queues
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        for (connection_id, queue) in recipients {
            match self.deliver(connection_id, &queue, encoded.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => debug!("Broadcast skipped connection {}: {}", connection_id, e),
            }
        }
        delivered
    }

    fn deliver(
        &self,
        connection_id: ConnectionId,
        queue: &OutboundQueue,
        line: Arc<str>,
    ) -> Result<(), DeliveryError> {
        let error = match queue.try_send(line) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(_)) => DeliveryError::QueueFull(connection_id),
            Err(TrySendError::Closed(_)) => DeliveryError::Closed(connection_id),
        };

        // Only drop the queue we failed on; the connection may have been
        // re-attached with a fresh one in the meantime.
        if self
            .queues
            .remove_if(&connection_id, |_, current| current.same_channel(queue))
            .is_some()
        {
            warn!("📤 Dropping connection {} from broadcasts: {}", connection_id, error);
            if let Some(signal) = self.evictions.get(&connection_id) {
                signal.notify_one();
            }
        }
        Err(error)
    }
}
