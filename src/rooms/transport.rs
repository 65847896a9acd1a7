use std::collections::{BTreeSet, HashMap};

use tokio::sync::mpsc;

use super::registry::ConnectionId;
use super::signaling::ServerMessage;

/// Outbound messages from the engine to a given connection.
pub type OutboundTx = mpsc::UnboundedSender<ServerMessage>;
pub type OutboundRx = mpsc::UnboundedReceiver<ServerMessage>;

/// Delivery sink used by the coordinator.
///
/// Sends are fire-and-forget; a connection that has gone away simply
/// misses the message.
pub trait Transport {
    fn join_group(&mut self, connection: ConnectionId, room_id: &str);

    fn leave_group(&mut self, connection: ConnectionId, room_id: &str);

    /// Forget a connection entirely, including every group it was in.
    fn detach(&mut self, connection: ConnectionId);

    fn to_room(&self, room_id: &str, message: &ServerMessage);

    fn to_connection(&self, connection: ConnectionId, message: &ServerMessage);
}

/// Transport over per-connection unbounded channels.
///
/// Each WebSocket task owns the receiving end and writes what it gets to
/// the socket in order.
#[derive(Debug, Default)]
pub struct ChannelHub {
    outbound: HashMap<ConnectionId, OutboundTx>,
    groups: HashMap<String, BTreeSet<ConnectionId>>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, connection: ConnectionId, tx: OutboundTx) {
        if self.outbound.insert(connection, tx).is_some() {
            tracing::warn!(connection = %connection, "Connection attached twice, replacing sender");
        }
    }

    pub fn connection_count(&self) -> usize {
        self.outbound.len()
    }

    pub fn group_size(&self, room_id: &str) -> usize {
        self.groups.get(room_id).map_or(0, |members| members.len())
    }

    fn send(&self, connection: ConnectionId, message: &ServerMessage) {
        match self.outbound.get(&connection) {
            Some(tx) => {
                if tx.send(message.clone()).is_err() {
                    tracing::debug!(connection = %connection, "Dropping message for closed connection");
                }
            }
            None => {
                tracing::debug!(connection = %connection, "No outbound channel for connection");
            }
        }
    }
}

impl Transport for ChannelHub {
    fn join_group(&mut self, connection: ConnectionId, room_id: &str) {
        self.groups
            .entry(room_id.to_string())
            .or_default()
            .insert(connection);
    }

    fn leave_group(&mut self, connection: ConnectionId, room_id: &str) {
        if let Some(members) = self.groups.get_mut(room_id) {
            members.remove(&connection);
            if members.is_empty() {
                self.groups.remove(room_id);
            }
        }
    }

    fn detach(&mut self, connection: ConnectionId) {
        self.outbound.remove(&connection);
        self.groups.retain(|_, members| {
            members.remove(&connection);
            !members.is_empty()
        });
    }

    fn to_room(&self, room_id: &str, message: &ServerMessage) {
        let Some(members) = self.groups.get(room_id) else {
            return;
        };

        for connection in members {
            self.send(*connection, message);
        }
    }

    fn to_connection(&self, connection: ConnectionId, message: &ServerMessage) {
        self.send(connection, message);
    }
}
