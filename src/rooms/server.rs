//! Engine task and its handle.
//!
//! One task owns the `Coordinator` and processes `EngineRequest`s from all
//! connection tasks in arrival order. Connection tasks only ever talk to it
//! through `RoomServer`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use super::engine::Coordinator;
use super::registry::ConnectionId;
use super::roles::RandomSelector;
use super::signaling::ClientMessage;
use super::transport::{ChannelHub, OutboundTx};
use crate::config::GameConfig;
use crate::error::{Result, RoomError};

/// Message flowing from a connection task into the engine task.
#[derive(Debug)]
pub enum EngineRequest {
    Connect {
        connection: ConnectionId,
        outbound: OutboundTx,
    },
    Command {
        connection: ConnectionId,
        message: ClientMessage,
    },
    Disconnect {
        connection: ConnectionId,
    },
    Stats {
        reply: oneshot::Sender<ServerStats>,
    },
}

pub type EngineTx = mpsc::UnboundedSender<EngineRequest>;
pub type EngineRx = mpsc::UnboundedReceiver<EngineRequest>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerStats {
    pub rooms: usize,
    pub connections: usize,
    pub bindings: usize,
}

/// Cloneable handle to the engine task.
#[derive(Clone)]
pub struct RoomServer {
    engine_tx: EngineTx,
    next_connection: Arc<AtomicU64>,
}

impl RoomServer {
    /// Spawns the engine task on the current tokio runtime.
    pub fn spawn(settings: GameConfig) -> Self {
        let selector = Box::new(RandomSelector::from_seed_option(settings.role_seed));
        if settings.role_seed.is_some() {
            tracing::info!("Role selection seeded from configuration");
        }

        let coordinator = Coordinator::new(ChannelHub::new(), selector, settings);
        let (engine_tx, engine_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_engine_loop(engine_rx, coordinator));

        Self {
            engine_tx,
            next_connection: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Registers a new connection and the channel its messages go to.
    pub fn connect(&self, outbound: OutboundTx) -> Result<ConnectionId> {
        let connection = ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed));
        self.submit(EngineRequest::Connect { connection, outbound })?;
        Ok(connection)
    }

    pub fn send(&self, connection: ConnectionId, message: ClientMessage) -> Result<()> {
        self.submit(EngineRequest::Command { connection, message })
    }

    pub fn disconnect(&self, connection: ConnectionId) -> Result<()> {
        self.submit(EngineRequest::Disconnect { connection })
    }

    pub async fn stats(&self) -> Result<ServerStats> {
        let (reply, rx) = oneshot::channel();
        self.submit(EngineRequest::Stats { reply })?;
        rx.await.map_err(|_| RoomError::EngineUnavailable)
    }

    fn submit(&self, request: EngineRequest) -> Result<()> {
        self.engine_tx
            .send(request)
            .map_err(|_| RoomError::EngineUnavailable)
    }
}

/// Run the engine processing loop until every handle is dropped.
pub async fn run_engine_loop(mut engine_rx: EngineRx, mut coordinator: Coordinator<ChannelHub>) {
    tracing::info!("Room engine started");

    while let Some(request) = engine_rx.recv().await {
        match request {
            EngineRequest::Connect { connection, outbound } => {
                coordinator.transport_mut().attach(connection, outbound);
            }
            EngineRequest::Command { connection, message } => {
                let command = message.name();
                if let Err(e) = coordinator.handle(connection, message) {
                    if e.is_rejection() {
                        tracing::warn!(connection = %connection, command, error = %e, "Command rejected");
                    } else {
                        tracing::error!(connection = %connection, command, error = %e, "Command failed");
                    }
                }
            }
            EngineRequest::Disconnect { connection } => {
                coordinator.disconnect(connection);
            }
            EngineRequest::Stats { reply } => {
                let _ = reply.send(ServerStats {
                    rooms: coordinator.room_count(),
                    connections: coordinator.transport().connection_count(),
                    bindings: coordinator.binding_count(),
                });
            }
        }
    }

    tracing::info!("Room engine shutting down (engine channel closed)");
}
