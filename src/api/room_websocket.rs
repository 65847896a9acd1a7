use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::error::RoomError;
use crate::rooms::{ClientMessage, ConnectionId, OutboundTx, RoomServer, ServerMessage};

pub async fn handle_room_websocket(websocket: WebSocket, room_server: RoomServer) {
    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection = match room_server.connect(tx.clone()) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!(error = %e, "Rejecting WebSocket connection");
            let _ = ws_sender.close().await;
            return;
        }
    };
    tracing::info!(connection = %connection, "New room WebSocket connection established");

    // Spawn task to send messages to client
    let sender_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize outbound message");
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(text)).await {
                tracing::error!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(message) => {
                if let Err(e) = handle_websocket_message(&room_server, connection, &tx, message) {
                    tracing::error!(connection = %connection, error = %e, "Error handling WebSocket message");
                    break;
                }
            }
            Err(e) => {
                tracing::error!(connection = %connection, error = %e, "WebSocket error");
                break;
            }
        }
    }

    if let Err(e) = room_server.disconnect(connection) {
        tracing::error!(connection = %connection, error = %e, "Failed to report disconnect");
    }
    sender_task.abort();
    tracing::info!(connection = %connection, "Room WebSocket connection closed");
}

/// Parses one frame and forwards it to the engine.
///
/// Malformed frames are answered on this connection only and never reach
/// the engine. Only a dead engine ends the connection.
fn handle_websocket_message(
    room_server: &RoomServer,
    connection: ConnectionId,
    tx: &OutboundTx,
    message: Message,
) -> Result<(), RoomError> {
    let Ok(text) = message.to_str() else {
        return Ok(());
    };
    tracing::debug!(connection = %connection, "Received room message: {}", text);

    match ClientMessage::parse(text) {
        Ok(client_message) => room_server.send(connection, client_message),
        Err(e) => {
            tracing::warn!(
                connection = %connection,
                error = %e,
                raw_message = %text,
                "Failed to parse room message"
            );
            let _ = tx.send(ServerMessage::Error {
                message: e.to_string(),
            });
            Ok(())
        }
    }
}
