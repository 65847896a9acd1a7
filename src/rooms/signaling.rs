use serde::{Deserialize, Serialize};

use super::room::{RoleEntry, Room, RoomStatus};
use crate::error::{Result, RoomError};

/// Commands a client sends over its WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    Join {
        room_id: String,
        username: String,
    },

    /// Re-attach to a known room from the game view; allowed after start.
    RejoinForGame {
        room_id: String,
        username: String,
    },

    Leave,

    StartGame {
        room_id: String,
    },

    /// Re-run role assignment for a room that is already playing.
    Reshuffle {
        room_id: String,
    },

    WhoAmI,

    GetStatus {
        room_id: String,
    },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self> {
        let message: ClientMessage = serde_json::from_str(text)?;
        message.validate()?;
        Ok(message)
    }

    /// Rejects empty identifiers before the command reaches the engine.
    pub fn validate(&self) -> Result<()> {
        match self {
            ClientMessage::Join { room_id, username }
            | ClientMessage::RejoinForGame { room_id, username } => {
                require_non_empty("room_id", room_id)?;
                require_non_empty("username", username)
            }
            ClientMessage::StartGame { room_id }
            | ClientMessage::Reshuffle { room_id }
            | ClientMessage::GetStatus { room_id } => require_non_empty("room_id", room_id),
            ClientMessage::Leave | ClientMessage::WhoAmI => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "Join",
            ClientMessage::RejoinForGame { .. } => "RejoinForGame",
            ClientMessage::Leave => "Leave",
            ClientMessage::StartGame { .. } => "StartGame",
            ClientMessage::Reshuffle { .. } => "Reshuffle",
            ClientMessage::WhoAmI => "WhoAmI",
            ClientMessage::GetStatus { .. } => "GetStatus",
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RoomError::invalid_message(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Views and replies the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    RoomView {
        room_id: String,
        participants: Vec<String>,
        owner: Option<String>,
    },

    JoinRejected {
        room_id: String,
        reason: String,
    },

    GameStarted {
        room_id: String,
    },

    RolesAssigned {
        room_id: String,
        roles: Vec<RoleEntry>,
    },

    WhoAmIReply {
        username: Option<String>,
    },

    StatusReply {
        room_id: String,
        status: RoomStatus,
        owner: Option<String>,
        participants: Vec<RoleEntry>,
    },

    CommandRejected {
        reason: String,
    },

    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn room_view(room: &Room) -> Self {
        ServerMessage::RoomView {
            room_id: room.id.clone(),
            participants: room.usernames(),
            owner: room.owner.clone(),
        }
    }

    pub fn roles_assigned(room: &Room) -> Self {
        ServerMessage::RolesAssigned {
            room_id: room.id.clone(),
            roles: room.roles(),
        }
    }

    pub fn status_reply(room: &Room) -> Self {
        ServerMessage::StatusReply {
            room_id: room.id.clone(),
            status: room.status,
            owner: room.owner.clone(),
            participants: room.roles(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
