use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    #[default]
    Lobby,
    Playing,
    /// Reserved; no command currently moves a room here.
    Finished,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomStatus::Lobby => write!(f, "lobby"),
            RoomStatus::Playing => write!(f, "playing"),
            RoomStatus::Finished => write!(f, "finished"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Answerer,
    Questioner,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub username: String,
    pub role: Role,
    /// Unused by the current game flow.
    pub score: Option<u32>,
}

impl Participant {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: Role::Answerer,
            score: None,
        }
    }
}

/// A participant's role as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub username: String,
    pub role: Role,
}

/// Authoritative state of one room.
///
/// Participants are kept in join order, which is also the order used for
/// ownership succession and role selection.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub status: RoomStatus,
    pub owner: Option<String>,
    participants: Vec<Participant>,
    pub created_at: SystemTime,
}

impl Room {
    pub fn new(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: RoomStatus::Lobby,
            owner: Some(owner.into()),
            participants: Vec::new(),
            created_at: SystemTime::now(),
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub(crate) fn participants_mut(&mut self) -> &mut [Participant] {
        &mut self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.participants.iter().any(|p| p.username == username)
    }

    /// Adds a participant, returning false if the username was already present.
    ///
    /// An ownerless room is claimed by whoever joins it.
    pub fn add_participant(&mut self, username: &str) -> bool {
        if self.owner.is_none() {
            self.owner = Some(username.to_string());
        }

        if self.contains(username) {
            return false;
        }

        self.participants.push(Participant::new(username));
        true
    }

    /// Removes a participant and hands ownership to the earliest remaining
    /// participant if the owner left.
    pub fn remove_participant(&mut self, username: &str) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.username == username)?;
        let removed = self.participants.remove(index);

        if self.owner.as_deref() == Some(username) {
            self.owner = self.participants.first().map(|p| p.username.clone());
        }

        Some(removed)
    }

    pub fn usernames(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.username.clone()).collect()
    }

    pub fn roles(&self) -> Vec<RoleEntry> {
        self.participants
            .iter()
            .map(|p| RoleEntry {
                username: p.username.clone(),
                role: p.role,
            })
            .collect()
    }

    pub fn role_of(&self, username: &str) -> Option<Role> {
        self.participants
            .iter()
            .find(|p| p.username == username)
            .map(|p| p.role)
    }

    pub fn questioner(&self) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.role == Role::Questioner)
            .map(|p| p.username.as_str())
    }

    pub fn is_owner(&self, username: &str) -> bool {
        self.owner.as_deref() == Some(username)
    }
}
