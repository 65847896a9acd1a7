use std::collections::HashMap;

use super::room::Room;

/// Room id → room state. Pure state; it never talks to connections.
#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: HashMap<String, Room>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// Returns the room, creating it owned by `creator` if it did not exist.
    /// The flag is true when the room was created by this call.
    pub fn get_or_create(&mut self, room_id: &str, creator: &str) -> (&mut Room, bool) {
        let mut created = false;
        let room = self.rooms.entry(room_id.to_string()).or_insert_with(|| {
            created = true;
            Room::new(room_id, creator)
        });
        (room, created)
    }

    pub fn remove(&mut self, room_id: &str) -> Option<Room> {
        self.rooms.remove(room_id)
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
