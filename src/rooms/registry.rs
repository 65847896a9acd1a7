use std::collections::HashMap;
use std::fmt;

/// Identifier for a live transport connection.
///
/// Opaque; unique over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The (room, username) a connection currently represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub room_id: String,
    pub username: String,
}

impl Binding {
    pub fn new(room_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            username: username.into(),
        }
    }

    pub fn matches(&self, room_id: &str, username: &str) -> bool {
        self.room_id == room_id && self.username == username
    }
}

/// Maps each connection to at most one binding.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    bindings: HashMap<ConnectionId, Binding>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a connection, returning the binding it replaced.
    pub fn bind(&mut self, connection: ConnectionId, binding: Binding) -> Option<Binding> {
        self.bindings.insert(connection, binding)
    }

    pub fn unbind(&mut self, connection: ConnectionId) -> Option<Binding> {
        self.bindings.remove(&connection)
    }

    pub fn binding(&self, connection: ConnectionId) -> Option<&Binding> {
        self.bindings.get(&connection)
    }

    /// True while any connection is bound to `room_id`.
    pub fn is_room_bound(&self, room_id: &str) -> bool {
        self.bindings.values().any(|b| b.room_id == room_id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
