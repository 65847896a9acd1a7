//! Room coordination state machine.
//!
//! The coordinator owns the room store, the connection registry and the
//! transport. Every handler runs to completion before the next command is
//! looked at, so the owner runs it on a single task (see `server.rs`) and
//! no locking is needed here.
//!
//! Routing:
//! - `RoomView`, `GameStarted`, `RolesAssigned`: the room's group.
//! - `JoinRejected`, `CommandRejected`, `WhoAmIReply`, `StatusReply`: the
//!   requesting connection only.

use crate::config::GameConfig;
use crate::error::{Result, RoomError};

use super::registry::{Binding, ConnectionId, ConnectionRegistry};
use super::roles::{self, RoleSelector};
use super::room::{Room, RoomStatus};
use super::signaling::{ClientMessage, ServerMessage};
use super::store::RoomStore;
use super::transport::Transport;

pub struct Coordinator<T: Transport> {
    store: RoomStore,
    registry: ConnectionRegistry,
    selector: Box<dyn RoleSelector>,
    transport: T,
    settings: GameConfig,
}

impl<T: Transport> Coordinator<T> {
    pub fn new(transport: T, selector: Box<dyn RoleSelector>, settings: GameConfig) -> Self {
        Self {
            store: RoomStore::new(),
            registry: ConnectionRegistry::new(),
            selector,
            transport,
            settings,
        }
    }

    pub fn handle(&mut self, connection: ConnectionId, message: ClientMessage) -> Result<()> {
        match message {
            ClientMessage::Join { room_id, username } => self.join(connection, &room_id, &username),
            ClientMessage::RejoinForGame { room_id, username } => {
                self.rejoin_for_game(connection, &room_id, &username)
            }
            ClientMessage::Leave => {
                self.leave(connection);
                Ok(())
            }
            ClientMessage::StartGame { room_id } => self.start_game(&room_id),
            ClientMessage::Reshuffle { room_id } => self.reshuffle(connection, &room_id),
            ClientMessage::WhoAmI => {
                self.who_am_i(connection);
                Ok(())
            }
            ClientMessage::GetStatus { room_id } => {
                self.get_status(connection, &room_id);
                Ok(())
            }
        }
    }

    /// Lobby entry. Creates the room on first use; refused once the game
    /// has started.
    pub fn join(&mut self, connection: ConnectionId, room_id: &str, username: &str) -> Result<()> {
        if let Some(room) = self.store.get(room_id) {
            if room.status != RoomStatus::Lobby {
                let reason = format!("room {} is already {}", room_id, room.status);
                self.transport.to_connection(
                    connection,
                    &ServerMessage::JoinRejected {
                        room_id: room_id.to_string(),
                        reason: reason.clone(),
                    },
                );
                return Err(RoomError::JoinRejected {
                    room_id: room_id.to_string(),
                    reason,
                });
            }
        }

        self.release_stale_binding(connection, room_id, username);

        let (room, created) = self.store.get_or_create(room_id, username);
        if created {
            tracing::info!(room_id = %room_id, owner = %username, "Room created");
        }
        if room.add_participant(username) {
            tracing::info!(room_id = %room_id, username = %username, "Participant joined room");
        }

        self.bind(connection, room_id, username);
        self.broadcast_room_view(room_id);
        Ok(())
    }

    /// Re-attach from the game view. No status check, so it works after the
    /// game has started; roles are drawn again for the whole room.
    pub fn rejoin_for_game(&mut self, connection: ConnectionId, room_id: &str, username: &str) -> Result<()> {
        if !self.store.contains(room_id) {
            tracing::debug!(room_id = %room_id, "Rejoin for unknown room ignored");
            return Ok(());
        }

        self.release_stale_binding(connection, room_id, username);

        let Some(room) = self.store.get_mut(room_id) else {
            return Ok(());
        };
        if room.add_participant(username) {
            tracing::info!(room_id = %room_id, username = %username, "Participant rejoined room");
        }

        self.bind(connection, room_id, username);
        self.assign_roles(room_id);
        self.broadcast_room_view(room_id);
        Ok(())
    }

    /// Explicit leave. Unbound connections are ignored.
    pub fn leave(&mut self, connection: ConnectionId) {
        self.depart(connection, false);
    }

    /// Transport-initiated leave; also forgets the connection's channel.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        self.depart(connection, false);
        self.transport.detach(connection);
    }

    pub fn start_game(&mut self, room_id: &str) -> Result<()> {
        let Some(room) = self.store.get_mut(room_id) else {
            tracing::debug!(room_id = %room_id, "StartGame for unknown room ignored");
            return Ok(());
        };

        let restart = room.status == RoomStatus::Playing;
        room.status = RoomStatus::Playing;
        tracing::info!(room_id = %room_id, restart = restart, "Game started");

        self.transport.to_room(
            room_id,
            &ServerMessage::GameStarted {
                room_id: room_id.to_string(),
            },
        );

        if !restart || self.settings.reshuffle_on_restart {
            self.assign_roles(room_id);
        }
        Ok(())
    }

    /// Draw roles again for a room that is already playing.
    pub fn reshuffle(&mut self, connection: ConnectionId, room_id: &str) -> Result<()> {
        let Some(room) = self.store.get(room_id) else {
            tracing::debug!(room_id = %room_id, "Reshuffle for unknown room ignored");
            return Ok(());
        };

        if room.status != RoomStatus::Playing {
            let reason = format!("room {} is {}, roles can only be reshuffled while playing", room_id, room.status);
            self.transport.to_connection(
                connection,
                &ServerMessage::CommandRejected { reason: reason.clone() },
            );
            return Err(RoomError::CommandRejected(reason));
        }

        self.assign_roles(room_id);
        Ok(())
    }

    pub fn who_am_i(&self, connection: ConnectionId) {
        let username = self.registry.binding(connection).map(|b| b.username.clone());
        self.transport
            .to_connection(connection, &ServerMessage::WhoAmIReply { username });
    }

    pub fn get_status(&self, connection: ConnectionId, room_id: &str) {
        match self.store.get(room_id) {
            Some(room) => self
                .transport
                .to_connection(connection, &ServerMessage::status_reply(room)),
            None => tracing::debug!(room_id = %room_id, "Status requested for unknown room"),
        }
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.store.get(room_id)
    }

    pub fn binding(&self, connection: ConnectionId) -> Option<&Binding> {
        self.registry.binding(connection)
    }

    pub fn room_count(&self) -> usize {
        self.store.len()
    }

    pub fn binding_count(&self) -> usize {
        self.registry.len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn bind(&mut self, connection: ConnectionId, room_id: &str, username: &str) {
        self.registry.bind(connection, Binding::new(room_id, username));
        self.transport.join_group(connection, room_id);
    }

    /// A connection that switches to a different (room, username) leaves
    /// its old binding first. Switching username inside the same room swaps
    /// the participant in place: the room is neither evicted nor broadcast,
    /// the caller does that once the new participant is in.
    fn release_stale_binding(&mut self, connection: ConnectionId, room_id: &str, username: &str) {
        let Some(binding) = self.registry.binding(connection) else {
            return;
        };
        if binding.matches(room_id, username) {
            return;
        }

        let same_room = binding.room_id == room_id;
        tracing::debug!(connection = %connection, same_room, "Releasing previous binding before rebind");
        self.depart(connection, same_room);
    }

    /// Removes the connection's binding and its participant, with owner
    /// succession, broadcast and eviction. The departing connection leaves
    /// the room group before the new view goes out. A room is only evicted
    /// once it is empty and no other connection is still bound to it.
    fn depart(&mut self, connection: ConnectionId, rebinding_in_room: bool) -> Option<Binding> {
        let Some(binding) = self.registry.unbind(connection) else {
            tracing::debug!(connection = %connection, "Leave from unbound connection ignored");
            return None;
        };
        self.transport.leave_group(connection, &binding.room_id);

        let Some(room) = self.store.get_mut(&binding.room_id) else {
            return Some(binding);
        };

        let previous_owner = room.owner.clone();
        room.remove_participant(&binding.username);
        tracing::info!(
            room_id = %binding.room_id,
            username = %binding.username,
            remaining = room.len(),
            "Participant left room"
        );

        if room.owner != previous_owner {
            tracing::info!(
                room_id = %binding.room_id,
                owner = ?room.owner,
                "Room ownership passed"
            );
        }

        if rebinding_in_room {
            return Some(binding);
        }

        if !room.is_empty() {
            self.broadcast_room_view(&binding.room_id);
        } else if self.settings.evict_empty_rooms {
            if self.registry.is_room_bound(&binding.room_id) {
                tracing::debug!(room_id = %binding.room_id, "Empty room kept, connections still bound");
            } else {
                self.store.remove(&binding.room_id);
                tracing::info!(room_id = %binding.room_id, "Evicted empty room");
            }
        }

        Some(binding)
    }

    fn assign_roles(&mut self, room_id: &str) {
        let Some(room) = self.store.get_mut(room_id) else {
            return;
        };

        let Some(questioner) = roles::assign_roles(room, self.selector.as_mut()) else {
            return;
        };

        tracing::info!(room_id = %room_id, questioner = %questioner, "Roles assigned");
        let message = ServerMessage::roles_assigned(room);
        self.transport.to_room(room_id, &message);
    }

    fn broadcast_room_view(&self, room_id: &str) {
        if let Some(room) = self.store.get(room_id) {
            if !room.is_empty() {
                self.transport.to_room(room_id, &ServerMessage::room_view(room));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::roles::tests::FixedSelector;
    use crate::rooms::roles::RandomSelector;
    use crate::rooms::room::Role;
    use crate::rooms::transport::{ChannelHub, OutboundRx};
    use tokio::sync::mpsc;

    struct Harness {
        coordinator: Coordinator<ChannelHub>,
    }

    impl Harness {
        fn new(settings: GameConfig) -> Self {
            Self::with_selector(settings, Box::new(FixedSelector(0)))
        }

        fn with_selector(settings: GameConfig, selector: Box<dyn RoleSelector>) -> Self {
            Self {
                coordinator: Coordinator::new(ChannelHub::new(), selector, settings),
            }
        }

        fn connect(&mut self, id: u64) -> (ConnectionId, OutboundRx) {
            let (tx, rx) = mpsc::unbounded_channel();
            let connection = ConnectionId(id);
            self.coordinator.transport_mut().attach(connection, tx);
            (connection, rx)
        }
    }

    fn drain(rx: &mut OutboundRx) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn view(participants: &[&str], owner: Option<&str>) -> ServerMessage {
        ServerMessage::RoomView {
            room_id: "r1".to_string(),
            participants: participants.iter().map(|p| p.to_string()).collect(),
            owner: owner.map(str::to_string),
        }
    }

    fn started() -> ServerMessage {
        ServerMessage::GameStarted {
            room_id: "r1".to_string(),
        }
    }

    #[test]
    fn test_scenarios_a_through_e() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, mut alice_rx) = h.connect(1);
        let (bob, mut bob_rx) = h.connect(2);
        let (carol, mut carol_rx) = h.connect(3);

        // A
        h.coordinator.join(alice, "r1", "alice").unwrap();
        assert_eq!(drain(&mut alice_rx), vec![view(&["alice"], Some("alice"))]);

        h.coordinator.join(bob, "r1", "bob").unwrap();
        let expected = view(&["alice", "bob"], Some("alice"));
        assert_eq!(drain(&mut alice_rx), vec![expected.clone()]);
        assert_eq!(drain(&mut bob_rx), vec![expected]);

        // B
        h.coordinator.leave(alice);
        assert_eq!(drain(&mut bob_rx), vec![view(&["bob"], Some("bob"))]);
        assert!(drain(&mut alice_rx).is_empty());

        // C
        h.coordinator.start_game("r1").unwrap();
        let room = h.coordinator.room("r1").unwrap();
        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.role_of("bob"), Some(Role::Questioner));
        let messages = drain(&mut bob_rx);
        assert_eq!(messages[0], started());
        assert!(matches!(messages[1], ServerMessage::RolesAssigned { .. }));

        // D
        let err = h.coordinator.join(carol, "r1", "carol").unwrap_err();
        assert!(matches!(err, RoomError::JoinRejected { .. }));
        assert!(matches!(&drain(&mut carol_rx)[..], [ServerMessage::JoinRejected { .. }]));
        assert!(drain(&mut bob_rx).is_empty());
        assert_eq!(h.coordinator.room("r1").unwrap().usernames(), vec!["bob"]);
        assert!(h.coordinator.binding(carol).is_none());

        // E
        h.coordinator.get_status(carol, "r1");
        let reply = drain(&mut carol_rx);
        match &reply[..] {
            [ServerMessage::StatusReply { status, participants, owner, .. }] => {
                assert_eq!(*status, RoomStatus::Playing);
                assert_eq!(owner.as_deref(), Some("bob"));
                assert_eq!(participants.len(), 1);
                assert_eq!(participants[0].role, Role::Questioner);
            }
            other => panic!("unexpected reply {:?}", other),
        }
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[test]
    fn test_duplicate_join_is_idempotent() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, _rx) = h.connect(1);
        let (alice_tab, _rx2) = h.connect(2);

        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.join(alice_tab, "r1", "alice").unwrap();

        assert_eq!(h.coordinator.room("r1").unwrap().usernames(), vec!["alice"]);
    }

    #[test]
    fn test_leave_without_binding_is_noop() {
        let mut h = Harness::new(GameConfig::default());
        let (ghost, mut rx) = h.connect(1);

        h.coordinator.leave(ghost);
        h.coordinator.disconnect(ghost);

        assert!(drain(&mut rx).is_empty());
        assert_eq!(h.coordinator.room_count(), 0);
    }

    #[test]
    fn test_leave_then_disconnect_race_is_safe() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, _a) = h.connect(1);
        let (bob, mut bob_rx) = h.connect(2);
        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.join(bob, "r1", "bob").unwrap();
        drain(&mut bob_rx);

        h.coordinator.leave(alice);
        h.coordinator.disconnect(alice);

        assert_eq!(drain(&mut bob_rx), vec![view(&["bob"], Some("bob"))]);
    }

    #[test]
    fn test_disconnect_behaves_like_leave() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, _a) = h.connect(1);
        let (bob, mut bob_rx) = h.connect(2);
        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.join(bob, "r1", "bob").unwrap();
        drain(&mut bob_rx);

        h.coordinator.disconnect(alice);

        assert_eq!(drain(&mut bob_rx), vec![view(&["bob"], Some("bob"))]);
        assert_eq!(h.coordinator.transport().connection_count(), 1);
        assert_eq!(h.coordinator.transport().group_size("r1"), 1);
    }

    #[test]
    fn test_owner_stays_a_member() {
        let mut h = Harness::new(GameConfig::default());
        let names = ["alice", "bob", "carol", "dave"];
        let connections: Vec<_> = (0..names.len()).map(|i| h.connect(i as u64)).collect();
        for ((connection, _), name) in connections.iter().zip(names) {
            h.coordinator.join(*connection, "r1", name).unwrap();
        }

        for (i, (connection, _)) in connections.iter().enumerate() {
            h.coordinator.leave(*connection);
            match h.coordinator.room("r1") {
                Some(room) if !room.is_empty() => {
                    let owner = room.owner.as_deref().unwrap();
                    assert!(room.contains(owner));
                    assert_eq!(owner, names[i + 1]);
                }
                _ => assert_eq!(i, names.len() - 1),
            }
        }
    }

    #[test]
    fn test_empty_room_is_evicted() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, _rx) = h.connect(1);
        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.start_game("r1").unwrap();

        h.coordinator.leave(alice);
        assert!(h.coordinator.room("r1").is_none());

        // A fresh room with the same id is back in the lobby.
        h.coordinator.join(alice, "r1", "alice").unwrap();
        assert_eq!(h.coordinator.room("r1").unwrap().status, RoomStatus::Lobby);
    }

    #[test]
    fn test_empty_room_kept_without_eviction() {
        let settings = GameConfig {
            evict_empty_rooms: false,
            ..GameConfig::default()
        };
        let mut h = Harness::new(settings);
        let (alice, _a) = h.connect(1);
        let (bob, mut bob_rx) = h.connect(2);

        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.leave(alice);

        let room = h.coordinator.room("r1").unwrap();
        assert!(room.is_empty());
        assert!(room.owner.is_none());

        h.coordinator.join(bob, "r1", "bob").unwrap();
        assert_eq!(drain(&mut bob_rx), vec![view(&["bob"], Some("bob"))]);
    }

    #[test]
    fn test_room_kept_while_another_connection_is_bound() {
        let mut h = Harness::new(GameConfig::default());
        let (lobby, _l) = h.connect(1);
        let (game, mut game_rx) = h.connect(2);
        let (bob, _b) = h.connect(3);

        h.coordinator.join(lobby, "r1", "alice").unwrap();
        h.coordinator.rejoin_for_game(game, "r1", "alice").unwrap();
        h.coordinator.leave(lobby);

        assert!(h.coordinator.room("r1").unwrap().is_empty());
        assert!(h.coordinator.binding(game).unwrap().matches("r1", "alice"));

        drain(&mut game_rx);
        h.coordinator.join(bob, "r1", "bob").unwrap();
        assert_eq!(drain(&mut game_rx), vec![view(&["bob"], Some("bob"))]);

        h.coordinator.leave(bob);
        assert!(h.coordinator.room("r1").is_some());

        h.coordinator.disconnect(game);
        assert!(h.coordinator.room("r1").is_none());
        assert_eq!(h.coordinator.binding_count(), 0);
    }

    #[test]
    fn test_rejoin_under_new_name_keeps_sole_member_game() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, mut alice_rx) = h.connect(1);
        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.start_game("r1").unwrap();
        drain(&mut alice_rx);

        h.coordinator.rejoin_for_game(alice, "r1", "alicia").unwrap();

        let room = h.coordinator.room("r1").unwrap();
        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.usernames(), vec!["alicia"]);
        assert_eq!(room.owner.as_deref(), Some("alicia"));
        assert!(h.coordinator.binding(alice).unwrap().matches("r1", "alicia"));

        let messages = drain(&mut alice_rx);
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ServerMessage::RolesAssigned { .. }));
        assert_eq!(messages[1], view(&["alicia"], Some("alicia")));
    }

    #[test]
    fn test_rename_in_lobby_broadcasts_once() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, mut alice_rx) = h.connect(1);
        let (bob, mut bob_rx) = h.connect(2);
        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.join(bob, "r1", "bob").unwrap();
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        h.coordinator.join(alice, "r1", "alicia").unwrap();

        let expected = view(&["bob", "alicia"], Some("bob"));
        assert_eq!(drain(&mut bob_rx), vec![expected.clone()]);
        assert_eq!(drain(&mut alice_rx), vec![expected]);
    }

    #[test]
    fn test_rejected_join_keeps_existing_binding() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, _a) = h.connect(1);
        let (bob, _b) = h.connect(2);
        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.join(bob, "lobby", "bob").unwrap();
        h.coordinator.start_game("r1").unwrap();

        assert!(h.coordinator.join(bob, "r1", "bob").is_err());
        assert!(h.coordinator.binding(bob).unwrap().matches("lobby", "bob"));
    }

    #[test]
    fn test_switching_rooms_leaves_previous_room() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, mut alice_rx) = h.connect(1);
        let (bob, mut bob_rx) = h.connect(2);
        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.join(bob, "r1", "bob").unwrap();
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        h.coordinator.join(alice, "r2", "alice").unwrap();

        assert_eq!(drain(&mut bob_rx), vec![view(&["bob"], Some("bob"))]);
        assert!(matches!(
            &drain(&mut alice_rx)[..],
            [ServerMessage::RoomView { room_id, .. }] if room_id == "r2"
        ));
        assert_eq!(h.coordinator.binding_count(), 2);
    }

    #[test]
    fn test_rejoin_for_game_after_start() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, _a) = h.connect(1);
        let (viewer, mut viewer_rx) = h.connect(2);
        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.start_game("r1").unwrap();

        h.coordinator.rejoin_for_game(viewer, "r1", "carol").unwrap();

        let room = h.coordinator.room("r1").unwrap();
        assert_eq!(room.usernames(), vec!["alice", "carol"]);
        let messages = drain(&mut viewer_rx);
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ServerMessage::RolesAssigned { .. }));
        assert_eq!(messages[1], view(&["alice", "carol"], Some("alice")));
    }

    #[test]
    fn test_rejoin_for_unknown_room_is_ignored() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, mut rx) = h.connect(1);

        h.coordinator.rejoin_for_game(alice, "nowhere", "alice").unwrap();

        assert!(drain(&mut rx).is_empty());
        assert!(h.coordinator.binding(alice).is_none());
        assert_eq!(h.coordinator.room_count(), 0);
    }

    #[test]
    fn test_start_unknown_room_is_ignored() {
        let mut h = Harness::new(GameConfig::default());
        h.coordinator.start_game("nowhere").unwrap();
        assert_eq!(h.coordinator.room_count(), 0);
    }

    #[test]
    fn test_repeated_start_reshuffles_by_default() {
        let mut h = Harness::with_selector(GameConfig::default(), Box::new(RandomSelector::seeded(3)));
        let (alice, mut rx) = h.connect(1);
        let (bob, _b) = h.connect(2);
        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.join(bob, "r1", "bob").unwrap();
        h.coordinator.start_game("r1").unwrap();
        drain(&mut rx);

        h.coordinator.start_game("r1").unwrap();

        let messages = drain(&mut rx);
        assert_eq!(messages[0], started());
        assert!(matches!(messages[1], ServerMessage::RolesAssigned { .. }));
        assert!(h.coordinator.room("r1").unwrap().questioner().is_some());
    }

    #[test]
    fn test_repeated_start_keeps_roles_when_disabled() {
        let settings = GameConfig {
            reshuffle_on_restart: false,
            ..GameConfig::default()
        };
        let mut h = Harness::new(settings);
        let (alice, mut rx) = h.connect(1);
        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.start_game("r1").unwrap();
        drain(&mut rx);

        h.coordinator.start_game("r1").unwrap();

        assert_eq!(drain(&mut rx), vec![started()]);
        assert_eq!(h.coordinator.room("r1").unwrap().status, RoomStatus::Playing);
    }

    #[test]
    fn test_reshuffle_requires_playing() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, mut rx) = h.connect(1);
        h.coordinator.join(alice, "r1", "alice").unwrap();
        drain(&mut rx);

        let err = h.coordinator.reshuffle(alice, "r1").unwrap_err();
        assert!(matches!(err, RoomError::CommandRejected(_)));
        assert!(matches!(&drain(&mut rx)[..], [ServerMessage::CommandRejected { .. }]));
        assert!(h.coordinator.room("r1").unwrap().questioner().is_none());
    }

    #[test]
    fn test_reshuffle_while_playing() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, mut rx) = h.connect(1);
        let (bob, _b) = h.connect(2);
        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.join(bob, "r1", "bob").unwrap();
        h.coordinator.start_game("r1").unwrap();
        drain(&mut rx);

        h.coordinator.reshuffle(bob, "r1").unwrap();

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            ServerMessage::RolesAssigned { roles, .. } => {
                assert_eq!(roles.iter().filter(|r| r.role == Role::Questioner).count(), 1);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_who_am_i() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, mut rx) = h.connect(1);

        h.coordinator.who_am_i(alice);
        assert_eq!(drain(&mut rx), vec![ServerMessage::WhoAmIReply { username: None }]);

        h.coordinator.join(alice, "r1", "alice").unwrap();
        drain(&mut rx);
        h.coordinator.who_am_i(alice);
        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::WhoAmIReply {
                username: Some("alice".to_string())
            }]
        );
    }

    #[test]
    fn test_status_for_unknown_room_is_silent() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, mut rx) = h.connect(1);
        h.coordinator.get_status(alice, "nowhere");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_handle_dispatches_commands() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, mut rx) = h.connect(1);

        h.coordinator
            .handle(
                alice,
                ClientMessage::Join {
                    room_id: "r1".to_string(),
                    username: "alice".to_string(),
                },
            )
            .unwrap();
        h.coordinator
            .handle(alice, ClientMessage::StartGame { room_id: "r1".to_string() })
            .unwrap();
        h.coordinator.handle(alice, ClientMessage::Leave).unwrap();

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 3);
        assert!(h.coordinator.binding(alice).is_none());
    }

    #[test]
    fn test_broadcast_order_follows_command_order() {
        let mut h = Harness::new(GameConfig::default());
        let (alice, mut alice_rx) = h.connect(1);
        let (bob, _b) = h.connect(2);
        let (carol, _c) = h.connect(3);

        h.coordinator.join(alice, "r1", "alice").unwrap();
        h.coordinator.join(bob, "r1", "bob").unwrap();
        h.coordinator.join(carol, "r1", "carol").unwrap();
        h.coordinator.leave(bob);

        assert_eq!(
            drain(&mut alice_rx),
            vec![
                view(&["alice"], Some("alice")),
                view(&["alice", "bob"], Some("alice")),
                view(&["alice", "bob", "carol"], Some("alice")),
                view(&["alice", "carol"], Some("alice")),
            ]
        );
    }
}
