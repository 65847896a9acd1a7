mod engine;
mod registry;
mod roles;
mod room;
mod server;
mod signaling;
mod store;
mod transport;

pub use engine::Coordinator;
pub use registry::{Binding, ConnectionId, ConnectionRegistry};
pub use roles::{assign_roles, RandomSelector, RoleSelector};
pub use room::{Participant, Role, RoleEntry, Room, RoomStatus};
pub use server::{EngineRequest, RoomServer, ServerStats};
pub use signaling::{ClientMessage, ServerMessage};
pub use store::RoomStore;
pub use transport::{ChannelHub, OutboundRx, OutboundTx, Transport};
