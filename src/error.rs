use thiserror::Error;

/// Error types for the room server
#[derive(Debug, Error)]
pub enum RoomError {
    /// Command rejections, reported to the originating connection only
    #[error("Join to room {room_id} rejected: {reason}")]
    JoinRejected { room_id: String, reason: String },

    #[error("Command rejected: {0}")]
    CommandRejected(String),

    /// Boundary errors
    #[error("Invalid client message: {0}")]
    InvalidMessage(String),

    #[error("Failed to serialize message: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The engine task is gone and can no longer accept requests
    #[error("Room engine is not running")]
    EngineUnavailable,
}

/// Convenience type alias for Results using RoomError
pub type Result<T> = std::result::Result<T, RoomError>;

impl RoomError {
    /// Helper to create boundary errors with context
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        RoomError::InvalidMessage(msg.into())
    }

    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        RoomError::InvalidConfiguration(msg.into())
    }

    /// True for errors that are an expected outcome of a client command
    /// rather than a server fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RoomError::JoinRejected { .. } | RoomError::CommandRejected(_) | RoomError::InvalidMessage(_)
        )
    }
}
