//! Error types

use crate::player::{Identity, PlayerId};
use thiserror::Error;

/// Recoverable failures of game and room operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    /// The same stable identity is already seated in the room
    #[error("Identity already active in room: {0}")]
    DuplicateIdentity(Identity),

    /// Drawn pixels match no held shape, or collide
    #[error("Invalid move")]
    InvalidMove,

    #[error("Out of bounds: ({x}, {y})")]
    OutOfBounds { x: i32, y: i32 },

    /// Mutation attempted after game over; only restart is allowed
    #[error("Game is over")]
    GameOverViolation,
}

impl GameError {
    /// Routine rejected draws. The transport resynchronizes the requester
    /// instead of surfacing an error event.
    pub fn is_silent(&self) -> bool {
        matches!(self, GameError::InvalidMove | GameError::OutOfBounds { .. })
    }
}

/// Failures reported by the durable session store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Session not found: {0}")]
    SessionNotFound(u64),

    #[error("Session already completed: {0}")]
    Conflict(u64),
}

/// Failures loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}
