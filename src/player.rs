//! Per-player bookkeeping

use crate::shape::Shape;
use serde::{Deserialize, Serialize};

/// Transient connection id; keys players inside a game
pub type PlayerId = String;

/// Stable user identity that survives reconnects
pub type Identity = String;

/// A player seated in a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub identity: Identity,
    pub color: String,
    pub score: u64,
    /// Always exactly two; slot order is stable across refills
    pub held_shapes: [Shape; 2],
}

impl Player {
    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id.clone(),
            color: self.color.clone(),
            score: self.score,
            held_shapes: self.held_shapes.clone(),
        }
    }

    pub fn snapshot(&self) -> PlayerStateSnapshot {
        PlayerStateSnapshot {
            color: self.color.clone(),
            score: self.score,
            held_shapes: self.held_shapes.clone(),
        }
    }
}

/// Roster entry for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub color: String,
    pub score: u64,
    pub held_shapes: [Shape; 2],
}

/// What a disconnecting player takes with them for a later reconnect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStateSnapshot {
    pub color: String,
    pub score: u64,
    pub held_shapes: [Shape; 2],
}
