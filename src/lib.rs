//! GRIDLOCK - authoritative server for a shared-grid shape-drawing puzzle
//!
//! Players sketch pixels on a common grid, commit them as figures matching
//! one of their two held shapes, and clear full rows or columns toward the
//! center. The game ends when nobody can place anything.

pub mod error;
pub mod game;
pub mod generator;
pub mod grid;
pub mod matching;
pub mod persistence;
pub mod player;
pub mod protocol;
pub mod room;
pub mod score;
pub mod server;
pub mod settings;
pub mod shape;

pub use error::{GameError, PersistenceError, SettingsError};
pub use game::{Game, GameConfig, GameResult, GameState, PixelAction};
pub use persistence::{MemoryGateway, PersistenceGateway};
pub use room::{RoomManager, RoomPolicy};
pub use settings::Settings;
pub use shape::{Point, Shape, ShapeType};
