//! Wire messages between clients and the server
//!
//! Framing: each message is a 4-byte big-endian length followed by that many
//! bytes of JSON. Messages are internally tagged by `type`.

use crate::error::GameError;
use crate::game::{GameResult, GameState, PixelAction};
use crate::player::PlayerSummary;
use crate::room::RoomEvent;
use crate::shape::Point;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reject frames larger than 1MB
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Events a client sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Declare the stable identity for this connection
    Hello { identity: String },
    CreateRoom {
        color: String,
        #[serde(default)]
        rotateable: bool,
    },
    JoinRoom { room_id: String, color: String },
    LeaveRoom { room_id: String },
    /// `status` 1 adds a tentative mark, 0 removes it
    PlacePixel { room_id: String, status: u8, pixel: Point },
    PlaceFigure { room_id: String, pixels: Vec<Point> },
    UpdatePlayerColor { room_id: String, color: String },
    RestartGame { room_id: String },
    GetRooms,
}

/// Error categories surfaced to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RoomNotFound,
    PlayerNotFound,
    DuplicateIdentity,
    InvalidMove,
    OutOfBounds,
    GameOverViolation,
    BadRequest,
}

impl From<&GameError> for ErrorKind {
    fn from(err: &GameError) -> Self {
        match err {
            GameError::RoomNotFound(_) => ErrorKind::RoomNotFound,
            GameError::PlayerNotFound(_) => ErrorKind::PlayerNotFound,
            GameError::DuplicateIdentity(_) => ErrorKind::DuplicateIdentity,
            GameError::InvalidMove => ErrorKind::InvalidMove,
            GameError::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            GameError::GameOverViolation => ErrorKind::GameOverViolation,
        }
    }
}

/// Messages the server sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        player_id: String,
        identity: String,
    },
    RoomCreated {
        room_id: String,
        state: GameState,
        players: Vec<PlayerSummary>,
    },
    RoomJoined {
        room_id: String,
        state: GameState,
        players: Vec<PlayerSummary>,
        restored: bool,
    },
    State {
        state: GameState,
    },
    Players {
        players: Vec<PlayerSummary>,
    },
    GameOver {
        result: GameResult,
    },
    GameRestarted {
        room_id: String,
    },
    Rooms {
        rooms: Vec<String>,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(err: &GameError) -> Self {
        ServerMessage::Error {
            kind: err.into(),
            message: err.to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            kind: ErrorKind::BadRequest,
            message: message.into(),
        }
    }
}

impl From<RoomEvent> for ServerMessage {
    fn from(event: RoomEvent) -> Self {
        match event {
            RoomEvent::State(state) => ServerMessage::State { state },
            RoomEvent::Players(players) => ServerMessage::Players { players },
            RoomEvent::GameOver { result, .. } => ServerMessage::GameOver { result },
            RoomEvent::Restarted(record) => ServerMessage::GameRestarted {
                room_id: record.room_id,
            },
        }
    }
}

/// Map the `place_pixel` status flag
pub fn pixel_action(status: u8) -> Option<PixelAction> {
    match status {
        1 => Some(PixelAction::Add),
        0 => Some(PixelAction::Remove),
        _ => None,
    }
}

/// Encode a message with its length prefix
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>, serde_json::Error> {
    let json = serde_json::to_vec(msg)?;
    let len = json.len() as u32;
    let mut data = len.to_be_bytes().to_vec();
    data.extend(json);
    Ok(data)
}

pub fn decode_message<T: DeserializeOwned>(frame: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(frame)
}

/// Read one length-prefixed frame. `Ok(None)` on clean end of stream.
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Ok(Some(data))
}

/// Encode and write one message
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let data = encode_message(msg).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(&data).await
}
