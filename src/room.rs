//! Room registry: live games, disconnect recovery and timed deletion
//!
//! Everything here is plain owned state. The host serializes all calls (one
//! event at a time), and every time-dependent call takes `now` so timers
//! fire as ordinary events rather than out-of-band mutations.

use crate::error::GameError;
use crate::game::{Game, GameConfig, GameResult, GameState, PixelAction};
use crate::grid::{GRID_HEIGHT, GRID_WIDTH};
use crate::persistence::{SessionId, SessionRecord};
use crate::player::{Identity, PlayerStateSnapshot, PlayerSummary};
use crate::shape::Point;
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub type RoomId = String;

/// Characters used in room codes (no 0/O or 1/I)
const ROOM_ID_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Timing and sizing rules for rooms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomPolicy {
    /// Delay before deleting an empty room whose grid has no solid cells
    pub empty_room_delay: Duration,
    /// Delay before deleting an empty room with committed progress
    pub progressed_room_delay: Duration,
    /// How long a disconnect snapshot can be recovered
    pub reconnect_window: Duration,
    /// Rooms idle this long are force-deleted by the sweep
    pub inactivity_threshold: Duration,
    pub sweep_interval: Duration,
    pub room_id_length: usize,
    pub grid_width: usize,
    pub grid_height: usize,
}

impl Default for RoomPolicy {
    fn default() -> Self {
        Self {
            empty_room_delay: Duration::from_secs(60),
            progressed_room_delay: Duration::from_secs(60 * 60),
            reconnect_window: Duration::from_secs(10 * 60),
            inactivity_threshold: Duration::from_secs(12 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            room_id_length: 6,
            grid_width: GRID_WIDTH,
            grid_height: GRID_HEIGHT,
        }
    }
}

/// A player's state parked after they dropped out of a running game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectSnapshot {
    pub room_id: RoomId,
    pub player: PlayerStateSnapshot,
    pub timestamp: Instant,
}

/// A pending room deletion. Only the latest token for a room is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionTimer {
    pub fire_at: Instant,
    pub token: u64,
}

/// Where a room is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomLifecycle {
    /// At least one member
    Active,
    /// No members, deletion scheduled
    PendingDeletion { fire_at: Instant },
    /// No members and nothing scheduled
    Empty,
}

/// Something room members should be told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    State(GameState),
    Players(Vec<PlayerSummary>),
    GameOver {
        session_id: SessionId,
        result: GameResult,
        finished_by: Option<Identity>,
    },
    Restarted(SessionRecord),
}

/// Reply to a successful create or join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub room_id: RoomId,
    pub state: GameState,
    pub players: Vec<PlayerSummary>,
    pub restored: bool,
    /// Set when a new durable session was opened
    pub session: Option<SessionRecord>,
}

/// What a leave did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Broadcast to whoever is still in the room
    pub events: Vec<RoomEvent>,
    pub snapshot_saved: bool,
    pub deletion: Option<DeletionTimer>,
}

/// Rooms removed or state expired by one maintenance pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub deleted_by_timer: Vec<RoomId>,
    pub swept: Vec<RoomId>,
    pub snapshots_expired: usize,
}

impl MaintenanceReport {
    pub fn is_empty(&self) -> bool {
        self.deleted_by_timer.is_empty() && self.swept.is_empty() && self.snapshots_expired == 0
    }
}

#[derive(Debug)]
struct RoomEntry {
    game: Game,
    session: SessionRecord,
    deletion: Option<DeletionTimer>,
}

/// Owns every live room. Constructed once by the host and passed by reference.
#[derive(Debug)]
pub struct RoomManager {
    policy: RoomPolicy,
    rooms: HashMap<RoomId, RoomEntry>,
    /// Keyed by stable identity, not connection
    disconnects: HashMap<Identity, DisconnectSnapshot>,
    next_token: u64,
    last_sweep: Instant,
}

impl RoomManager {
    pub fn new(policy: RoomPolicy, now: Instant) -> Self {
        Self {
            policy,
            rooms: HashMap::new(),
            disconnects: HashMap::new(),
            next_token: 1,
            last_sweep: now,
        }
    }

    pub fn policy(&self) -> &RoomPolicy {
        &self.policy
    }

    /// Create a room and seat its creator
    pub fn create_room(
        &mut self,
        conn: &str,
        identity: &str,
        color: &str,
        rotateable: bool,
        now: Instant,
    ) -> Result<JoinOutcome, GameError> {
        let room_id = self.generate_unique_room_id();
        let config = GameConfig {
            width: self.policy.grid_width,
            height: self.policy.grid_height,
            rotateable,
        };
        let mut game = Game::new(room_id.clone(), config, now);
        game.add_player(conn, identity, color, None)?;

        let session = new_session(&room_id, rotateable, Some(identity));
        let outcome = JoinOutcome {
            room_id: room_id.clone(),
            state: game.state(),
            players: game.players_list(),
            restored: false,
            session: Some(session.clone()),
        };
        self.rooms.insert(
            room_id.clone(),
            RoomEntry {
                game,
                session,
                deletion: None,
            },
        );
        info!(room = %room_id, identity, rotateable, "Room created");
        Ok(outcome)
    }

    /// Seat a player in an existing room, restoring a recent disconnect
    /// snapshot for the same room if one exists. Cancels pending deletion.
    pub fn join_room(
        &mut self,
        room_id: &str,
        conn: &str,
        identity: &str,
        color: &str,
        now: Instant,
    ) -> Result<JoinOutcome, GameError> {
        let entry = self
            .rooms
            .get(room_id)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
        if entry
            .game
            .player_by_identity(identity)
            .is_some_and(|p| p.id != conn)
        {
            return Err(GameError::DuplicateIdentity(identity.to_string()));
        }
        let seated = entry.game.player(conn).is_some();

        let snapshot = if seated {
            None
        } else {
            self.take_disconnect_snapshot(identity, room_id, now)
                .map(|s| s.player)
        };
        let Some(entry) = self.rooms.get_mut(room_id) else {
            return Err(GameError::RoomNotFound(room_id.to_string()));
        };
        let restored = entry.game.add_player(conn, identity, color, snapshot)?;
        entry.game.touch(now);
        if entry.deletion.take().is_some() {
            debug!(room = room_id, "Pending deletion cancelled by join");
        }

        info!(room = room_id, identity, restored, "Player joined");
        Ok(JoinOutcome {
            room_id: room_id.to_string(),
            state: entry.game.state(),
            players: entry.game.players_list(),
            restored,
            session: None,
        })
    }

    /// Remove a connection from a room. A player leaving a running game
    /// leaves a snapshot behind; the last one out schedules deletion.
    pub fn leave_room(&mut self, room_id: &str, conn: &str, now: Instant) -> Result<LeaveOutcome, GameError> {
        let entry = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
        let player = entry
            .game
            .player(conn)
            .cloned()
            .ok_or_else(|| GameError::PlayerNotFound(conn.to_string()))?;

        let snapshot_saved = !entry.game.is_over();
        entry.game.remove_player(conn);
        entry.game.touch(now);
        let events = vec![
            RoomEvent::State(entry.game.state()),
            RoomEvent::Players(entry.game.players_list()),
        ];
        let empty = entry.game.player_count() == 0;

        if snapshot_saved {
            self.disconnects.insert(
                player.identity.clone(),
                DisconnectSnapshot {
                    room_id: room_id.to_string(),
                    player: player.snapshot(),
                    timestamp: now,
                },
            );
        }
        let deletion = if empty {
            self.schedule_deletion(room_id, now)
        } else {
            None
        };

        info!(room = room_id, identity = %player.identity, snapshot_saved, empty, "Player left");
        Ok(LeaveOutcome {
            events,
            snapshot_saved,
            deletion,
        })
    }

    /// Toggle a tentative mark
    pub fn place_pixel(
        &mut self,
        room_id: &str,
        conn: &str,
        action: PixelAction,
        p: Point,
        now: Instant,
    ) -> Result<Vec<RoomEvent>, GameError> {
        let game = self.game_mut(room_id)?;
        game.touch(now);
        game.place_pixel(conn, action, p)?;
        Ok(vec![RoomEvent::State(game.state())])
    }

    /// Commit a drawn figure. On failure the caller should resend
    /// `state()` to the requester.
    pub fn place_figure(
        &mut self,
        room_id: &str,
        conn: &str,
        pixels: &[Point],
        now: Instant,
    ) -> Result<Vec<RoomEvent>, GameError> {
        let entry = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
        entry.game.touch(now);
        let outcome = entry.game.place_figure(conn, pixels)?;

        let mut events = vec![
            RoomEvent::State(entry.game.state()),
            RoomEvent::Players(entry.game.players_list()),
        ];
        if outcome.game_over {
            let result = entry.game.result(now);
            info!(
                room = room_id,
                duration = %result.format_duration(),
                lines = result.lines_cleared,
                figures = result.figures_placed,
                "Game over"
            );
            events.push(RoomEvent::GameOver {
                session_id: entry.session.session_id,
                result,
                finished_by: entry.game.last_placed_by().cloned(),
            });
        }
        Ok(events)
    }

    pub fn update_player_color(
        &mut self,
        room_id: &str,
        conn: &str,
        color: &str,
        now: Instant,
    ) -> Result<Vec<RoomEvent>, GameError> {
        let game = self.game_mut(room_id)?;
        game.touch(now);
        game.update_player_color(conn, color)?;
        Ok(vec![
            RoomEvent::State(game.state()),
            RoomEvent::Players(game.players_list()),
        ])
    }

    /// Reset the room's game and open a new session
    pub fn restart_game(&mut self, room_id: &str, conn: &str, now: Instant) -> Result<Vec<RoomEvent>, GameError> {
        let entry = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
        let identity = entry
            .game
            .player(conn)
            .map(|p| p.identity.clone())
            .ok_or_else(|| GameError::PlayerNotFound(conn.to_string()))?;

        entry.game.restart(now);
        entry.session = new_session(room_id, entry.game.rotateable(), Some(&identity));
        let events = vec![
            RoomEvent::State(entry.game.state()),
            RoomEvent::Players(entry.game.players_list()),
            RoomEvent::Restarted(entry.session.clone()),
        ];

        // Snapshots belong to the finished session
        let before = self.disconnects.len();
        self.disconnects.retain(|_, s| s.room_id != room_id);
        info!(
            room = room_id,
            identity = %identity,
            snapshots_dropped = before - self.disconnects.len(),
            "Game restarted"
        );
        Ok(events)
    }

    /// Current state of a room, for resynchronizing a client
    pub fn state(&self, room_id: &str) -> Result<GameState, GameError> {
        self.get(room_id)
            .map(Game::state)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))
    }

    pub fn get(&self, room_id: &str) -> Option<&Game> {
        self.rooms.get(room_id).map(|e| &e.game)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Game> {
        self.rooms.get_mut(room_id).map(|e| &mut e.game)
    }

    pub fn has(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Room ids, sorted
    pub fn list(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn session(&self, room_id: &str) -> Option<&SessionRecord> {
        self.rooms.get(room_id).map(|e| &e.session)
    }

    /// Evict a room immediately, dropping any pending timer with it
    pub fn delete(&mut self, room_id: &str) -> bool {
        let removed = self.rooms.remove(room_id).is_some();
        if removed {
            self.disconnects.retain(|_, s| s.room_id != room_id);
            info!(room = room_id, "Room deleted");
        }
        removed
    }

    pub fn touch(&mut self, room_id: &str, now: Instant) {
        if let Some(entry) = self.rooms.get_mut(room_id) {
            entry.game.touch(now);
        }
    }

    pub fn lifecycle(&self, room_id: &str) -> Option<RoomLifecycle> {
        let entry = self.rooms.get(room_id)?;
        Some(match (entry.game.player_count(), entry.deletion) {
            (n, _) if n > 0 => RoomLifecycle::Active,
            (_, Some(timer)) => RoomLifecycle::PendingDeletion { fire_at: timer.fire_at },
            (_, None) => RoomLifecycle::Empty,
        })
    }

    /// Schedule (or reschedule) deletion. Rooms with committed cells get the
    /// longer delay. Supersedes any earlier timer for the room.
    pub fn schedule_deletion(&mut self, room_id: &str, now: Instant) -> Option<DeletionTimer> {
        let token = self.next_token;
        let entry = self.rooms.get_mut(room_id)?;
        self.next_token += 1;

        let delay = if entry.game.grid().has_solid_cells() {
            self.policy.progressed_room_delay
        } else {
            self.policy.empty_room_delay
        };
        let timer = DeletionTimer {
            fire_at: now + delay,
            token,
        };
        entry.deletion = Some(timer);
        debug!(room = room_id, delay_secs = delay.as_secs(), token, "Deletion scheduled");
        Some(timer)
    }

    /// Cancel a pending deletion. Returns whether one was pending;
    /// cancelling twice, or after firing, is a no-op.
    pub fn cancel_deletion(&mut self, room_id: &str) -> bool {
        self.rooms
            .get_mut(room_id)
            .and_then(|e| e.deletion.take())
            .is_some()
    }

    pub fn pending_deletion(&self, room_id: &str) -> Option<DeletionTimer> {
        self.rooms.get(room_id)?.deletion
    }

    /// Fire one timer. Deletes only if `token` is still the live timer, it is
    /// due, and the room is still empty.
    pub fn fire_deletion(&mut self, room_id: &str, token: u64, now: Instant) -> bool {
        let Some(entry) = self.rooms.get(room_id) else {
            return false;
        };
        let due = entry
            .deletion
            .is_some_and(|t| t.token == token && now >= t.fire_at);
        if !due || entry.game.player_count() > 0 {
            return false;
        }
        self.delete(room_id)
    }

    /// Fire every due timer
    pub fn run_due_deletions(&mut self, now: Instant) -> Vec<RoomId> {
        let due: Vec<(RoomId, u64)> = self
            .rooms
            .iter()
            .filter_map(|(id, e)| {
                e.deletion
                    .filter(|t| now >= t.fire_at)
                    .map(|t| (id.clone(), t.token))
            })
            .collect();
        due.into_iter()
            .filter(|(id, token)| self.fire_deletion(id, *token, now))
            .map(|(id, _)| id)
            .collect()
    }

    /// Force-delete rooms idle for at least the inactivity threshold
    pub fn sweep_inactive(&mut self, now: Instant) -> Vec<RoomId> {
        let threshold = self.policy.inactivity_threshold;
        let stale: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.game.last_activity()) >= threshold)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            info!(room = %id, "Sweeping inactive room");
            self.delete(id);
        }
        self.last_sweep = now;
        stale
    }

    /// Park a snapshot for `identity`, replacing any older one
    pub fn record_disconnect(&mut self, identity: &str, snapshot: DisconnectSnapshot) {
        self.disconnects.insert(identity.to_string(), snapshot);
    }

    /// Look up a live snapshot; an expired one is purged and reported absent
    pub fn disconnect_snapshot(&mut self, identity: &str, now: Instant) -> Option<&DisconnectSnapshot> {
        let expired = self
            .disconnects
            .get(identity)
            .is_some_and(|s| self.is_expired(s, now));
        if expired {
            self.disconnects.remove(identity);
            return None;
        }
        self.disconnects.get(identity)
    }

    /// Consume the snapshot for `identity` if it is live and belongs to `room_id`
    pub fn take_disconnect_snapshot(
        &mut self,
        identity: &str,
        room_id: &str,
        now: Instant,
    ) -> Option<DisconnectSnapshot> {
        let matches = self.disconnect_snapshot(identity, now)?.room_id == room_id;
        if !matches {
            return None;
        }
        self.disconnects.remove(identity)
    }

    /// Drop every expired snapshot, returning how many went
    pub fn purge_expired_snapshots(&mut self, now: Instant) -> usize {
        let window = self.policy.reconnect_window;
        let before = self.disconnects.len();
        self.disconnects
            .retain(|_, s| now.saturating_duration_since(s.timestamp) < window);
        before - self.disconnects.len()
    }

    /// One maintenance pass: due deletions, snapshot expiry, and the
    /// inactivity sweep once per sweep interval
    pub fn tick(&mut self, now: Instant) -> MaintenanceReport {
        let deleted_by_timer = self.run_due_deletions(now);
        let snapshots_expired = self.purge_expired_snapshots(now);
        let swept = if now.saturating_duration_since(self.last_sweep) >= self.policy.sweep_interval {
            self.sweep_inactive(now)
        } else {
            Vec::new()
        };
        MaintenanceReport {
            deleted_by_timer,
            swept,
            snapshots_expired,
        }
    }

    fn is_expired(&self, snapshot: &DisconnectSnapshot, now: Instant) -> bool {
        now.saturating_duration_since(snapshot.timestamp) >= self.policy.reconnect_window
    }

    fn game_mut(&mut self, room_id: &str) -> Result<&mut Game, GameError> {
        self.get_mut(room_id)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))
    }

    /// Generate a room code, retrying on collision
    fn generate_unique_room_id(&self) -> RoomId {
        loop {
            let id = generate_room_id(self.policy.room_id_length);
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Random uppercase room code
pub fn generate_room_id(len: usize) -> RoomId {
    let mut rng = thread_rng();
    (0..len.max(1))
        .map(|_| *ROOM_ID_CHARS.choose(&mut rng).unwrap_or(&b'A') as char)
        .collect()
}

fn new_session(room_id: &str, rotateable: bool, started_by: Option<&str>) -> SessionRecord {
    SessionRecord {
        session_id: rand::random(),
        room_id: room_id.to_string(),
        rotateable,
        started_by: started_by.map(str::to_string),
    }
}
