//! Core game state and logic: one authoritative `Game` per room

use crate::error::GameError;
use crate::generator::ShapeGenerator;
use crate::grid::{Cell, Grid, GRID_HEIGHT, GRID_WIDTH};
use crate::matching::match_figure;
use crate::player::{Identity, Player, PlayerId, PlayerStateSnapshot, PlayerSummary};
use crate::score::{clear_name, placement_points};
use crate::shape::{Point, ShapeType};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    /// Accepting placements
    Active,
    /// Terminal until restart
    Over,
}

/// Toggle for a single tentative mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelAction {
    Add,
    Remove,
}

/// Per-room configuration fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameConfig {
    pub width: usize,
    pub height: usize,
    /// Whether drawn figures may match held shapes in any rotation
    pub rotateable: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
            rotateable: false,
        }
    }
}

/// Owned snapshot of a game, safe to hand to any number of observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub room_id: String,
    pub grid: Grid,
    pub players: Vec<Player>,
    pub game_over: bool,
    pub rotateable: bool,
}

/// What a successful figure placement did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementOutcome {
    /// Held slot that matched and was refilled
    pub slot: usize,
    pub placed: ShapeType,
    pub lines_cleared: u32,
    pub points: u64,
    pub game_over: bool,
}

/// Final score line of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub player_id: PlayerId,
    pub identity: Identity,
    pub score: u64,
}

/// Derived results of the current session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub room_id: String,
    pub duration: Duration,
    pub lines_cleared: u32,
    pub figures_placed: u32,
    /// Highest score first
    pub scores: Vec<FinalScore>,
}

impl GameResult {
    /// Identities sharing the top score
    pub fn winners(&self) -> Vec<&Identity> {
        let Some(best) = self.scores.first().map(|s| s.score) else {
            return Vec::new();
        };
        self.scores
            .iter()
            .filter(|s| s.score == best)
            .map(|s| &s.identity)
            .collect()
    }

    /// Format duration as MM:SS
    pub fn format_duration(&self) -> String {
        let total_secs = self.duration.as_secs();
        format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
    }
}

/// The main game struct
#[derive(Debug)]
pub struct Game {
    room_id: String,
    grid: Grid,
    /// Join order
    players: Vec<Player>,
    phase: GamePhase,
    rotateable: bool,
    generator: ShapeGenerator,
    start_time: Instant,
    lines_cleared: u32,
    figures_placed: u32,
    last_activity: Instant,
    /// Identity behind the most recent successful placement
    last_placed_by: Option<Identity>,
}

impl Game {
    /// Create a new game for a room
    pub fn new(room_id: impl Into<String>, config: GameConfig, now: Instant) -> Self {
        Self::with_seed(room_id, config, now, rand::random())
    }

    /// Create a new game with a fixed shape seed
    pub fn with_seed(room_id: impl Into<String>, config: GameConfig, now: Instant, seed: u64) -> Self {
        Self {
            room_id: room_id.into(),
            grid: Grid::new(config.width, config.height),
            players: Vec::new(),
            phase: GamePhase::Active,
            rotateable: config.rotateable,
            generator: ShapeGenerator::with_seed(seed),
            start_time: now,
            lines_cleared: 0,
            figures_placed: 0,
            last_activity: now,
            last_placed_by: None,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::Over
    }

    pub fn rotateable(&self) -> bool {
        self.rotateable
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_by_identity(&self, identity: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.identity == identity)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn last_placed_by(&self) -> Option<&Identity> {
        self.last_placed_by.as_ref()
    }

    /// Record activity for the inactivity sweep
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Seat a player. Re-adding the same connection is a no-op. A snapshot
    /// restores score and held shapes from an earlier disconnect.
    /// Returns whether state was restored.
    pub fn add_player(
        &mut self,
        id: &str,
        identity: &str,
        color: &str,
        snapshot: Option<PlayerStateSnapshot>,
    ) -> Result<bool, GameError> {
        if self.player(id).is_some() {
            return Ok(false);
        }
        if self.player_by_identity(identity).is_some() {
            return Err(GameError::DuplicateIdentity(identity.to_string()));
        }

        let restored = snapshot.is_some();
        let (score, held_shapes) = match snapshot {
            Some(snapshot) => (snapshot.score, snapshot.held_shapes),
            None => (0, self.generator.generate_pair()),
        };
        self.players.push(Player {
            id: id.to_string(),
            identity: identity.to_string(),
            color: color.to_string(),
            score,
            held_shapes,
        });
        debug!(room = %self.room_id, player = id, restored, "Player added");
        Ok(restored)
    }

    /// Remove a player, dropping their tentative marks. Solid cells stay.
    pub fn remove_player(&mut self, id: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        self.grid.clear_drawing(id);
        Some(self.players.remove(index))
    }

    /// Add or remove one tentative mark
    pub fn place_pixel(&mut self, id: &str, action: PixelAction, p: Point) -> Result<(), GameError> {
        self.ensure_active()?;
        let player = self
            .player(id)
            .ok_or_else(|| GameError::PlayerNotFound(id.to_string()))?;
        if !self.grid.in_bounds(p) {
            return Err(GameError::OutOfBounds { x: p.x, y: p.y });
        }

        match action {
            PixelAction::Add => {
                if !self.grid.is_claimable(p, id) {
                    return Err(GameError::InvalidMove);
                }
                let cell = Cell::drawing(id, &player.color);
                self.grid.set(p, Some(cell));
            }
            PixelAction::Remove => {
                if !self.grid.get(p).is_some_and(|c| c.is_drawing_of(id)) {
                    return Err(GameError::InvalidMove);
                }
                self.grid.set(p, None);
            }
        }
        Ok(())
    }

    /// Match the drawn pixels against the player's held shapes and commit them.
    ///
    /// Nothing committed changes on failure; the player's tentative marks are
    /// cleared so the client can redraw from a fresh state.
    pub fn place_figure(&mut self, id: &str, pixels: &[Point]) -> Result<PlacementOutcome, GameError> {
        self.ensure_active()?;
        let index = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| GameError::PlayerNotFound(id.to_string()))?;

        if let Some(p) = pixels.iter().find(|p| !self.grid.in_bounds(**p)) {
            let err = GameError::OutOfBounds { x: p.x, y: p.y };
            return Err(self.reject(id, err));
        }
        let Some(slot) = match_figure(pixels, &self.players[index].held_shapes, self.rotateable) else {
            return Err(self.reject(id, GameError::InvalidMove));
        };
        if !pixels.iter().all(|p| self.grid.is_claimable(*p, id)) {
            return Err(self.reject(id, GameError::InvalidMove));
        }

        let color = self.players[index].color.clone();
        self.grid.clear_drawing(id);
        self.grid.commit(pixels, id, &color);
        let lines_cleared = self.grid.clear_lines();
        let points = placement_points(lines_cleared);

        let player = &mut self.players[index];
        let placed = player.held_shapes[slot].shape_type;
        let mut exclude = vec![placed];
        exclude.extend(player.held_shapes.iter().map(|s| s.shape_type));
        player.held_shapes[slot] = self.generator.generate(&exclude);
        player.score += points;

        self.lines_cleared += lines_cleared;
        self.figures_placed += 1;
        self.last_placed_by = Some(player.identity.clone());
        debug!(
            room = %self.room_id,
            player = id,
            ?placed,
            lines = lines_cleared,
            clear = clear_name(lines_cleared),
            points,
            "Figure placed"
        );

        let game_over = self.check_game_over();
        Ok(PlacementOutcome {
            slot,
            placed,
            lines_cleared,
            points,
            game_over,
        })
    }

    /// Change a player's color. Tentative marks follow, committed cells keep theirs.
    pub fn update_player_color(&mut self, id: &str, color: &str) -> Result<(), GameError> {
        self.ensure_active()?;
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| GameError::PlayerNotFound(id.to_string()))?;
        player.color = color.to_string();
        self.grid.recolor_drawing(id, color);
        Ok(())
    }

    /// Owned snapshot of the whole game
    pub fn state(&self) -> GameState {
        GameState {
            room_id: self.room_id.clone(),
            grid: self.grid.clone(),
            players: self.players.clone(),
            game_over: self.is_over(),
            rotateable: self.rotateable,
        }
    }

    /// Roster summaries in join order
    pub fn players_list(&self) -> Vec<PlayerSummary> {
        self.players.iter().map(Player::summary).collect()
    }

    /// What a player would need to resume after a disconnect
    pub fn player_state(&self, id: &str) -> Option<PlayerStateSnapshot> {
        self.player(id).map(Player::snapshot)
    }

    /// Exhaustive scan: the game continues while any player can place any
    /// held shape, in its stored orientation, anywhere. Records the result.
    /// An empty roster never ends the game.
    pub fn check_game_over(&mut self) -> bool {
        if self.is_over() {
            return true;
        }
        if self.players.is_empty() {
            return false;
        }

        let any_move = self.players.iter().any(|player| {
            player
                .held_shapes
                .iter()
                .any(|shape| self.grid.can_place_anywhere(shape, &player.id))
        });
        if !any_move {
            self.phase = GamePhase::Over;
        }
        !any_move
    }

    /// Clear the board and counters, reset scores and deal new shapes
    pub fn restart(&mut self, now: Instant) {
        self.grid.clear();
        self.phase = GamePhase::Active;
        for player in self.players.iter_mut() {
            player.score = 0;
            player.held_shapes = self.generator.generate_pair();
        }
        self.start_time = now;
        self.lines_cleared = 0;
        self.figures_placed = 0;
        self.last_placed_by = None;
        self.last_activity = now;
    }

    /// Duration, counters and ranking of the session so far
    pub fn result(&self, now: Instant) -> GameResult {
        let mut scores: Vec<FinalScore> = self
            .players
            .iter()
            .map(|p| FinalScore {
                player_id: p.id.clone(),
                identity: p.identity.clone(),
                score: p.score,
            })
            .collect();
        scores.sort_by(|a, b| b.score.cmp(&a.score));

        GameResult {
            room_id: self.room_id.clone(),
            duration: now.saturating_duration_since(self.start_time),
            lines_cleared: self.lines_cleared,
            figures_placed: self.figures_placed,
            scores,
        }
    }

    fn ensure_active(&self) -> Result<(), GameError> {
        match self.phase {
            GamePhase::Active => Ok(()),
            GamePhase::Over => Err(GameError::GameOverViolation),
        }
    }

    /// Roll back a failed attempt
    fn reject(&mut self, id: &str, err: GameError) -> GameError {
        self.grid.clear_drawing(id);
        debug!(room = %self.room_id, player = id, error = %err, "Placement rejected");
        err
    }
}

#[cfg(test)]
impl Game {
    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub(crate) fn set_held_shapes(&mut self, id: &str, shapes: [crate::shape::Shape; 2]) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
            player.held_shapes = shapes;
        }
    }
}
