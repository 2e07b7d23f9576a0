//! Boundary to the durable session store
//!
//! The core never calls the gateway itself. The host calls it after a core
//! operation returns, so a slow store cannot stall a room.

use crate::error::PersistenceError;
use crate::game::{FinalScore, GameResult};
use crate::player::Identity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

pub type SessionId = u64;

/// A newly opened session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub room_id: String,
    pub rotateable: bool,
    pub started_by: Option<Identity>,
}

/// Per-player aggregate change at session end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsUpdate {
    pub identity: Identity,
    pub score: u64,
    pub won: bool,
}

/// What gets stored for a finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub room_id: String,
    pub duration_secs: u64,
    pub lines_cleared: u32,
    pub figures_placed: u32,
    pub final_scores: Vec<FinalScore>,
}

impl SessionSummary {
    pub fn from_result(result: &GameResult) -> Self {
        Self {
            room_id: result.room_id.clone(),
            duration_secs: result.duration.as_secs(),
            lines_cleared: result.lines_cleared,
            figures_placed: result.figures_placed,
            final_scores: result.scores.clone(),
        }
    }
}

/// One update per ranked player; everyone on the top score wins
pub fn stats_updates(result: &GameResult) -> Vec<StatsUpdate> {
    let winners = result.winners();
    result
        .scores
        .iter()
        .map(|s| StatsUpdate {
            identity: s.identity.clone(),
            score: s.score,
            won: winners.contains(&&s.identity),
        })
        .collect()
}

/// Durable store operations the engine needs. Implementations handle their
/// own atomicity and retries.
pub trait PersistenceGateway: Send + Sync {
    fn create_session(&self, record: SessionRecord) -> Result<(), PersistenceError>;

    /// Close a session and fold its results into per-player aggregates
    fn complete_session_with_stats_update(
        &self,
        session_id: SessionId,
        updates: &[StatsUpdate],
        identity: Option<&str>,
        summary: &SessionSummary,
    ) -> Result<(), PersistenceError>;
}

/// Aggregate statistics for one identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub games_played: u32,
    pub games_won: u32,
    pub total_score: u64,
    pub best_score: u64,
}

#[derive(Debug, Clone)]
struct StoredSession {
    record: SessionRecord,
    summary: Option<SessionSummary>,
    finished_by: Option<Identity>,
}

/// In-process store, used by the server binary and tests
#[derive(Debug, Default)]
pub struct MemoryGateway {
    sessions: Mutex<HashMap<SessionId, StoredSession>>,
    stats: Mutex<HashMap<Identity, PlayerStats>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self, identity: &str) -> Option<PlayerStats> {
        self.stats.lock().ok()?.get(identity).cloned()
    }

    pub fn summary(&self, session_id: SessionId) -> Option<SessionSummary> {
        self.sessions.lock().ok()?.get(&session_id)?.summary.clone()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn finished_by(&self, session_id: SessionId) -> Option<Identity> {
        self.sessions.lock().ok()?.get(&session_id)?.finished_by.clone()
    }

    pub fn record(&self, session_id: SessionId) -> Option<SessionRecord> {
        Some(self.sessions.lock().ok()?.get(&session_id)?.record.clone())
    }
}

fn poisoned<T>(_: T) -> PersistenceError {
    PersistenceError::Unavailable("lock poisoned".to_string())
}

impl PersistenceGateway for MemoryGateway {
    fn create_session(&self, record: SessionRecord) -> Result<(), PersistenceError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        sessions.insert(
            record.session_id,
            StoredSession {
                record,
                summary: None,
                finished_by: None,
            },
        );
        Ok(())
    }

    fn complete_session_with_stats_update(
        &self,
        session_id: SessionId,
        updates: &[StatsUpdate],
        identity: Option<&str>,
        summary: &SessionSummary,
    ) -> Result<(), PersistenceError> {
        // Both locks held so a session and its stats change together
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        let mut stats = self.stats.lock().map_err(poisoned)?;

        let session = sessions
            .get_mut(&session_id)
            .ok_or(PersistenceError::SessionNotFound(session_id))?;
        if session.summary.is_some() {
            return Err(PersistenceError::Conflict(session_id));
        }
        session.summary = Some(summary.clone());
        session.finished_by = identity.map(str::to_string);

        for update in updates {
            let entry = stats.entry(update.identity.clone()).or_default();
            entry.games_played += 1;
            if update.won {
                entry.games_won += 1;
            }
            entry.total_score += update.score;
            entry.best_score = entry.best_score.max(update.score);
        }
        Ok(())
    }
}
