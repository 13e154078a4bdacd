//! Storage interface for league state
//!
//! This module defines the storage collaborator the league core runs
//! against: plain CRUD reads and writes on `LeagueStore`, and an
//! explicit transaction object for the operations that must be atomic
//! (finalization and the replace-all group/match rewrites).

pub mod memory;

// Re-export commonly used types
pub use memory::InMemoryLeagueStore;

use crate::error::Result;
use crate::types::{
    Group, Match, MatchId, Player, PlayerId, RatingSnapshot, Session, SessionId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Trait for league storage operations
///
/// Implementations must guarantee that a `StoreTransaction` observes a
/// consistent snapshot and that its effects become visible atomically
/// on commit; readers never see a half-applied transaction.
#[async_trait]
pub trait LeagueStore: Send + Sync {
    /// Open a transaction. Dropping it without committing discards all
    /// staged effects.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    // Players
    async fn insert_player(&self, player: Player) -> Result<()>;
    async fn find_player(&self, player_id: &PlayerId) -> Result<Option<Player>>;
    /// All players ordered by registration time
    async fn list_players(&self) -> Result<Vec<Player>>;
    async fn set_player_active(&self, player_id: &PlayerId, active: bool) -> Result<Player>;

    // Sessions
    async fn insert_session(&self, session: Session) -> Result<()>;
    async fn find_session(&self, session_id: SessionId) -> Result<Option<Session>>;
    /// All sessions, newest first
    async fn list_sessions(&self) -> Result<Vec<Session>>;
    async fn set_session_active(&self, session_id: SessionId, active: bool) -> Result<Session>;

    // Attendance
    async fn set_attendance(
        &self,
        session_id: SessionId,
        player_id: &PlayerId,
        present: bool,
    ) -> Result<()>;
    /// Recorded attendance rows for a session; players without a row
    /// count as present
    async fn attendance(&self, session_id: SessionId) -> Result<HashMap<PlayerId, bool>>;

    // Groups and matches
    async fn list_groups(&self, session_id: SessionId) -> Result<Vec<Group>>;
    async fn find_match(&self, match_id: MatchId) -> Result<Option<Match>>;
    /// A session's matches in schedule order
    async fn list_matches(&self, session_id: SessionId) -> Result<Vec<Match>>;
    /// Record scores on an open match; finalized matches are immutable
    async fn update_match_scores(
        &self,
        match_id: MatchId,
        score1: i32,
        score2: i32,
    ) -> Result<Match>;

    // Audit trail
    async fn list_snapshots(&self, session_id: SessionId) -> Result<Vec<RatingSnapshot>>;
}

/// One atomic unit of work against the store
///
/// All writes stage until `commit`; `rollback` (or dropping the
/// transaction) leaves the store untouched, including any finalization
/// claim taken earlier in the same transaction.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Load a match with its team membership
    async fn find_match(&mut self, match_id: MatchId) -> Result<Option<Match>>;

    /// Conditionally set the finalization timestamp if it is currently
    /// null, returning the number of rows affected (0 means another
    /// caller won the race or the match does not exist).
    async fn claim_finalization(
        &mut self,
        match_id: MatchId,
        finalized_at: DateTime<Utc>,
    ) -> Result<u64>;

    /// Current ratings for the given players, read inside this
    /// transaction
    async fn player_ratings(&mut self, player_ids: &[PlayerId]) -> Result<HashMap<PlayerId, i32>>;

    async fn update_player_rating(&mut self, player_id: &PlayerId, rating: i32) -> Result<()>;

    async fn insert_snapshots(&mut self, snapshots: Vec<RatingSnapshot>) -> Result<()>;

    /// Delete all groups for the session and insert the given ones
    async fn replace_groups(&mut self, session_id: SessionId, groups: Vec<Group>) -> Result<()>;

    /// Delete all matches for the session and insert the given ones
    async fn replace_matches(&mut self, session_id: SessionId, matches: Vec<Match>) -> Result<()>;

    /// Make all staged writes visible atomically. Implementations over
    /// optimistic stores may fail with `LeagueError::TransactionConflict`;
    /// the whole operation is then safe to retry from scratch.
    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
