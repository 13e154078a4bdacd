//! Common types used throughout the league service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for players
pub type PlayerId = String;

/// Unique identifier for sessions
pub type SessionId = Uuid;

/// Unique identifier for groups
pub type GroupId = Uuid;

/// Unique identifier for matches
pub type MatchId = Uuid;

/// Which side of the net a match member plays on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    One,
    Two,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::One => Team::Two,
            Team::Two => Team::One,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Team::One => 1,
            Team::Two => 2,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// A registered league player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub rating: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// The slice of a player the pure algorithms care about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedPlayer {
    pub id: PlayerId,
    pub rating: i32,
}

impl From<&Player> for RatedPlayer {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            rating: player.rating,
        }
    }
}

/// A dated league event owning attendance, groups and matches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub date: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// One player's membership in a group, with 1-based seating position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub player_id: PlayerId,
    pub position: u32,
}

/// An ordered partition of present players for one session
///
/// Groups are replaced wholesale when generation runs again for the
/// same session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub session_id: SessionId,
    pub label: String,
    pub members: Vec<GroupMember>,
}

/// One player's slot in a match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchMember {
    pub player_id: PlayerId,
    pub team: Team,
}

/// A doubles match between two 2-player teams
///
/// `finalized_at` is one-way: once set, scores and membership are
/// immutable and rating effects have been applied exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub session_id: SessionId,
    pub round: u32,
    pub members: Vec<MatchMember>,
    pub score1: Option<i32>,
    pub score2: Option<i32>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Player ids on the given team, in stored order
    pub fn team_members(&self, team: Team) -> Vec<&MatchMember> {
        self.members.iter().filter(|m| m.team == team).collect()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized_at.is_some()
    }
}

/// Immutable audit record of one player's rating change in one match
///
/// `delta` is the raw engine output; `after` is floor-clamped, so
/// `after` may differ from `before + delta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub session_id: SessionId,
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub before: i32,
    pub after: i32,
    pub delta: i32,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful finalization
///
/// Deltas are raw (pre-clamp) per-player rating changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeOutcome {
    pub match_id: MatchId,
    pub session_id: SessionId,
    pub deltas: HashMap<PlayerId, i32>,
}

/// One row of a session's attendance sheet
///
/// Players with no attendance record count as present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player: Player,
    pub present: bool,
}
