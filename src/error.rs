//! Error types for the league service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific league scenarios
#[derive(Debug, thiserror::Error)]
pub enum LeagueError {
    #[error("Invalid score: {reason}")]
    InvalidScore { reason: String },

    #[error("Not enough players: need {required}, have {available}")]
    InsufficientPlayers { required: usize, available: usize },

    #[error("Unsupported group size: {size} (groups must have 4-6 players)")]
    UnsupportedGroupSize { size: usize },

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: String },

    #[error("Match {match_id} must have both scores before finalizing")]
    MissingScores { match_id: String },

    #[error("Match already finalized: {match_id}")]
    AlreadyFinalized { match_id: String },

    #[error("Match {match_id} team {team} has {size} members, expected 2")]
    InvalidTeamSize {
        match_id: String,
        team: u8,
        size: usize,
    },

    #[error("Player {player_id} appears on both teams")]
    InvalidTeamComposition { player_id: String },

    #[error("No groups generated for session {session_id}")]
    GroupsNotGenerated { session_id: String },

    #[error("Invalid name: {reason}")]
    InvalidName { reason: String },

    #[error("Transaction conflict: {message}")]
    TransactionConflict { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
