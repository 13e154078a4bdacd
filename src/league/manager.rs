//! League manager implementation
//!
//! This module provides the core LeagueManager that orchestrates player
//! registration, sessions and attendance, group generation, match
//! scheduling, score entry and finalization against the storage
//! collaborator.

use crate::config::{GroupingConfig, RatingConfig};
use crate::error::LeagueError;
use crate::grouping::partition;
use crate::league::finalize::FinalizationCoordinator;
use crate::metrics::MetricsCollector;
use crate::rating::DoublesEloEngine;
use crate::scheduling::round_robin_doubles;
use crate::storage::LeagueStore;
use crate::types::{
    FinalizeOutcome, Group, GroupMember, Match, MatchId, MatchMember, Player, PlayerId,
    RatedPlayer, RatingSnapshot, RosterEntry, Session, SessionId, Team,
};
use crate::utils::{
    current_timestamp, generate_group_id, generate_match_id, generate_player_id,
    generate_session_id, normalize_session_date,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Statistics about league manager operations
#[derive(Debug, Clone, Default)]
pub struct LeagueManagerStats {
    /// Total number of players registered
    pub players_registered: u64,
    /// Total number of sessions created
    pub sessions_created: u64,
    /// Total number of groups written by generation
    pub groups_generated: u64,
    /// Total number of matches written by the scheduler
    pub matches_scheduled: u64,
    /// Total number of matches finalized
    pub matches_finalized: u64,
}

/// The main league manager
#[derive(Clone)]
pub struct LeagueManager {
    /// Storage collaborator shared with the coordinator
    store: Arc<dyn LeagueStore>,
    /// Finalization coordinator for applying match results
    coordinator: Arc<FinalizationCoordinator>,
    /// Rating settings (initial rating, floor, score cap)
    rating_config: RatingConfig,
    /// Grouping settings (partition strategy)
    grouping_config: GroupingConfig,
    /// Manager statistics
    stats: Arc<RwLock<LeagueManagerStats>>,
    /// Metrics collector for recording performance data
    metrics_collector: Arc<MetricsCollector>,
}

impl LeagueManager {
    /// Create a new league manager with default configuration
    pub fn new(store: Arc<dyn LeagueStore>) -> Self {
        Self::with_config(store, RatingConfig::default(), GroupingConfig::default())
    }

    /// Create a new league manager with explicit configuration
    pub fn with_config(
        store: Arc<dyn LeagueStore>,
        rating_config: RatingConfig,
        grouping_config: GroupingConfig,
    ) -> Self {
        // Create a default metrics collector if none provided
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));

        Self::with_metrics(store, rating_config, grouping_config, metrics_collector)
    }

    /// Create a new league manager with metrics collector
    pub fn with_metrics(
        store: Arc<dyn LeagueStore>,
        rating_config: RatingConfig,
        grouping_config: GroupingConfig,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        let engine = DoublesEloEngine::new(rating_config.engine_config())
            .expect("Failed to create rating engine");
        let coordinator = Arc::new(FinalizationCoordinator::new(
            store.clone(),
            engine,
            rating_config.rating_floor,
        ));

        Self {
            store,
            coordinator,
            rating_config,
            grouping_config,
            stats: Arc::new(RwLock::new(LeagueManagerStats::default())),
            metrics_collector,
        }
    }

    /// Register a new player, defaulting the rating if none is given
    pub async fn register_player(
        &self,
        name: &str,
        rating: Option<i32>,
    ) -> crate::error::Result<Player> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(LeagueError::InvalidName {
                reason: "player name is required".to_string(),
            }
            .into());
        }
        if trimmed.len() > 80 {
            return Err(LeagueError::InvalidName {
                reason: format!("player name too long ({} chars, max 80)", trimmed.len()),
            }
            .into());
        }

        let player = Player {
            id: generate_player_id(),
            name: trimmed.to_string(),
            rating: rating.unwrap_or(self.rating_config.initial_rating),
            active: true,
            created_at: current_timestamp(),
        };

        self.store.insert_player(player.clone()).await?;
        self.bump_stats(|stats| stats.players_registered += 1)?;
        self.metrics_collector.league().players_registered_total.inc();

        info!(
            "Registered player '{}' ({}) at rating {}",
            player.name, player.id, player.rating
        );
        Ok(player)
    }

    /// Activate or deactivate a player
    pub async fn set_player_active(
        &self,
        player_id: &PlayerId,
        active: bool,
    ) -> crate::error::Result<Player> {
        let player = self.store.set_player_active(player_id, active).await?;

        info!(
            "Player '{}' ({}) is now {}",
            player.name,
            player.id,
            if active { "active" } else { "inactive" }
        );
        Ok(player)
    }

    /// All registered players in registration order
    pub async fn list_players(&self) -> crate::error::Result<Vec<Player>> {
        self.store.list_players().await
    }

    /// Create a session dated at midnight UTC
    pub async fn create_session(
        &self,
        name: &str,
        date: DateTime<Utc>,
    ) -> crate::error::Result<Session> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(LeagueError::InvalidName {
                reason: "session name is required".to_string(),
            }
            .into());
        }

        let session = Session {
            id: generate_session_id(),
            name: trimmed.to_string(),
            date: normalize_session_date(date),
            active: true,
            created_at: current_timestamp(),
        };

        self.store.insert_session(session.clone()).await?;
        self.bump_stats(|stats| stats.sessions_created += 1)?;
        self.metrics_collector.league().sessions_created_total.inc();

        info!("Created session '{}' ({})", session.name, session.id);
        Ok(session)
    }

    /// Activate or deactivate a session
    pub async fn set_session_active(
        &self,
        session_id: SessionId,
        active: bool,
    ) -> crate::error::Result<Session> {
        self.store.set_session_active(session_id, active).await
    }

    /// All sessions, newest first
    pub async fn list_sessions(&self) -> crate::error::Result<Vec<Session>> {
        self.store.list_sessions().await
    }

    /// Mark a player present or absent for a session
    pub async fn set_attendance(
        &self,
        session_id: SessionId,
        player_id: &PlayerId,
        present: bool,
    ) -> crate::error::Result<()> {
        self.store
            .set_attendance(session_id, player_id, present)
            .await?;

        debug!(
            "Attendance for player {} in session {}: {}",
            player_id, session_id, present
        );
        Ok(())
    }

    /// Active players with their attendance flags for a session.
    ///
    /// Players with no attendance record count as present.
    pub async fn session_roster(
        &self,
        session_id: SessionId,
    ) -> crate::error::Result<Vec<RosterEntry>> {
        self.require_session(session_id).await?;

        let attendance = self.store.attendance(session_id).await?;

        let roster = self
            .store
            .list_players()
            .await?
            .into_iter()
            .filter(|player| player.active)
            .map(|player| {
                let present = attendance.get(&player.id).copied().unwrap_or(true);
                RosterEntry { player, present }
            })
            .collect();

        Ok(roster)
    }

    /// Partition the session's present players into rating-balanced
    /// groups, replacing any previous generation for the session.
    pub async fn generate_groups(
        &self,
        session_id: SessionId,
        group_count: usize,
    ) -> crate::error::Result<Vec<Group>> {
        let start_time = Instant::now();

        self.require_session(session_id).await?;

        let present: Vec<Player> = self
            .session_roster(session_id)
            .await?
            .into_iter()
            .filter(|entry| entry.present)
            .map(|entry| entry.player)
            .collect();

        if present.len() < 4 {
            return Err(LeagueError::InsufficientPlayers {
                required: 4,
                available: present.len(),
            }
            .into());
        }

        let rated: Vec<RatedPlayer> = present.iter().map(RatedPlayer::from).collect();
        let partitioned = partition(&rated, group_count, self.grouping_config.strategy)?;

        let groups: Vec<Group> = partitioned
            .into_iter()
            .enumerate()
            .map(|(index, members)| Group {
                id: generate_group_id(),
                session_id,
                label: format!("Group {}", index + 1),
                members: members
                    .into_iter()
                    .enumerate()
                    .map(|(position, player)| GroupMember {
                        player_id: player.id,
                        position: position as u32 + 1,
                    })
                    .collect(),
            })
            .collect();

        // Replace-all: prior groups vanish with the new set in one unit
        let mut tx = self.store.begin().await?;
        tx.replace_groups(session_id, groups.clone()).await?;
        tx.commit().await?;

        self.bump_stats(|stats| stats.groups_generated += groups.len() as u64)?;
        self.metrics_collector
            .league()
            .groups_generated_total
            .inc_by(groups.len() as u64);
        self.metrics_collector.record_generation(start_time.elapsed());

        info!(
            "Generated {} groups for session {} from {} present players ({})",
            groups.len(),
            session_id,
            present.len(),
            self.grouping_config.strategy
        );
        Ok(groups)
    }

    /// Build the round-robin doubles schedule for every group of the
    /// session, replacing all of the session's matches in one unit.
    pub async fn generate_matches(
        &self,
        session_id: SessionId,
    ) -> crate::error::Result<Vec<Match>> {
        let start_time = Instant::now();

        self.require_session(session_id).await?;

        let groups = self.store.list_groups(session_id).await?;
        if groups.is_empty() {
            return Err(LeagueError::GroupsNotGenerated {
                session_id: session_id.to_string(),
            }
            .into());
        }

        for group in &groups {
            if !(4..=6).contains(&group.members.len()) {
                return Err(LeagueError::UnsupportedGroupSize {
                    size: group.members.len(),
                }
                .into());
            }
        }

        let ratings: HashMap<PlayerId, i32> = self
            .store
            .list_players()
            .await?
            .into_iter()
            .map(|player| (player.id, player.rating))
            .collect();

        let now = current_timestamp();
        let mut matches = Vec::new();

        for group in &groups {
            let mut rated = Vec::with_capacity(group.members.len());
            for member in &group.members {
                let rating = ratings.get(&member.player_id).copied().ok_or_else(|| {
                    LeagueError::PlayerNotFound {
                        player_id: member.player_id.clone(),
                    }
                })?;
                rated.push(RatedPlayer {
                    id: member.player_id.clone(),
                    rating,
                });
            }

            for scheduled in round_robin_doubles(&rated)? {
                let members = scheduled
                    .team1
                    .iter()
                    .map(|id| MatchMember {
                        player_id: id.clone(),
                        team: Team::One,
                    })
                    .chain(scheduled.team2.iter().map(|id| MatchMember {
                        player_id: id.clone(),
                        team: Team::Two,
                    }))
                    .collect();

                matches.push(Match {
                    id: generate_match_id(),
                    session_id,
                    round: scheduled.round,
                    members,
                    score1: None,
                    score2: None,
                    finalized_at: None,
                    created_at: now,
                });
            }
        }

        let mut tx = self.store.begin().await?;
        tx.replace_matches(session_id, matches.clone()).await?;
        tx.commit().await?;

        self.bump_stats(|stats| stats.matches_scheduled += matches.len() as u64)?;
        self.metrics_collector
            .league()
            .matches_scheduled_total
            .inc_by(matches.len() as u64);
        self.metrics_collector.record_generation(start_time.elapsed());

        info!(
            "Scheduled {} matches across {} groups for session {}",
            matches.len(),
            groups.len(),
            session_id
        );
        Ok(matches)
    }

    /// Record scores on an open match
    pub async fn record_score(
        &self,
        match_id: MatchId,
        score1: i32,
        score2: i32,
    ) -> crate::error::Result<Match> {
        let max_score = self.rating_config.max_score;
        for score in [score1, score2] {
            if score < 0 || score > max_score {
                return Err(LeagueError::InvalidScore {
                    reason: format!("score {} outside 0..={}", score, max_score),
                }
                .into());
            }
        }

        let updated = self.store.update_match_scores(match_id, score1, score2).await?;

        debug!(
            "Recorded score {}-{} for match {}",
            score1, score2, match_id
        );
        Ok(updated)
    }

    /// Finalize a scored match, applying its rating effects exactly once
    pub async fn finalize_match(
        &self,
        match_id: MatchId,
    ) -> crate::error::Result<FinalizeOutcome> {
        let start_time = Instant::now();

        match self.coordinator.finalize(match_id).await {
            Ok(outcome) => {
                self.bump_stats(|stats| stats.matches_finalized += 1)?;
                self.metrics_collector
                    .record_finalization(&outcome.deltas, start_time.elapsed());
                Ok(outcome)
            }
            Err(err) => {
                if matches!(
                    err.downcast_ref::<LeagueError>(),
                    Some(LeagueError::AlreadyFinalized { .. })
                ) {
                    self.metrics_collector.record_finalize_conflict();
                }
                Err(err)
            }
        }
    }

    /// A session's groups in label order
    pub async fn list_groups(&self, session_id: SessionId) -> crate::error::Result<Vec<Group>> {
        self.store.list_groups(session_id).await
    }

    /// A session's matches in schedule order
    pub async fn list_matches(&self, session_id: SessionId) -> crate::error::Result<Vec<Match>> {
        self.store.list_matches(session_id).await
    }

    /// A session's rating audit trail
    pub async fn list_snapshots(
        &self,
        session_id: SessionId,
    ) -> crate::error::Result<Vec<RatingSnapshot>> {
        self.store.list_snapshots(session_id).await
    }

    /// Get current manager statistics
    pub async fn get_stats(&self) -> crate::error::Result<LeagueManagerStats> {
        let stats = self.stats.read().map_err(|_| LeagueError::InternalError {
            message: "Failed to acquire stats lock".to_string(),
        })?;

        Ok(stats.clone())
    }

    async fn require_session(&self, session_id: SessionId) -> crate::error::Result<Session> {
        self.store
            .find_session(session_id)
            .await?
            .ok_or_else(|| {
                LeagueError::SessionNotFound {
                    session_id: session_id.to_string(),
                }
                .into()
            })
    }

    fn bump_stats(
        &self,
        update: impl FnOnce(&mut LeagueManagerStats),
    ) -> crate::error::Result<()> {
        let mut stats = self.stats.write().map_err(|_| LeagueError::InternalError {
            message: "Failed to acquire stats lock".to_string(),
        })?;
        update(&mut stats);
        Ok(())
    }
}
