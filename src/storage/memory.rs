//! In-memory league storage implementation
//!
//! Backs the full `LeagueStore` contract with a cloneable state value
//! behind an owned tokio mutex. A transaction takes the lock and stages
//! its writes on a clone of the state; commit swaps the clone in,
//! rollback simply drops it. Holding the lock for the lifetime of the
//! transaction serializes transactions, which is what makes the
//! conditional finalization claim race-safe in a single process.

use crate::error::{LeagueError, Result};
use crate::storage::{LeagueStore, StoreTransaction};
use crate::types::{
    Group, Match, MatchId, Player, PlayerId, RatingSnapshot, Session, SessionId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Entire league state; cloned per transaction
#[derive(Debug, Clone, Default)]
struct LeagueState {
    players: HashMap<PlayerId, Player>,
    sessions: HashMap<SessionId, Session>,
    attendance: HashMap<(SessionId, PlayerId), bool>,
    groups: HashMap<SessionId, Vec<Group>>,
    matches: HashMap<MatchId, Match>,
    match_order: HashMap<SessionId, Vec<MatchId>>,
    snapshots: Vec<RatingSnapshot>,
}

/// In-memory rating storage implementation
#[derive(Debug, Clone, Default)]
pub struct InMemoryLeagueStore {
    state: Arc<Mutex<LeagueState>>,
}

impl InMemoryLeagueStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeagueStore for InMemoryLeagueStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();

        Ok(Box::new(MemoryTransaction { guard, staged }))
    }

    async fn insert_player(&self, player: Player) -> Result<()> {
        let mut state = self.state.lock().await;
        state.players.insert(player.id.clone(), player);
        Ok(())
    }

    async fn find_player(&self, player_id: &PlayerId) -> Result<Option<Player>> {
        let state = self.state.lock().await;
        Ok(state.players.get(player_id).cloned())
    }

    async fn list_players(&self) -> Result<Vec<Player>> {
        let state = self.state.lock().await;

        let mut players: Vec<Player> = state.players.values().cloned().collect();
        players.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(players)
    }

    async fn set_player_active(&self, player_id: &PlayerId, active: bool) -> Result<Player> {
        let mut state = self.state.lock().await;

        let player = state
            .players
            .get_mut(player_id)
            .ok_or_else(|| LeagueError::PlayerNotFound {
                player_id: player_id.clone(),
            })?;
        player.active = active;

        Ok(player.clone())
    }

    async fn insert_session(&self, session: Session) -> Result<()> {
        let mut state = self.state.lock().await;
        state.sessions.insert(session.id, session);
        Ok(())
    }

    async fn find_session(&self, session_id: SessionId) -> Result<Option<Session>> {
        let state = self.state.lock().await;
        Ok(state.sessions.get(&session_id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let state = self.state.lock().await;

        let mut sessions: Vec<Session> = state.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));

        Ok(sessions)
    }

    async fn set_session_active(&self, session_id: SessionId, active: bool) -> Result<Session> {
        let mut state = self.state.lock().await;

        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| LeagueError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        session.active = active;

        Ok(session.clone())
    }

    async fn set_attendance(
        &self,
        session_id: SessionId,
        player_id: &PlayerId,
        present: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().await;

        if !state.sessions.contains_key(&session_id) {
            return Err(LeagueError::SessionNotFound {
                session_id: session_id.to_string(),
            }
            .into());
        }
        if !state.players.contains_key(player_id) {
            return Err(LeagueError::PlayerNotFound {
                player_id: player_id.clone(),
            }
            .into());
        }

        state
            .attendance
            .insert((session_id, player_id.clone()), present);

        Ok(())
    }

    async fn attendance(&self, session_id: SessionId) -> Result<HashMap<PlayerId, bool>> {
        let state = self.state.lock().await;

        Ok(state
            .attendance
            .iter()
            .filter(|((sid, _), _)| *sid == session_id)
            .map(|((_, player_id), present)| (player_id.clone(), *present))
            .collect())
    }

    async fn list_groups(&self, session_id: SessionId) -> Result<Vec<Group>> {
        let state = self.state.lock().await;
        Ok(state.groups.get(&session_id).cloned().unwrap_or_default())
    }

    async fn find_match(&self, match_id: MatchId) -> Result<Option<Match>> {
        let state = self.state.lock().await;
        Ok(state.matches.get(&match_id).cloned())
    }

    async fn list_matches(&self, session_id: SessionId) -> Result<Vec<Match>> {
        let state = self.state.lock().await;

        let ids = state.match_order.get(&session_id);
        Ok(ids
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.matches.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_match_scores(
        &self,
        match_id: MatchId,
        score1: i32,
        score2: i32,
    ) -> Result<Match> {
        let mut state = self.state.lock().await;

        let stored = state
            .matches
            .get_mut(&match_id)
            .ok_or_else(|| LeagueError::MatchNotFound {
                match_id: match_id.to_string(),
            })?;

        // Finalized matches are immutable
        if stored.is_finalized() {
            return Err(LeagueError::AlreadyFinalized {
                match_id: match_id.to_string(),
            }
            .into());
        }

        stored.score1 = Some(score1);
        stored.score2 = Some(score2);

        Ok(stored.clone())
    }

    async fn list_snapshots(&self, session_id: SessionId) -> Result<Vec<RatingSnapshot>> {
        let state = self.state.lock().await;

        Ok(state
            .snapshots
            .iter()
            .filter(|snapshot| snapshot.session_id == session_id)
            .cloned()
            .collect())
    }
}

/// Copy-on-write transaction over the in-memory state
struct MemoryTransaction {
    guard: OwnedMutexGuard<LeagueState>,
    staged: LeagueState,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn find_match(&mut self, match_id: MatchId) -> Result<Option<Match>> {
        Ok(self.staged.matches.get(&match_id).cloned())
    }

    async fn claim_finalization(
        &mut self,
        match_id: MatchId,
        finalized_at: DateTime<Utc>,
    ) -> Result<u64> {
        match self.staged.matches.get_mut(&match_id) {
            Some(stored) if stored.finalized_at.is_none() => {
                stored.finalized_at = Some(finalized_at);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn player_ratings(&mut self, player_ids: &[PlayerId]) -> Result<HashMap<PlayerId, i32>> {
        let mut ratings = HashMap::with_capacity(player_ids.len());

        for player_id in player_ids {
            let player = self.staged.players.get(player_id).ok_or_else(|| {
                LeagueError::PlayerNotFound {
                    player_id: player_id.clone(),
                }
            })?;
            ratings.insert(player_id.clone(), player.rating);
        }

        Ok(ratings)
    }

    async fn update_player_rating(&mut self, player_id: &PlayerId, rating: i32) -> Result<()> {
        let player = self.staged.players.get_mut(player_id).ok_or_else(|| {
            LeagueError::PlayerNotFound {
                player_id: player_id.clone(),
            }
        })?;
        player.rating = rating;

        Ok(())
    }

    async fn insert_snapshots(&mut self, snapshots: Vec<RatingSnapshot>) -> Result<()> {
        self.staged.snapshots.extend(snapshots);
        Ok(())
    }

    async fn replace_groups(&mut self, session_id: SessionId, groups: Vec<Group>) -> Result<()> {
        self.staged.groups.insert(session_id, groups);
        Ok(())
    }

    async fn replace_matches(&mut self, session_id: SessionId, matches: Vec<Match>) -> Result<()> {
        if let Some(old_ids) = self.staged.match_order.remove(&session_id) {
            for id in old_ids {
                self.staged.matches.remove(&id);
            }
        }

        let ids: Vec<MatchId> = matches.iter().map(|m| m.id).collect();
        for m in matches {
            self.staged.matches.insert(m.id, m);
        }
        self.staged.match_order.insert(session_id, ids);

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Staged state is dropped with the transaction
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{current_timestamp, generate_match_id, generate_session_id};

    fn test_player(id: &str, rating: i32) -> Player {
        Player {
            id: id.to_string(),
            name: format!("Player {}", id),
            rating,
            active: true,
            created_at: current_timestamp(),
        }
    }

    fn test_session() -> Session {
        Session {
            id: generate_session_id(),
            name: "Thursday night".to_string(),
            date: current_timestamp(),
            active: true,
            created_at: current_timestamp(),
        }
    }

    fn test_match(session_id: SessionId, players: [&str; 4]) -> Match {
        Match {
            id: generate_match_id(),
            session_id,
            round: 1,
            members: vec![
                crate::types::MatchMember {
                    player_id: players[0].to_string(),
                    team: crate::types::Team::One,
                },
                crate::types::MatchMember {
                    player_id: players[1].to_string(),
                    team: crate::types::Team::One,
                },
                crate::types::MatchMember {
                    player_id: players[2].to_string(),
                    team: crate::types::Team::Two,
                },
                crate::types::MatchMember {
                    player_id: players[3].to_string(),
                    team: crate::types::Team::Two,
                },
            ],
            score1: None,
            score2: None,
            finalized_at: None,
            created_at: current_timestamp(),
        }
    }

    #[tokio::test]
    async fn test_player_round_trip() {
        let store = InMemoryLeagueStore::new();

        assert!(store.find_player(&"a".to_string()).await.unwrap().is_none());

        store.insert_player(test_player("a", 1000)).await.unwrap();

        let found = store.find_player(&"a".to_string()).await.unwrap().unwrap();
        assert_eq!(found.rating, 1000);
        assert!(found.active);

        let deactivated = store.set_player_active(&"a".to_string(), false).await.unwrap();
        assert!(!deactivated.active);
    }

    #[tokio::test]
    async fn test_attendance_requires_known_rows() {
        let store = InMemoryLeagueStore::new();
        let session = test_session();
        let session_id = session.id;

        store.insert_session(session).await.unwrap();

        let err = store
            .set_attendance(session_id, &"ghost".to_string(), false)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LeagueError>(),
            Some(LeagueError::PlayerNotFound { .. })
        ));

        store.insert_player(test_player("a", 1000)).await.unwrap();
        store
            .set_attendance(session_id, &"a".to_string(), false)
            .await
            .unwrap();

        let attendance = store.attendance(session_id).await.unwrap();
        assert_eq!(attendance.get("a"), Some(&false));
    }

    #[tokio::test]
    async fn test_transaction_commit_is_visible() {
        let store = InMemoryLeagueStore::new();
        store.insert_player(test_player("a", 1000)).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.update_player_rating(&"a".to_string(), 1050).await.unwrap();
        tx.commit().await.unwrap();

        let player = store.find_player(&"a".to_string()).await.unwrap().unwrap();
        assert_eq!(player.rating, 1050);
    }

    #[tokio::test]
    async fn test_transaction_rollback_discards_everything() {
        let store = InMemoryLeagueStore::new();
        let session = test_session();
        let session_id = session.id;
        store.insert_session(session).await.unwrap();
        store.insert_player(test_player("a", 1000)).await.unwrap();

        let m = test_match(session_id, ["a", "b", "c", "d"]);
        let match_id = m.id;
        let mut tx = store.begin().await.unwrap();
        tx.replace_matches(session_id, vec![m]).await.unwrap();
        tx.commit().await.unwrap();

        // Stage a claim plus a rating write, then roll back
        let mut tx = store.begin().await.unwrap();
        let claimed = tx
            .claim_finalization(match_id, current_timestamp())
            .await
            .unwrap();
        assert_eq!(claimed, 1);
        tx.update_player_rating(&"a".to_string(), 2000).await.unwrap();
        tx.rollback().await.unwrap();

        // The claim and the rating write both vanished
        let stored = store.find_match(match_id).await.unwrap().unwrap();
        assert!(!stored.is_finalized());
        let player = store.find_player(&"a".to_string()).await.unwrap().unwrap();
        assert_eq!(player.rating, 1000);
    }

    #[tokio::test]
    async fn test_claim_finalization_is_single_shot() {
        let store = InMemoryLeagueStore::new();
        let session = test_session();
        let session_id = session.id;
        store.insert_session(session).await.unwrap();

        let m = test_match(session_id, ["a", "b", "c", "d"]);
        let match_id = m.id;
        let mut tx = store.begin().await.unwrap();
        tx.replace_matches(session_id, vec![m]).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.claim_finalization(match_id, current_timestamp())
                .await
                .unwrap(),
            1
        );
        // Second claim in the same transaction sees the timestamp
        assert_eq!(
            tx.claim_finalization(match_id, current_timestamp())
                .await
                .unwrap(),
            0
        );
        tx.commit().await.unwrap();

        // And a later transaction loses as well
        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.claim_finalization(match_id, current_timestamp())
                .await
                .unwrap(),
            0
        );
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_replace_matches_removes_old_rows() {
        let store = InMemoryLeagueStore::new();
        let session = test_session();
        let session_id = session.id;
        store.insert_session(session).await.unwrap();

        let first = test_match(session_id, ["a", "b", "c", "d"]);
        let first_id = first.id;
        let mut tx = store.begin().await.unwrap();
        tx.replace_matches(session_id, vec![first]).await.unwrap();
        tx.commit().await.unwrap();

        let second = test_match(session_id, ["e", "f", "g", "h"]);
        let second_id = second.id;
        let mut tx = store.begin().await.unwrap();
        tx.replace_matches(session_id, vec![second]).await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.find_match(first_id).await.unwrap().is_none());
        assert!(store.find_match(second_id).await.unwrap().is_some());
        assert_eq!(store.list_matches(session_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scores_rejected_after_finalization() {
        let store = InMemoryLeagueStore::new();
        let session = test_session();
        let session_id = session.id;
        store.insert_session(session).await.unwrap();

        let m = test_match(session_id, ["a", "b", "c", "d"]);
        let match_id = m.id;
        let mut tx = store.begin().await.unwrap();
        tx.replace_matches(session_id, vec![m]).await.unwrap();
        tx.claim_finalization(match_id, current_timestamp())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let err = store.update_match_scores(match_id, 11, 7).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LeagueError>(),
            Some(LeagueError::AlreadyFinalized { .. })
        ));
    }

    #[tokio::test]
    async fn test_sessions_listed_newest_first() {
        let store = InMemoryLeagueStore::new();

        let mut older = test_session();
        older.date = older.date - chrono::Duration::days(7);
        let newer = test_session();

        store.insert_session(older.clone()).await.unwrap();
        store.insert_session(newer.clone()).await.unwrap();

        let sessions = store.list_sessions().await.unwrap();
        assert_eq!(sessions[0].id, newer.id);
        assert_eq!(sessions[1].id, older.id);
    }
}
