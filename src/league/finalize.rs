//! Match finalization
//!
//! Finalizing a match locks its scores and applies the rating exchange
//! to the four players exactly once. Everything runs inside a single
//! store transaction: the conditional claim on the finalization
//! timestamp decides the race between concurrent callers, ratings are
//! re-read after the claim, and any failure rolls the whole unit back,
//! timestamp included.

use crate::error::LeagueError;
use crate::rating::DoublesEloEngine;
use crate::storage::{LeagueStore, StoreTransaction};
use crate::types::{
    FinalizeOutcome, Match, MatchId, PlayerId, RatedPlayer, RatingSnapshot, Team,
};
use crate::utils::current_timestamp;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Applies match results to player ratings with at-most-once semantics
pub struct FinalizationCoordinator {
    store: Arc<dyn LeagueStore>,
    engine: DoublesEloEngine,
    rating_floor: i32,
}

impl FinalizationCoordinator {
    pub fn new(store: Arc<dyn LeagueStore>, engine: DoublesEloEngine, rating_floor: i32) -> Self {
        Self {
            store,
            engine,
            rating_floor,
        }
    }

    /// Finalize a scored match and return the raw per-player deltas.
    ///
    /// Of any number of concurrent callers for the same match, exactly
    /// one succeeds; the rest see `AlreadyFinalized` and no effects.
    pub async fn finalize(&self, match_id: MatchId) -> crate::error::Result<FinalizeOutcome> {
        let mut tx = self.store.begin().await?;

        match self.apply(tx.as_mut(), match_id).await {
            Ok(outcome) => {
                tx.commit().await?;

                info!(
                    "Finalized match {} in session {} ({} rating updates)",
                    outcome.match_id,
                    outcome.session_id,
                    outcome.deltas.len()
                );
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        "Rollback after failed finalize of {} also failed: {}",
                        match_id, rollback_err
                    );
                }
                Err(err)
            }
        }
    }

    /// All finalization steps against one open transaction
    async fn apply(
        &self,
        tx: &mut dyn StoreTransaction,
        match_id: MatchId,
    ) -> crate::error::Result<FinalizeOutcome> {
        let m = tx
            .find_match(match_id)
            .await?
            .ok_or_else(|| LeagueError::MatchNotFound {
                match_id: match_id.to_string(),
            })?;

        let (score1, score2) = match (m.score1, m.score2) {
            (Some(score1), Some(score2)) => (score1, score2),
            _ => {
                return Err(LeagueError::MissingScores {
                    match_id: match_id.to_string(),
                }
                .into())
            }
        };

        if m.is_finalized() {
            return Err(LeagueError::AlreadyFinalized {
                match_id: match_id.to_string(),
            }
            .into());
        }

        let (team1_ids, team2_ids) = team_rosters(&m)?;

        // Conditional claim on the finalization timestamp; losing the
        // race aborts the whole unit with no effects
        let affected = tx.claim_finalization(match_id, current_timestamp()).await?;
        if affected != 1 {
            debug!("Match {} was finalized by a concurrent caller", match_id);
            return Err(LeagueError::AlreadyFinalized {
                match_id: match_id.to_string(),
            }
            .into());
        }

        // Re-read ratings inside the transaction; the values loaded
        // with the match may already be stale
        let player_ids: Vec<PlayerId> = team1_ids
            .iter()
            .chain(team2_ids.iter())
            .cloned()
            .collect();
        let ratings = tx.player_ratings(&player_ids).await?;

        let rated = |id: &PlayerId| -> crate::error::Result<RatedPlayer> {
            let rating = ratings
                .get(id)
                .copied()
                .ok_or_else(|| LeagueError::PlayerNotFound {
                    player_id: id.clone(),
                })?;
            Ok(RatedPlayer {
                id: id.clone(),
                rating,
            })
        };

        let team1 = [rated(&team1_ids[0])?, rated(&team1_ids[1])?];
        let team2 = [rated(&team2_ids[0])?, rated(&team2_ids[1])?];

        let deltas = self.engine.compute_deltas(&team1, &team2, score1, score2)?;

        let now = current_timestamp();
        let mut snapshots = Vec::with_capacity(deltas.len());

        for (player_id, delta) in &deltas {
            let before = ratings
                .get(player_id)
                .copied()
                .ok_or_else(|| LeagueError::InternalError {
                    message: format!("delta computed for unknown player {}", player_id),
                })?;

            let after = (before + delta).max(self.rating_floor);

            snapshots.push(RatingSnapshot {
                session_id: m.session_id,
                match_id,
                player_id: player_id.clone(),
                before,
                after,
                delta: *delta,
                created_at: now,
            });

            tx.update_player_rating(player_id, after).await?;
        }

        tx.insert_snapshots(snapshots).await?;

        Ok(FinalizeOutcome {
            match_id,
            session_id: m.session_id,
            deltas,
        })
    }
}

/// Split the match membership into two exact-size teams
fn team_rosters(m: &Match) -> crate::error::Result<([PlayerId; 2], [PlayerId; 2])> {
    let collect = |team: Team| -> crate::error::Result<[PlayerId; 2]> {
        let members = m.team_members(team);
        if members.len() != 2 {
            return Err(LeagueError::InvalidTeamSize {
                match_id: m.id.to_string(),
                team: team.number(),
                size: members.len(),
            }
            .into());
        }
        Ok([members[0].player_id.clone(), members[1].player_id.clone()])
    };

    Ok((collect(Team::One)?, collect(Team::Two)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryLeagueStore;
    use crate::types::{MatchMember, Player, Session};
    use crate::utils::{generate_match_id, generate_session_id};

    const FLOOR: i32 = 100;

    fn coordinator(store: Arc<InMemoryLeagueStore>) -> FinalizationCoordinator {
        FinalizationCoordinator::new(store, DoublesEloEngine::default(), FLOOR)
    }

    async fn seed_match(
        store: &InMemoryLeagueStore,
        ratings: [i32; 4],
        scores: Option<(i32, i32)>,
    ) -> MatchId {
        let session = Session {
            id: generate_session_id(),
            name: "test session".to_string(),
            date: current_timestamp(),
            active: true,
            created_at: current_timestamp(),
        };
        let session_id = session.id;
        store.insert_session(session).await.unwrap();

        for (index, rating) in ratings.into_iter().enumerate() {
            store
                .insert_player(Player {
                    id: format!("p{}", index),
                    name: format!("Player {}", index),
                    rating,
                    active: true,
                    created_at: current_timestamp(),
                })
                .await
                .unwrap();
        }

        let m = Match {
            id: generate_match_id(),
            session_id,
            round: 1,
            members: vec![
                MatchMember {
                    player_id: "p0".to_string(),
                    team: Team::One,
                },
                MatchMember {
                    player_id: "p1".to_string(),
                    team: Team::One,
                },
                MatchMember {
                    player_id: "p2".to_string(),
                    team: Team::Two,
                },
                MatchMember {
                    player_id: "p3".to_string(),
                    team: Team::Two,
                },
            ],
            score1: scores.map(|(s1, _)| s1),
            score2: scores.map(|(_, s2)| s2),
            finalized_at: None,
            created_at: current_timestamp(),
        };
        let match_id = m.id;

        let mut tx = store.begin().await.unwrap();
        tx.replace_matches(session_id, vec![m]).await.unwrap();
        tx.commit().await.unwrap();

        match_id
    }

    async fn rating_of(store: &InMemoryLeagueStore, id: &str) -> i32 {
        store
            .find_player(&id.to_string())
            .await
            .unwrap()
            .unwrap()
            .rating
    }

    #[tokio::test]
    async fn test_finalize_applies_deltas_once() {
        let store = Arc::new(InMemoryLeagueStore::new());
        let match_id = seed_match(&store, [1000, 1000, 1000, 1000], Some((11, 0))).await;

        let outcome = coordinator(store.clone()).finalize(match_id).await.unwrap();

        assert_eq!(outcome.deltas["p0"], 18);
        assert_eq!(outcome.deltas["p3"], -18);

        assert_eq!(rating_of(&store, "p0").await, 1018);
        assert_eq!(rating_of(&store, "p1").await, 1018);
        assert_eq!(rating_of(&store, "p2").await, 982);
        assert_eq!(rating_of(&store, "p3").await, 982);

        let stored = store.find_match(match_id).await.unwrap().unwrap();
        assert!(stored.is_finalized());
    }

    #[tokio::test]
    async fn test_second_finalize_is_rejected_without_effects() {
        let store = Arc::new(InMemoryLeagueStore::new());
        let match_id = seed_match(&store, [1000, 1000, 1000, 1000], Some((11, 5))).await;
        let coordinator = coordinator(store.clone());

        coordinator.finalize(match_id).await.unwrap();
        let after_first = rating_of(&store, "p0").await;

        let err = coordinator.finalize(match_id).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LeagueError>(),
            Some(LeagueError::AlreadyFinalized { .. })
        ));

        assert_eq!(rating_of(&store, "p0").await, after_first);
    }

    #[tokio::test]
    async fn test_missing_scores_rejected() {
        let store = Arc::new(InMemoryLeagueStore::new());
        let match_id = seed_match(&store, [1000, 1000, 1000, 1000], None).await;

        let err = coordinator(store.clone()).finalize(match_id).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LeagueError>(),
            Some(LeagueError::MissingScores { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_match_rejected() {
        let store = Arc::new(InMemoryLeagueStore::new());

        let err = coordinator(store)
            .finalize(generate_match_id())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LeagueError>(),
            Some(LeagueError::MatchNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_short_team_rejected() {
        let store = Arc::new(InMemoryLeagueStore::new());
        let match_id = seed_match(&store, [1000, 1000, 1000, 1000], Some((11, 3))).await;

        // Drop one member of team 2
        let mut m = store.find_match(match_id).await.unwrap().unwrap();
        let session_id = m.session_id;
        m.members.retain(|member| member.player_id != "p3");
        let mut tx = store.begin().await.unwrap();
        tx.replace_matches(session_id, vec![m]).await.unwrap();
        tx.commit().await.unwrap();

        let err = coordinator(store.clone()).finalize(match_id).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LeagueError>(),
            Some(LeagueError::InvalidTeamSize { team: 2, size: 1, .. })
        ));

        // Nothing was applied
        let stored = store.find_match(match_id).await.unwrap().unwrap();
        assert!(!stored.is_finalized());
        assert_eq!(rating_of(&store, "p0").await, 1000);
    }

    #[tokio::test]
    async fn test_tie_scores_roll_back_the_claim() {
        let store = Arc::new(InMemoryLeagueStore::new());
        let match_id = seed_match(&store, [1000, 1000, 1000, 1000], Some((7, 7))).await;

        let err = coordinator(store.clone()).finalize(match_id).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LeagueError>(),
            Some(LeagueError::InvalidScore { .. })
        ));

        // The claim taken before the engine ran was rolled back
        let stored = store.find_match(match_id).await.unwrap().unwrap();
        assert!(!stored.is_finalized());
    }

    #[tokio::test]
    async fn test_floor_clamps_rating_but_not_snapshot_delta() {
        let store = Arc::new(InMemoryLeagueStore::new());
        // An even match at the floor's edge; the shutout costs 18 points
        let match_id = seed_match(&store, [110, 110, 110, 110], Some((0, 11))).await;

        let outcome = coordinator(store.clone()).finalize(match_id).await.unwrap();
        let session_id = outcome.session_id;

        assert_eq!(outcome.deltas["p0"], -18);
        assert_eq!(outcome.deltas["p2"], 18);

        // Rating clamps at the floor even though the raw delta digs to 92
        assert_eq!(rating_of(&store, "p0").await, FLOOR);
        assert_eq!(rating_of(&store, "p2").await, 128);

        let snapshots = store.list_snapshots(session_id).await.unwrap();
        let snapshot = snapshots
            .iter()
            .find(|s| s.player_id == "p0")
            .expect("snapshot for p0");
        assert_eq!(snapshot.before, 110);
        assert_eq!(snapshot.after, FLOOR);
        assert_eq!(snapshot.delta, -18);
    }

    #[tokio::test]
    async fn test_uses_ratings_current_at_finalize_time() {
        let store = Arc::new(InMemoryLeagueStore::new());
        let match_id = seed_match(&store, [1000, 1000, 1000, 1000], Some((11, 0))).await;

        // p0's rating moved after the match was scheduled
        let mut tx = store.begin().await.unwrap();
        tx.update_player_rating(&"p0".to_string(), 1400).await.unwrap();
        tx.commit().await.unwrap();

        let outcome = coordinator(store.clone()).finalize(match_id).await.unwrap();

        // Team 1 now averages 1200 vs 1000, so the win pays less than 18
        assert!(outcome.deltas["p0"] < 18);
        assert_eq!(rating_of(&store, "p0").await, 1400 + outcome.deltas["p0"]);
    }

    #[tokio::test]
    async fn test_snapshot_written_per_player() {
        let store = Arc::new(InMemoryLeagueStore::new());
        let match_id = seed_match(&store, [1200, 1100, 1000, 900], Some((11, 8))).await;

        let outcome = coordinator(store.clone()).finalize(match_id).await.unwrap();

        let snapshots = store.list_snapshots(outcome.session_id).await.unwrap();
        assert_eq!(snapshots.len(), 4);
        for snapshot in &snapshots {
            assert_eq!(snapshot.match_id, match_id);
            assert_eq!(snapshot.after, snapshot.before + snapshot.delta);
        }
    }
}
