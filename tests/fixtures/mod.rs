//! Test fixtures and helpers for integration testing

use rally_point::config::{GroupingConfig, RatingConfig};
use rally_point::storage::InMemoryLeagueStore;
use rally_point::types::{Player, Session};
use rally_point::LeagueManager;
use std::sync::Arc;

/// Create a complete test system backed by a fresh in-memory store
pub fn create_test_system() -> (LeagueManager, Arc<InMemoryLeagueStore>) {
    let store = Arc::new(InMemoryLeagueStore::new());
    let manager = LeagueManager::with_config(
        store.clone(),
        RatingConfig::default(),
        GroupingConfig::default(),
    );

    (manager, store)
}

/// Register players with a descending spread of ratings
pub async fn register_ladder(manager: &LeagueManager, count: usize) -> Vec<Player> {
    let mut players = Vec::with_capacity(count);

    for index in 0..count {
        let player = manager
            .register_player(
                &format!("Player {}", index + 1),
                Some(1500 - index as i32 * 50),
            )
            .await
            .expect("player registration failed");
        players.push(player);
    }

    players
}

/// Create a session dated today
pub async fn create_session(manager: &LeagueManager, name: &str) -> Session {
    manager
        .create_session(name, chrono::Utc::now())
        .await
        .expect("session creation failed")
}

/// Total rating across all registered players
pub async fn total_rating(manager: &LeagueManager) -> i64 {
    manager
        .list_players()
        .await
        .expect("player listing failed")
        .iter()
        .map(|player| player.rating as i64)
        .sum()
}
