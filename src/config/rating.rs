//! Rating system configuration

use crate::rating::DoublesEloConfig;
use serde::{Deserialize, Serialize};

/// League-level rating settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingConfig {
    /// Base K-factor for the doubles Elo exchange
    pub k_factor: f64,
    /// Score margin where the victory multiplier tops out
    pub margin_cap: i32,
    /// Extra multiplier weight at the capped margin
    pub margin_bonus: f64,
    /// Lowest rating a finalized match can leave a player at
    pub rating_floor: i32,
    /// Rating assigned to newly registered players
    pub initial_rating: i32,
    /// Highest score accepted when recording results
    pub max_score: i32,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k_factor: 24.0,
            margin_cap: 11,
            margin_bonus: 0.5,
            rating_floor: 100,
            initial_rating: 1000,
            max_score: 50,
        }
    }
}

impl RatingConfig {
    /// Engine parameters carved out of the league settings
    pub fn engine_config(&self) -> DoublesEloConfig {
        DoublesEloConfig {
            k_factor: self.k_factor,
            margin_cap: self.margin_cap,
            margin_bonus: self.margin_bonus,
        }
    }
}
