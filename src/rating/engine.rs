//! Doubles Elo rating engine
//!
//! This module implements the paired Elo variant used for league play:
//! both members of a team share one delta, and the delta is scaled by a
//! margin-of-victory multiplier before rounding to an integer.

use crate::error::LeagueError;
use crate::types::{PlayerId, RatedPlayer};
use serde::{Deserialize, Serialize};
use skillratings::elo::{expected_score, EloRating};
use std::collections::HashMap;

/// Tuning parameters for the doubles Elo engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoublesEloConfig {
    /// Base K-factor applied to every exchange
    pub k_factor: f64,
    /// Score margin at which the multiplier stops growing
    pub margin_cap: i32,
    /// Extra multiplier weight at the capped margin (0.5 means 1.5x)
    pub margin_bonus: f64,
}

impl Default for DoublesEloConfig {
    fn default() -> Self {
        Self {
            k_factor: 24.0,
            margin_cap: 11,
            margin_bonus: 0.5,
        }
    }
}

impl DoublesEloConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.k_factor <= 0.0 {
            return Err(LeagueError::ConfigurationError {
                message: "K-factor must be positive".to_string(),
            }
            .into());
        }

        if self.margin_cap <= 0 {
            return Err(LeagueError::ConfigurationError {
                message: "Margin cap must be positive".to_string(),
            }
            .into());
        }

        if self.margin_bonus < 0.0 {
            return Err(LeagueError::ConfigurationError {
                message: "Margin bonus must be non-negative".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Rating engine for doubles matches
///
/// Pure computation: no state beyond configuration, no I/O, safe to
/// call concurrently.
#[derive(Debug, Clone)]
pub struct DoublesEloEngine {
    config: DoublesEloConfig,
}

impl DoublesEloEngine {
    /// Create a new engine with validated configuration
    pub fn new(config: DoublesEloConfig) -> crate::error::Result<Self> {
        config.validate()?;

        Ok(Self { config })
    }

    /// Compute signed rating deltas for the four players of a doubles match.
    ///
    /// Team rating is the arithmetic mean of its members. The expected
    /// outcome for team 1 follows the Elo logistic on the rating
    /// difference over 400. Deltas are rounded to the nearest integer
    /// with .5 ties toward positive infinity, and both members of a
    /// team receive the same delta; team 2's delta is the negation of
    /// team 1's, so the raw exchange is zero-sum.
    pub fn compute_deltas(
        &self,
        team1: &[RatedPlayer; 2],
        team2: &[RatedPlayer; 2],
        score1: i32,
        score2: i32,
    ) -> crate::error::Result<HashMap<PlayerId, i32>> {
        if score1 < 0 || score2 < 0 {
            return Err(LeagueError::InvalidScore {
                reason: format!("scores must be non-negative, got {} and {}", score1, score2),
            }
            .into());
        }

        if score1 == score2 {
            return Err(LeagueError::InvalidScore {
                reason: format!("doubles matches cannot end in a tie ({}-{})", score1, score2),
            }
            .into());
        }

        // A player cannot gain and lose rating in the same match
        let mut seen: Vec<&PlayerId> = Vec::with_capacity(4);
        for member in team1.iter().chain(team2.iter()) {
            if seen.contains(&&member.id) {
                return Err(LeagueError::InvalidTeamComposition {
                    player_id: member.id.clone(),
                }
                .into());
            }
            seen.push(&member.id);
        }

        let r1 = (team1[0].rating + team1[1].rating) as f64 / 2.0;
        let r2 = (team2[0].rating + team2[1].rating) as f64 / 2.0;

        let (e1, _e2) = expected_score(&EloRating { rating: r1 }, &EloRating { rating: r2 });

        let s1 = if score1 > score2 { 1.0 } else { 0.0 };

        let margin = (score1 - score2).abs();
        let multiplier = self.margin_multiplier(margin);

        let delta1 = round_half_up(self.config.k_factor * multiplier * (s1 - e1));
        let delta2 = -delta1;

        let mut deltas = HashMap::with_capacity(4);
        deltas.insert(team1[0].id.clone(), delta1);
        deltas.insert(team1[1].id.clone(), delta1);
        deltas.insert(team2[0].id.clone(), delta2);
        deltas.insert(team2[1].id.clone(), delta2);

        Ok(deltas)
    }

    /// Margin-of-victory multiplier: 1.0 at margin 0, growing linearly
    /// to `1.0 + margin_bonus` at `margin_cap`, clamped above the cap.
    fn margin_multiplier(&self, margin: i32) -> f64 {
        let capped = margin.min(self.config.margin_cap);
        1.0 + (capped as f64 / self.config.margin_cap as f64) * self.config.margin_bonus
    }
}

impl Default for DoublesEloEngine {
    fn default() -> Self {
        Self {
            config: DoublesEloConfig::default(),
        }
    }
}

/// Round to the nearest integer, .5 ties toward positive infinity
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
