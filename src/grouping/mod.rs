//! Player grouping for session play
//!
//! This module partitions a rated population into balanced groups,
//! either as contiguous rating bands or as a snake draft.

use crate::error::LeagueError;
use crate::types::RatedPlayer;
use serde::{Deserialize, Serialize};

/// How present players are split into groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingStrategy {
    /// Contiguous bands of the ratings-sorted list; band 0 is strongest
    RatingBands,
    /// Round-robin allocation alternating direction each pass
    SnakeDraft,
}

impl Default for GroupingStrategy {
    fn default() -> Self {
        GroupingStrategy::RatingBands
    }
}

impl std::fmt::Display for GroupingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupingStrategy::RatingBands => write!(f, "rating_bands"),
            GroupingStrategy::SnakeDraft => write!(f, "snake_draft"),
        }
    }
}

impl std::str::FromStr for GroupingStrategy {
    type Err = LeagueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rating_bands" | "bands" => Ok(GroupingStrategy::RatingBands),
            "snake_draft" | "snake" => Ok(GroupingStrategy::SnakeDraft),
            other => Err(LeagueError::ConfigurationError {
                message: format!("unknown grouping strategy: {}", other),
            }),
        }
    }
}

/// Partition players into `group_count` groups using the given strategy.
///
/// Players are sorted descending by rating first; the sort is stable,
/// so equal ratings keep their input order. Group sizes differ by at
/// most one, with earlier groups taking the extra players.
pub fn partition(
    players: &[RatedPlayer],
    group_count: usize,
    strategy: GroupingStrategy,
) -> crate::error::Result<Vec<Vec<RatedPlayer>>> {
    if group_count < 2 {
        return Err(LeagueError::ConfigurationError {
            message: format!("group count must be at least 2, got {}", group_count),
        }
        .into());
    }

    if players.len() < group_count {
        return Err(LeagueError::InsufficientPlayers {
            required: group_count,
            available: players.len(),
        }
        .into());
    }

    let mut sorted: Vec<RatedPlayer> = players.to_vec();
    sorted.sort_by(|a, b| b.rating.cmp(&a.rating));

    let groups = match strategy {
        GroupingStrategy::RatingBands => rating_bands(sorted, group_count),
        GroupingStrategy::SnakeDraft => snake_draft(sorted, group_count),
    };

    Ok(groups)
}

/// Split the sorted list into contiguous bands; the first
/// `n % group_count` bands get one extra player.
fn rating_bands(sorted: Vec<RatedPlayer>, group_count: usize) -> Vec<Vec<RatedPlayer>> {
    let n = sorted.len();
    let base = n / group_count;
    let remainder = n % group_count;

    let mut groups = Vec::with_capacity(group_count);
    let mut players = sorted.into_iter();

    for index in 0..group_count {
        let size = if index < remainder { base + 1 } else { base };
        groups.push(players.by_ref().take(size).collect());
    }

    groups
}

/// Deal the sorted list across groups, reversing direction each pass
/// so every group ends up with a comparable rating mix.
fn snake_draft(sorted: Vec<RatedPlayer>, group_count: usize) -> Vec<Vec<RatedPlayer>> {
    let mut groups: Vec<Vec<RatedPlayer>> = vec![Vec::new(); group_count];

    for (index, player) in sorted.into_iter().enumerate() {
        let pass = index / group_count;
        let offset = index % group_count;

        let target = if pass % 2 == 0 {
            offset
        } else {
            group_count - 1 - offset
        };

        groups[target].push(player);
    }

    groups
}
