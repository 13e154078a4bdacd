//! Round-robin doubles scheduling
//!
//! This module emits the fixed doubles schedule for a group of 4-6
//! players. The pairing tables are deliberately non-optimizing; they
//! reproduce the league's established rotation exactly.

use crate::error::LeagueError;
use crate::types::{PlayerId, RatedPlayer};
use serde::{Deserialize, Serialize};

/// One scheduled doubles match between two index-paired teams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMatch {
    /// 1-based round number in emission order
    pub round: u32,
    pub team1: [PlayerId; 2],
    pub team2: [PlayerId; 2],
}

/// Build the round-robin doubles schedule for a group.
///
/// Players are sorted descending by rating before index-based pairing,
/// so index 0 is the strongest player. With 4 players every pair
/// partners exactly once across 3 matches; with 5, each player sits
/// out exactly one of 5 matches; with 6, a fixed 5-round table keeps
/// player 0 on court every round with rotating partners.
pub fn round_robin_doubles(
    players: &[RatedPlayer],
) -> crate::error::Result<Vec<ScheduledMatch>> {
    if !(4..=6).contains(&players.len()) {
        return Err(LeagueError::UnsupportedGroupSize {
            size: players.len(),
        }
        .into());
    }

    let mut sorted: Vec<RatedPlayer> = players.to_vec();
    sorted.sort_by(|a, b| b.rating.cmp(&a.rating));

    let ids: Vec<PlayerId> = sorted.into_iter().map(|p| p.id).collect();

    let pairings: Vec<([usize; 2], [usize; 2])> = match ids.len() {
        4 => vec![
            ([0, 3], [1, 2]),
            ([0, 2], [1, 3]),
            ([0, 1], [2, 3]),
        ],
        5 => (0..5)
            .map(|bye| {
                let playing: Vec<usize> = (0..5).filter(|&i| i != bye).collect();
                ([playing[0], playing[3]], [playing[1], playing[2]])
            })
            .collect(),
        6 => vec![
            ([0, 5], [1, 4]),
            ([0, 4], [2, 5]),
            ([0, 3], [1, 5]),
            ([0, 2], [3, 5]),
            ([0, 1], [2, 4]),
        ],
        _ => unreachable!("group size bounds checked above"),
    };

    let matches = pairings
        .into_iter()
        .enumerate()
        .map(|(index, (team1, team2))| ScheduledMatch {
            round: index as u32 + 1,
            team1: [ids[team1[0]].clone(), ids[team1[1]].clone()],
            team2: [ids[team2[0]].clone(), ids[team2[1]].clone()],
        })
        .collect();

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn roster(count: usize) -> Vec<RatedPlayer> {
        // Descending ratings so sorted order matches id order
        (0..count)
            .map(|index| RatedPlayer {
                id: format!("p{}", index),
                rating: 2000 - index as i32 * 100,
            })
            .collect()
    }

    fn appearances(matches: &[ScheduledMatch]) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for m in matches {
            for id in m.team1.iter().chain(m.team2.iter()) {
                *counts.entry(id.as_str()).or_insert(0) += 1;
            }
        }
        counts
    }

    #[test]
    fn test_four_players_exact_schedule() {
        let matches = round_robin_doubles(&roster(4)).unwrap();

        assert_eq!(matches.len(), 3);
        assert_eq!(
            matches[0],
            ScheduledMatch {
                round: 1,
                team1: ["p0".into(), "p3".into()],
                team2: ["p1".into(), "p2".into()],
            }
        );
        assert_eq!(
            matches[1],
            ScheduledMatch {
                round: 2,
                team1: ["p0".into(), "p2".into()],
                team2: ["p1".into(), "p3".into()],
            }
        );
        assert_eq!(
            matches[2],
            ScheduledMatch {
                round: 3,
                team1: ["p0".into(), "p1".into()],
                team2: ["p2".into(), "p3".into()],
            }
        );
    }

    #[test]
    fn test_four_players_everyone_partners_once() {
        let matches = round_robin_doubles(&roster(4)).unwrap();

        let mut partner_pairs = HashSet::new();
        for m in &matches {
            for team in [&m.team1, &m.team2] {
                let mut pair = [team[0].as_str(), team[1].as_str()];
                pair.sort_unstable();
                assert!(
                    partner_pairs.insert(pair),
                    "pair {:?} partnered twice",
                    pair
                );
            }
        }

        // C(4,2) = 6 distinct pairs across 3 matches
        assert_eq!(partner_pairs.len(), 6);
    }

    #[test]
    fn test_five_players_one_bye_each() {
        let matches = round_robin_doubles(&roster(5)).unwrap();

        assert_eq!(matches.len(), 5);

        // Each player appears in exactly 4 of 5 matches
        let counts = appearances(&matches);
        assert_eq!(counts.len(), 5);
        assert!(counts.values().all(|&count| count == 4));

        // Round 1 byes the strongest player
        assert_eq!(
            matches[0],
            ScheduledMatch {
                round: 1,
                team1: ["p1".into(), "p4".into()],
                team2: ["p2".into(), "p3".into()],
            }
        );
    }

    #[test]
    fn test_six_players_fixed_table() {
        let matches = round_robin_doubles(&roster(6)).unwrap();

        assert_eq!(matches.len(), 5);

        let expected: Vec<([&str; 2], [&str; 2])> = vec![
            (["p0", "p5"], ["p1", "p4"]),
            (["p0", "p4"], ["p2", "p5"]),
            (["p0", "p3"], ["p1", "p5"]),
            (["p0", "p2"], ["p3", "p5"]),
            (["p0", "p1"], ["p2", "p4"]),
        ];

        for (index, (team1, team2)) in expected.into_iter().enumerate() {
            assert_eq!(matches[index].round, index as u32 + 1);
            assert_eq!(matches[index].team1, team1.map(String::from));
            assert_eq!(matches[index].team2, team2.map(String::from));
        }
    }

    #[test]
    fn test_unsupported_sizes() {
        for count in [0, 1, 3, 7, 12] {
            let err = round_robin_doubles(&roster(count)).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<LeagueError>(),
                Some(LeagueError::UnsupportedGroupSize { size }) if *size == count
            ));
        }
    }

    #[test]
    fn test_sorts_by_rating_before_pairing() {
        // Shuffled input: p2 is the strongest, p0 the weakest
        let players = vec![
            RatedPlayer {
                id: "p0".into(),
                rating: 900,
            },
            RatedPlayer {
                id: "p1".into(),
                rating: 1100,
            },
            RatedPlayer {
                id: "p2".into(),
                rating: 1500,
            },
            RatedPlayer {
                id: "p3".into(),
                rating: 1300,
            },
        ];

        let matches = round_robin_doubles(&players).unwrap();

        // Round 1 pairs best with worst: p2+p0 vs p3+p1
        assert_eq!(matches[0].team1, ["p2".to_string(), "p0".to_string()]);
        assert_eq!(matches[0].team2, ["p3".to_string(), "p1".to_string()]);
    }
}
