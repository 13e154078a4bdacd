//! League Simulator CLI Tool
//!
//! Command-line tool for exercising the full league workflow against the
//! in-memory store: register a roster, create a session, take attendance,
//! generate groups and matches, enter scores and finalize everything.
//!
//! Usage:
//!   cargo run --bin league-sim -- --help
//!   cargo run --bin league-sim -- --players 12 --group-count 2
//!   cargo run --bin league-sim -- --players 16 --group-count 3 --strategy snake --sessions 4

use anyhow::Result;
use clap::Parser;
use rally_point::config::{GroupingConfig, RatingConfig};
use rally_point::grouping::GroupingStrategy;
use rally_point::storage::InMemoryLeagueStore;
use rally_point::types::{Match, Team};
use rally_point::LeagueManager;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "league-sim")]
#[command(about = "Simulate full league sessions against the in-memory store")]
struct Cli {
    /// Number of players to register
    #[arg(short, long, default_value = "12")]
    players: usize,

    /// Number of groups per session
    #[arg(short, long, default_value = "2")]
    group_count: usize,

    /// Grouping strategy (bands or snake)
    #[arg(long, default_value = "bands")]
    strategy: String,

    /// Number of weekly sessions to simulate
    #[arg(short, long, default_value = "1")]
    sessions: u32,
}

const FIRST_NAMES: &[&str] = &[
    "Avery", "Blake", "Casey", "Devon", "Emery", "Finley", "Gray", "Harper", "Indie", "Jules",
    "Kendall", "Logan", "Morgan", "Noel", "Oakley", "Parker", "Quinn", "Reese", "Sage", "Tatum",
    "Umber", "Vale", "Wren", "Zion",
];

/// Deterministic score for a match: the stronger pairing wins, and the
/// margin widens with the rating gap.
fn simulate_score(ratings: &HashMap<String, i32>, m: &Match) -> (i32, i32) {
    let team_average = |team: Team| -> i32 {
        let members = m.team_members(team);
        members
            .iter()
            .map(|member| ratings.get(&member.player_id).copied().unwrap_or(1000))
            .sum::<i32>()
            / members.len() as i32
    };

    let avg1 = team_average(Team::One);
    let avg2 = team_average(Team::Two);
    let gap = (avg1 - avg2).abs();

    let loser_score = (9 - gap / 50).clamp(0, 9);
    if avg1 >= avg2 {
        (11, loser_score)
    } else {
        (loser_score, 11)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let strategy: GroupingStrategy = cli.strategy.parse()?;
    let grouping = GroupingConfig { strategy };
    let manager = LeagueManager::with_config(
        Arc::new(InMemoryLeagueStore::new()),
        RatingConfig::default(),
        grouping,
    );

    println!(
        "🏓 Simulating {} session(s): {} players, {} groups, {} strategy",
        cli.sessions, cli.players, cli.group_count, strategy
    );

    // Register the roster with a spread of starting ratings
    for index in 0..cli.players {
        let name = format!(
            "{} {}",
            FIRST_NAMES[index % FIRST_NAMES.len()],
            (b'A' + (index / FIRST_NAMES.len()) as u8) as char
        );
        let rating = 1300 - (index as i32 * 40);
        manager.register_player(&name, Some(rating)).await?;
    }

    for week in 1..=cli.sessions {
        let session = manager
            .create_session(
                &format!("Week {}", week),
                chrono::Utc::now() + chrono::Duration::weeks(week as i64),
            )
            .await?;

        let groups = manager.generate_groups(session.id, cli.group_count).await?;
        let matches = manager.generate_matches(session.id).await?;
        println!(
            "\n📅 {}: {} groups, {} matches",
            session.name,
            groups.len(),
            matches.len()
        );

        let ratings: HashMap<String, i32> = manager
            .list_players()
            .await?
            .into_iter()
            .map(|player| (player.id, player.rating))
            .collect();

        for m in &matches {
            let (score1, score2) = simulate_score(&ratings, m);
            manager.record_score(m.id, score1, score2).await?;

            let outcome = manager.finalize_match(m.id).await?;
            let applied: i32 = outcome.deltas.values().map(|d| d.abs()).sum();
            println!(
                "  Round {}: {}-{} finalized ({} rating points exchanged)",
                m.round, score1, score2, applied
            );
        }
    }

    // Final leaderboard
    let mut players = manager.list_players().await?;
    players.sort_by(|a, b| b.rating.cmp(&a.rating));

    println!("\n🏆 Final leaderboard:");
    for (rank, player) in players.iter().enumerate() {
        println!("  {:>2}. {:<12} {}", rank + 1, player.name, player.rating);
    }

    let stats = manager.get_stats().await?;
    println!(
        "\n📊 Totals: {} players, {} sessions, {} matches scheduled, {} finalized",
        stats.players_registered,
        stats.sessions_created,
        stats.matches_scheduled,
        stats.matches_finalized
    );

    Ok(())
}
