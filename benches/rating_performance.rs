//! Performance benchmarks for the league core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rally_point::config::{GroupingConfig, RatingConfig};
use rally_point::grouping::{partition, GroupingStrategy};
use rally_point::rating::DoublesEloEngine;
use rally_point::scheduling::round_robin_doubles;
use rally_point::storage::InMemoryLeagueStore;
use rally_point::types::RatedPlayer;
use rally_point::LeagueManager;
use std::sync::Arc;

fn ladder(count: usize) -> Vec<RatedPlayer> {
    (0..count)
        .map(|index| RatedPlayer {
            id: format!("player_{}", index),
            rating: 1600 - index as i32 * 25,
        })
        .collect()
}

fn bench_delta_computation(c: &mut Criterion) {
    let engine = DoublesEloEngine::default();
    let team1 = [
        RatedPlayer {
            id: "a".to_string(),
            rating: 1450,
        },
        RatedPlayer {
            id: "b".to_string(),
            rating: 1210,
        },
    ];
    let team2 = [
        RatedPlayer {
            id: "c".to_string(),
            rating: 1380,
        },
        RatedPlayer {
            id: "d".to_string(),
            rating: 1290,
        },
    ];

    c.bench_function("doubles_elo_deltas", |b| {
        b.iter(|| black_box(engine.compute_deltas(&team1, &team2, 11, 6)))
    });
}

fn bench_partition_strategies(c: &mut Criterion) {
    let players = ladder(24);

    c.bench_function("partition_rating_bands_24", |b| {
        b.iter(|| {
            black_box(partition(
                &players,
                4,
                GroupingStrategy::RatingBands,
            ))
        })
    });

    c.bench_function("partition_snake_draft_24", |b| {
        b.iter(|| black_box(partition(&players, 4, GroupingStrategy::SnakeDraft)))
    });
}

fn bench_schedule_generation(c: &mut Criterion) {
    let group_of_five = ladder(5);
    let group_of_six = ladder(6);

    c.bench_function("round_robin_doubles_5", |b| {
        b.iter(|| black_box(round_robin_doubles(&group_of_five)))
    });

    c.bench_function("round_robin_doubles_6", |b| {
        b.iter(|| black_box(round_robin_doubles(&group_of_six)))
    });
}

fn bench_full_finalization(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("finalize_full_session", |b| {
        b.iter(|| {
            rt.block_on(async {
                let manager = LeagueManager::with_config(
                    Arc::new(InMemoryLeagueStore::new()),
                    RatingConfig::default(),
                    GroupingConfig::default(),
                );

                for index in 0..8 {
                    manager
                        .register_player(
                            &format!("bench_player_{}", index),
                            Some(1500 - index * 50),
                        )
                        .await
                        .unwrap();
                }

                let session = manager
                    .create_session("bench", chrono::Utc::now())
                    .await
                    .unwrap();
                manager.generate_groups(session.id, 2).await.unwrap();
                let matches = manager.generate_matches(session.id).await.unwrap();

                for m in &matches {
                    manager.record_score(m.id, 11, 5).await.unwrap();
                    manager.finalize_match(m.id).await.unwrap();
                }

                black_box(manager.get_stats().await)
            })
        })
    });
}

criterion_group!(
    benches,
    bench_delta_computation,
    bench_partition_strategies,
    bench_schedule_generation,
    bench_full_finalization
);
criterion_main!(benches);
