//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the rally-point league
//! service using Prometheus metrics.

use crate::league::manager::LeagueManagerStats;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the league service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// League activity metrics
    league_metrics: LeagueMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// League activity metrics
#[derive(Clone)]
pub struct LeagueMetrics {
    /// Total players registered
    pub players_registered_total: IntCounter,

    /// Total sessions created
    pub sessions_created_total: IntCounter,

    /// Total group generations run
    pub groups_generated_total: IntCounter,

    /// Total matches written by the scheduler
    pub matches_scheduled_total: IntCounter,

    /// Total matches finalized exactly once
    pub matches_finalized_total: IntCounter,

    /// Finalize attempts lost to a concurrent caller
    pub finalize_conflicts_total: IntCounter,

    /// Distribution of absolute rating deltas applied
    pub rating_delta_magnitude: Histogram,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Finalization transaction time
    pub finalize_duration: Histogram,

    /// Group + match generation time
    pub generation_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let league_metrics = LeagueMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            league_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get league metrics
    pub fn league(&self) -> &LeagueMetrics {
        &self.league_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a successful finalization with its applied deltas
    pub fn record_finalization(&self, deltas: &std::collections::HashMap<String, i32>, duration: Duration) {
        self.league_metrics.matches_finalized_total.inc();
        self.performance_metrics
            .finalize_duration
            .observe(duration.as_secs_f64());

        for delta in deltas.values() {
            self.league_metrics
                .rating_delta_magnitude
                .observe(delta.abs() as f64);
        }
    }

    /// Record a finalize attempt that lost the race
    pub fn record_finalize_conflict(&self) {
        self.league_metrics.finalize_conflicts_total.inc();
    }

    /// Record a generation pass (groups or matches)
    pub fn record_generation(&self, duration: Duration) {
        self.performance_metrics
            .generation_duration
            .observe(duration.as_secs_f64());
    }

    /// Update health status (0=unhealthy, 1=degraded, 2=healthy)
    pub fn update_health_status(&self, status: i64) {
        self.service_metrics.health_status.set(status);
    }

    /// Update health status for a specific component
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(if healthy { 1 } else { 0 });
    }

    /// Update counters from league manager stats
    pub fn update_from_league_stats(&self, stats: &LeagueManagerStats) {
        let league = &self.league_metrics;

        // Counters only move forward; take the difference against what
        // the stats snapshot reports
        let bump = |counter: &IntCounter, total: u64| {
            let seen = counter.get();
            if total > seen {
                counter.inc_by(total - seen);
            }
        };

        bump(&league.players_registered_total, stats.players_registered);
        bump(&league.sessions_created_total, stats.sessions_created);
        bump(&league.groups_generated_total, stats.groups_generated);
        bump(&league.matches_scheduled_total, stats.matches_scheduled);
        bump(&league.matches_finalized_total, stats.matches_finalized);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds = IntGauge::with_opts(Opts::new(
            "rally_point_uptime_seconds",
            "Service uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::with_opts(Opts::new(
            "rally_point_health_status",
            "Overall health status (0=unhealthy, 1=degraded, 2=healthy)",
        ))?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new(
                "rally_point_component_health",
                "Per-component health (0=unhealthy, 1=healthy)",
            ),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
        })
    }
}

impl LeagueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let players_registered_total = IntCounter::with_opts(Opts::new(
            "rally_point_players_registered_total",
            "Total players registered",
        ))?;
        registry.register(Box::new(players_registered_total.clone()))?;

        let sessions_created_total = IntCounter::with_opts(Opts::new(
            "rally_point_sessions_created_total",
            "Total sessions created",
        ))?;
        registry.register(Box::new(sessions_created_total.clone()))?;

        let groups_generated_total = IntCounter::with_opts(Opts::new(
            "rally_point_groups_generated_total",
            "Total groups written by generation",
        ))?;
        registry.register(Box::new(groups_generated_total.clone()))?;

        let matches_scheduled_total = IntCounter::with_opts(Opts::new(
            "rally_point_matches_scheduled_total",
            "Total matches written by the scheduler",
        ))?;
        registry.register(Box::new(matches_scheduled_total.clone()))?;

        let matches_finalized_total = IntCounter::with_opts(Opts::new(
            "rally_point_matches_finalized_total",
            "Total matches finalized",
        ))?;
        registry.register(Box::new(matches_finalized_total.clone()))?;

        let finalize_conflicts_total = IntCounter::with_opts(Opts::new(
            "rally_point_finalize_conflicts_total",
            "Finalize attempts that lost to a concurrent caller",
        ))?;
        registry.register(Box::new(finalize_conflicts_total.clone()))?;

        let rating_delta_magnitude = Histogram::with_opts(
            HistogramOpts::new(
                "rally_point_rating_delta_magnitude",
                "Absolute per-player rating deltas applied at finalization",
            )
            .buckets(vec![1.0, 2.0, 4.0, 8.0, 12.0, 18.0, 24.0, 36.0]),
        )?;
        registry.register(Box::new(rating_delta_magnitude.clone()))?;

        Ok(Self {
            players_registered_total,
            sessions_created_total,
            groups_generated_total,
            matches_scheduled_total,
            matches_finalized_total,
            finalize_conflicts_total,
            rating_delta_magnitude,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let finalize_duration = Histogram::with_opts(
            HistogramOpts::new(
                "rally_point_finalize_duration_seconds",
                "Time spent inside the finalization transaction",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(finalize_duration.clone()))?;

        let generation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "rally_point_generation_duration_seconds",
                "Time spent generating groups or matches for a session",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(generation_duration.clone()))?;

        Ok(Self {
            finalize_duration,
            generation_duration,
        })
    }
}
