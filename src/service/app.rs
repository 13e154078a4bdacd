//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the storage
//! collaborator, league manager, metrics and the health server, and
//! owns the background maintenance tasks.

use crate::config::AppConfig;
use crate::league::manager::LeagueManager;
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector};
use crate::storage::{InMemoryLeagueStore, LeagueStore};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Core league orchestration
    league_manager: Arc<LeagueManager>,

    /// Metrics collector shared with the health server
    metrics_collector: Arc<MetricsCollector>,

    /// HTTP server for health and metrics endpoints
    health_server: Arc<HealthServer>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing rally-point league service");
        info!(
            "Configuration: service={}, grouping={}",
            config.service.name, config.grouping.strategy
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let store: Arc<dyn LeagueStore> = Arc::new(InMemoryLeagueStore::new());

        let league_manager = Arc::new(LeagueManager::with_metrics(
            store,
            config.rating.clone(),
            config.grouping.clone(),
            metrics_collector.clone(),
        ));

        let health_config = HealthServerConfig {
            port: config.service.http_port,
            host: "0.0.0.0".to_string(),
        };
        let health_server = Arc::new(HealthServer::new(health_config, metrics_collector.clone()));

        Ok(Self {
            config,
            league_manager,
            metrics_collector,
            health_server,
            background_tasks: Vec::new(),
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Start the health server and background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting rally-point league service");

        // Mark as running
        *self.is_running.write().await = true;

        self.start_health_server().await?;
        self.start_background_tasks().await?;

        info!("Rally-point league service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of rally-point service");

        // Mark as not running
        *self.is_running.write().await = false;

        // Stop background tasks
        self.stop_background_tasks().await;

        // Stop the health server
        if let Err(e) = self.health_server.stop().await {
            warn!("Failed to stop health server: {}", e);
        }

        // Get final statistics
        let final_stats = self
            .league_manager
            .get_stats()
            .await
            .map_err(|e| ServiceError::BackgroundTask {
                message: format!("Failed to get final stats: {}", e),
            })?;

        info!("Final service statistics: {:?}", final_stats);
        info!("Rally-point service shutdown completed");

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the league manager for operations
    pub fn league_manager(&self) -> Arc<LeagueManager> {
        self.league_manager.clone()
    }

    /// Get the metrics collector
    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    /// Start the health and metrics HTTP server
    async fn start_health_server(&mut self) -> Result<(), ServiceError> {
        info!(
            "Starting health and metrics endpoints on port {}",
            self.config.service.http_port
        );

        let health_server = self.health_server.clone();
        let server_handle = tokio::spawn(async move {
            if let Err(e) = health_server.start().await {
                error!("Health server failed: {}", e);
            } else {
                info!("Health server task completed");
            }
        });

        self.background_tasks.push(server_handle);

        // Give the server a moment to start up
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        Ok(())
    }

    /// Start background maintenance tasks
    async fn start_background_tasks(&mut self) -> Result<(), ServiceError> {
        info!("Starting background maintenance tasks...");

        // League stats metrics task
        let metrics_task = {
            let league_manager = self.league_manager.clone();
            let metrics_collector = self.metrics_collector.clone();
            let is_running = self.is_running.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(30));
                info!("Metrics update task started");

                while *is_running.read().await {
                    interval.tick().await;

                    match league_manager.get_stats().await {
                        Ok(stats) => {
                            debug!(
                                "Updating metrics - players: {}, matches scheduled: {}, finalized: {}",
                                stats.players_registered,
                                stats.matches_scheduled,
                                stats.matches_finalized
                            );
                            metrics_collector.update_from_league_stats(&stats);
                        }
                        Err(e) => {
                            warn!("Failed to get league stats for metrics update: {}", e);
                        }
                    }
                }

                info!("Metrics update task stopped");
            })
        };

        // Service health metrics task
        let health_metrics_task = {
            let metrics_collector = self.metrics_collector.clone();
            let is_running = self.is_running.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(60));
                let start_time = tokio::time::Instant::now();
                info!("Health metrics task started");

                while *is_running.read().await {
                    interval.tick().await;

                    let uptime_seconds = start_time.elapsed().as_secs() as i64;
                    metrics_collector
                        .service()
                        .uptime_seconds
                        .set(uptime_seconds);

                    metrics_collector.update_health_status(2); // 2 = healthy
                    metrics_collector.update_component_health("league_manager", true);
                    metrics_collector.update_component_health("storage", true);
                }

                info!("Health metrics task stopped");
            })
        };

        self.background_tasks.push(metrics_task);
        self.background_tasks.push(health_metrics_task);

        info!("Background maintenance tasks started successfully");
        Ok(())
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        for (i, task) in self.background_tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        // Give tasks time to clean up gracefully
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        info!("All {} background tasks stopped", task_count);
    }
}
