//! Metrics and monitoring for the rally-point service
//!
//! This module provides Prometheus metrics collection and HTTP endpoints
//! for health checks and metrics scraping.

pub mod collector;
pub mod health;

// Re-export commonly used types
pub use collector::MetricsCollector;
pub use health::{HealthServer, HealthServerConfig};
