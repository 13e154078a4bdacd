//! Rally Point - League management service for pickleball doubles
//!
//! This crate provides player tracking, rating-balanced grouping,
//! round-robin doubles scheduling and exactly-once Elo finalization
//! for recreational league sessions.

pub mod config;
pub mod error;
pub mod grouping;
pub mod league;
pub mod metrics;
pub mod rating;
pub mod scheduling;
pub mod service;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{LeagueError, Result};
pub use types::*;

// Re-export key components
pub use league::{FinalizationCoordinator, LeagueManager};
pub use storage::{InMemoryLeagueStore, LeagueStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
