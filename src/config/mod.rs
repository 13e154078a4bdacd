//! Configuration management for the rally-point service
//!
//! This module handles all configuration loading from environment variables
//! and TOML files, validation, and default values for the league service.

pub mod app;
pub mod grouping;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings};
pub use grouping::GroupingConfig;
pub use rating::RatingConfig;
