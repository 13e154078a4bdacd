//! Grouping configuration

use crate::grouping::GroupingStrategy;
use serde::{Deserialize, Serialize};

/// How session groups are formed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Partition strategy; rating bands unless configured otherwise
    pub strategy: GroupingStrategy,
}
