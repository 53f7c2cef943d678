//! Supporter state storage.
//!
//! The cache keeps everything in memory; nothing survives a restart and a
//! bulk load rebuilds the whole store.

pub mod memory;

use chrono::{DateTime, Utc};
use serde::Serialize;

// Re-export for convenience
pub use memory::ReconciliationStore;

/// Counts describing the current store contents.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Joined supporters
    pub supporters: usize,
    /// Contributions, including ones still waiting for an identity
    pub contributions: usize,
    /// Reward definitions for the configured campaign
    pub rewards: usize,
    /// Amounts with a known reward
    pub cost_entries: usize,
    /// Completion time of the last bulk load
    pub loaded_at: Option<DateTime<Utc>>,
}
