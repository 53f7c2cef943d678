//! Canonical supporter records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The monetary/tier record tied to one supporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub amount_cents: u64,
    pub created_at: DateTime<Utc>,
    pub reward_id: Option<String>,
}

impl Contribution {
    pub fn new(amount_cents: u64, created_at: DateTime<Utc>, reward_id: Option<String>) -> Self {
        Self {
            amount_cents,
            created_at,
            reward_id,
        }
    }
}

/// A person backing the campaign or channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supporter {
    pub id: String,
    pub display_name: String,
    pub contribution: Contribution,
}

/// A named tier a contribution may reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDefinition {
    pub id: String,
    pub title: String,
}

/// Flattened supporter row returned by reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupporterView {
    pub id: String,
    pub display_name: String,
    pub amount_cents: u64,
    pub created_at: DateTime<Utc>,
    pub reward_id: Option<String>,
}

impl From<&Supporter> for SupporterView {
    fn from(supporter: &Supporter) -> Self {
        Self {
            id: supporter.id.clone(),
            display_name: supporter.display_name.clone(),
            amount_cents: supporter.contribution.amount_cents,
            created_at: supporter.contribution.created_at,
            reward_id: supporter.contribution.reward_id.clone(),
        }
    }
}
