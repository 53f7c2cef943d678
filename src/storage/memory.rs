//! In-memory reconciliation store.
//!
//! Holds every index the cache needs:
//!
//! ```text
//! contributions  supporter id -> Contribution   (joined or still pending)
//! names          supporter id -> display name   (present once joined)
//! rewards        reward id    -> title          (configured campaign only)
//! cost_index     amount cents -> reward id      (reward inference)
//! ```
//!
//! A supporter exists exactly when both a contribution and a display name are
//! recorded for the same id.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Contribution, Supporter};
use crate::storage::StoreStats;

#[derive(Debug, Clone, Default)]
pub struct ReconciliationStore {
    contributions: HashMap<String, Contribution>,
    names: HashMap<String, String>,
    rewards: BTreeMap<String, String>,
    cost_index: HashMap<u64, String>,
    loaded_at: Option<DateTime<Utc>>,
}

impl ReconciliationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contribution for `id` and feed the cost index.
    ///
    /// The index only ever learns non-null rewards; the last one seen for an
    /// amount wins.
    pub fn upsert_contribution(&mut self, id: &str, contribution: Contribution) {
        if let Some(reward_id) = &contribution.reward_id {
            self.cost_index
                .insert(contribution.amount_cents, reward_id.clone());
        }
        self.contributions.insert(id.to_string(), contribution);
    }

    pub fn upsert_reward_definition(&mut self, id: &str, title: &str) {
        self.rewards.insert(id.to_string(), title.to_string());
    }

    /// Join a display name onto an already recorded contribution.
    pub fn upsert_supporter(&mut self, id: &str, display_name: &str) -> Result<()> {
        if !self.contributions.contains_key(id) {
            return Err(AppError::normalization(
                "user",
                id,
                "no recorded contribution for supporter",
            ));
        }
        self.names.insert(id.to_string(), display_name.to_string());
        Ok(())
    }

    /// Drop a supporter together with its contribution.
    ///
    /// Returns whether anything was removed. The cost index is left alone.
    pub fn remove_supporter(&mut self, id: &str) -> bool {
        let had_name = self.names.remove(id).is_some();
        let had_contribution = self.contributions.remove(id).is_some();
        had_name || had_contribution
    }

    /// Fill missing rewards of every supporter from the cost index.
    ///
    /// Returns the number of contributions that gained a reward.
    pub fn resolve_rewards(&mut self) -> usize {
        let ids: Vec<String> = self.names.keys().cloned().collect();
        ids.iter()
            .filter(|id| self.resolve_rewards_for(id))
            .count()
    }

    /// Fill the missing reward of a single supporter.
    pub fn resolve_rewards_for(&mut self, id: &str) -> bool {
        if !self.names.contains_key(id) {
            return false;
        }
        let Some(contribution) = self.contributions.get_mut(id) else {
            return false;
        };
        if contribution.reward_id.is_some() {
            return false;
        }
        match self.cost_index.get(&contribution.amount_cents) {
            Some(reward_id) => {
                contribution.reward_id = Some(reward_id.clone());
                true
            }
            None => false,
        }
    }

    /// Reset every index ahead of a bulk load.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn mark_loaded(&mut self) {
        self.loaded_at = Some(Utc::now());
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }

    pub fn has_contribution(&self, id: &str) -> bool {
        self.contributions.contains_key(id)
    }

    /// Joined supporter record for `id`.
    pub fn supporter(&self, id: &str) -> Option<Supporter> {
        let display_name = self.names.get(id)?;
        let contribution = self.contributions.get(id)?;
        Some(Supporter {
            id: id.to_string(),
            display_name: display_name.clone(),
            contribution: contribution.clone(),
        })
    }

    /// All joined supporters, in no particular order.
    pub fn supporters(&self) -> Vec<Supporter> {
        self.names
            .keys()
            .filter_map(|id| self.supporter(id))
            .collect()
    }

    pub fn rewards(&self) -> &BTreeMap<String, String> {
        &self.rewards
    }

    pub fn reward_for_cost(&self, amount_cents: u64) -> Option<&str> {
        self.cost_index.get(&amount_cents).map(String::as_str)
    }

    /// Number of joined supporters.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            supporters: self.names.len(),
            contributions: self.contributions.len(),
            rewards: self.rewards.len(),
            cost_entries: self.cost_index.len(),
            loaded_at: self.loaded_at,
        }
    }
}
