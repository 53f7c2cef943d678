// src/services/normalizer.rs

//! Record normalizer.
//!
//! Turns raw platform items into canonical records and folds them into the
//! store. A batch is processed in two passes: contributions and reward
//! definitions first, identities second, so an identity always sees every
//! contribution of its batch regardless of array order.

use std::ops::AddAssign;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Contribution, ItemKind, RawItem, RewardDefinition};
use crate::storage::ReconciliationStore;

/// Attribute and relationship names read from raw items.
mod fields {
    pub const SUPPORTER_RELATIONS: [&str; 2] = ["patron", "user"];
    pub const REWARD_RELATION: &str = "reward";
    pub const CAMPAIGN_RELATION: &str = "campaign";
    pub const AMOUNT: [&str; 2] = ["amount_cents", "currently_entitled_amount_cents"];
    pub const CREATED_AT: [&str; 2] = ["created_at", "pledge_relationship_start"];
    pub const DECLINED_SINCE: &str = "declined_since";
    pub const PATRON_STATUS: &str = "patron_status";
    pub const ACTIVE_STATUS: &str = "active_patron";
    pub const TITLE: &str = "title";
    pub const NAMES: [&str; 5] = ["first_name", "full_name", "vanity", "display_name", "name"];
}

/// Canonical form of one raw item.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Contribution {
        supporter_id: String,
        contribution: Contribution,
    },
    Reward(RewardDefinition),
    Identity {
        id: String,
        display_name: String,
    },
    /// Declined/inactive contribution or reward of another campaign
    Dropped,
    /// Type the cache does not track
    Ignored,
}

/// Counters for one normalized batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub contributions: usize,
    pub rewards: usize,
    pub supporters: usize,
    pub dropped: usize,
    /// Identities without a recorded contribution
    pub unmatched: usize,
    pub ignored: usize,
}

impl AddAssign for BatchSummary {
    fn add_assign(&mut self, other: Self) {
        self.contributions += other.contributions;
        self.rewards += other.rewards;
        self.supporters += other.supporters;
        self.dropped += other.dropped;
        self.unmatched += other.unmatched;
        self.ignored += other.ignored;
    }
}

/// Converts raw items into canonical records scoped to one campaign.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    campaign_id: String,
}

impl RecordNormalizer {
    pub fn new(campaign_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
        }
    }

    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    /// Normalize a single raw item without touching any state.
    pub fn normalize(&self, item: &RawItem) -> Result<Record> {
        match item.item_kind() {
            ItemKind::Contribution => self.normalize_contribution(item),
            ItemKind::RewardDefinition => Ok(self.normalize_reward(item)),
            ItemKind::Supporter => Ok(Record::Identity {
                id: item.id.clone(),
                display_name: display_name(item),
            }),
            ItemKind::Unknown => Ok(Record::Ignored),
        }
    }

    /// Fold one batch of primary and related items into the store.
    ///
    /// The first malformed item aborts the rest of the batch; upserts made
    /// before it stay in the store.
    pub fn apply_batch(
        &self,
        store: &mut ReconciliationStore,
        primary: &[RawItem],
        included: &[RawItem],
    ) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        let mut identities = Vec::new();

        // Pass 1: contributions and reward definitions
        for item in primary.iter().chain(included) {
            match self.normalize(item)? {
                Record::Contribution {
                    supporter_id,
                    contribution,
                } => {
                    store.upsert_contribution(&supporter_id, contribution);
                    summary.contributions += 1;
                }
                Record::Reward(reward) => {
                    store.upsert_reward_definition(&reward.id, &reward.title);
                    summary.rewards += 1;
                }
                Record::Identity { id, display_name } => identities.push((id, display_name)),
                Record::Dropped => summary.dropped += 1,
                Record::Ignored => {
                    log::debug!("Ignoring item {} of type '{}'", item.id, item.kind);
                    summary.ignored += 1;
                }
            }
        }

        // Pass 2: identities joined onto known contributions
        for (id, display_name) in identities {
            if store.has_contribution(&id) {
                store.upsert_supporter(&id, &display_name)?;
                summary.supporters += 1;
            } else {
                summary.unmatched += 1;
            }
        }

        Ok(summary)
    }

    /// Id of the supporter a contribution item belongs to.
    pub fn supporter_id(item: &RawItem) -> Result<String> {
        fields::SUPPORTER_RELATIONS
            .iter()
            .find_map(|name| item.related_id(name))
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::normalization(&item.kind, &item.id, "missing patron relationship")
            })
    }

    fn normalize_contribution(&self, item: &RawItem) -> Result<Record> {
        if item.attr_is_set(fields::DECLINED_SINCE) {
            log::debug!("Dropping declined contribution {}", item.id);
            return Ok(Record::Dropped);
        }
        if let Some(status) = item.attr_str(fields::PATRON_STATUS) {
            if status != fields::ACTIVE_STATUS {
                log::debug!("Dropping {} contribution {}", status, item.id);
                return Ok(Record::Dropped);
            }
        }

        let supporter_id = Self::supporter_id(item)?;

        let amount_cents = fields::AMOUNT
            .iter()
            .find_map(|name| item.attr_u64(name))
            .ok_or_else(|| AppError::normalization(&item.kind, &item.id, "missing amount"))?;

        let raw_created_at = fields::CREATED_AT
            .iter()
            .find_map(|name| item.attr_str(name))
            .ok_or_else(|| AppError::normalization(&item.kind, &item.id, "missing created_at"))?;
        let created_at = parse_timestamp(raw_created_at)
            .map_err(|e| AppError::normalization(&item.kind, &item.id, e))?;

        let reward_id = item.related_id(fields::REWARD_RELATION).map(str::to_string);

        Ok(Record::Contribution {
            supporter_id,
            contribution: Contribution::new(amount_cents, created_at, reward_id),
        })
    }

    fn normalize_reward(&self, item: &RawItem) -> Record {
        match item.related_id(fields::CAMPAIGN_RELATION) {
            Some(campaign) if campaign == self.campaign_id => Record::Reward(RewardDefinition {
                id: item.id.clone(),
                title: item.attr_str(fields::TITLE).unwrap_or_default().to_string(),
            }),
            _ => Record::Dropped,
        }
    }
}

fn display_name(item: &RawItem) -> String {
    fields::NAMES
        .iter()
        .find_map(|name| item.attr_str(name))
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}
