// src/services/updater.rs

//! Incremental updater.
//!
//! Applies one already-verified webhook event to a loaded store. Each event
//! is a single step: delete, or create/update followed by reward resolution
//! for the touched supporter.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{ItemKind, Supporter, WebhookPayload};
use crate::services::RecordNormalizer;
use crate::storage::ReconciliationStore;

/// Kind of push-update event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Create,
    Update,
    Delete,
}

impl FromStr for EventKind {
    type Err = AppError;

    /// Accepts `resource:action` headers (e.g. `pledges:create`,
    /// `members:pledge:delete`) as well as bare actions.
    fn from_str(header: &str) -> Result<Self> {
        let action = header.trim().rsplit(':').next().unwrap_or_default();
        match action.to_ascii_lowercase().as_str() {
            "create" => Ok(EventKind::Create),
            "update" => Ok(EventKind::Update),
            "delete" => Ok(EventKind::Delete),
            _ => Err(AppError::UnsupportedEvent(header.to_string())),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Create => write!(f, "create"),
            EventKind::Update => write!(f, "update"),
            EventKind::Delete => write!(f, "delete"),
        }
    }
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "supporter", rename_all = "lowercase")]
pub enum WebhookOutcome {
    /// Create/update: the supporter as it now stands, if joined
    Updated(Option<Supporter>),
    /// Delete: bare acknowledgement
    Acknowledged,
}

/// Applies webhook events through the shared normalizer.
#[derive(Debug, Clone)]
pub struct IncrementalUpdater {
    normalizer: RecordNormalizer,
}

impl IncrementalUpdater {
    pub fn new(normalizer: RecordNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn apply(
        &self,
        store: &mut ReconciliationStore,
        kind: EventKind,
        payload: &WebhookPayload,
    ) -> Result<WebhookOutcome> {
        if !store.is_loaded() {
            return Err(AppError::precondition(
                "webhook received before the initial bulk load",
            ));
        }

        let primary = &payload.data;
        if primary.item_kind() != ItemKind::Contribution {
            return Err(AppError::normalization(
                &primary.kind,
                &primary.id,
                "webhook primary item is not a contribution",
            ));
        }
        let supporter_id = RecordNormalizer::supporter_id(primary)?;

        match kind {
            EventKind::Delete => {
                let removed = store.remove_supporter(&supporter_id);
                log::info!("Webhook delete for supporter {} (removed: {})", supporter_id, removed);
                Ok(WebhookOutcome::Acknowledged)
            }
            EventKind::Create | EventKind::Update => {
                let summary = self.normalizer.apply_batch(
                    store,
                    std::slice::from_ref(primary),
                    &payload.included,
                )?;
                store.resolve_rewards_for(&supporter_id);
                log::info!(
                    "Webhook {} for supporter {} ({} contributions, {} supporters, {} dropped)",
                    kind,
                    supporter_id,
                    summary.contributions,
                    summary.supporters,
                    summary.dropped
                );
                Ok(WebhookOutcome::Updated(store.supporter(&supporter_id)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contribution, RawItem};

    fn pledge(supporter: &str, amount: u64, reward: Option<&str>) -> RawItem {
        let item = RawItem::new("pledge", format!("pledge-{supporter}"))
            .with_attr("amount_cents", amount)
            .with_attr("created_at", "2021-03-01T12:00:00Z")
            .with_relation("patron", "user", supporter);
        match reward {
            Some(id) => item.with_relation("reward", "reward", id),
            None => item,
        }
    }

    fn loaded_store() -> ReconciliationStore {
        let mut store = ReconciliationStore::new();
        let created = "2020-01-01T00:00:00Z".parse().unwrap();
        store.upsert_contribution("b", Contribution::new(500, created, Some("r1".to_string())));
        store.upsert_supporter("b", "Bea").unwrap();
        store.mark_loaded();
        store
    }

    fn updater() -> IncrementalUpdater {
        IncrementalUpdater::new(RecordNormalizer::new("c1"))
    }

    #[test]
    fn test_event_kind_parsing() {
        assert_eq!("pledges:create".parse::<EventKind>().unwrap(), EventKind::Create);
        assert_eq!("members:pledge:update".parse::<EventKind>().unwrap(), EventKind::Update);
        assert_eq!("DELETE".parse::<EventKind>().unwrap(), EventKind::Delete);
        assert!(matches!(
            "pledges:refund".parse::<EventKind>(),
            Err(AppError::UnsupportedEvent(_))
        ));
        assert!("".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_requires_loaded_store() {
        let mut store = ReconciliationStore::new();
        let payload = WebhookPayload {
            data: pledge("a", 500, None),
            included: vec![RawItem::new("user", "a").with_attr("first_name", "Ada")],
        };
        let result = updater().apply(&mut store, EventKind::Create, &payload);
        assert!(matches!(result, Err(AppError::Precondition(_))));
        assert!(!store.has_contribution("a"));
    }

    #[test]
    fn test_create_joins_and_infers_reward() {
        let mut store = loaded_store();
        let payload = WebhookPayload {
            data: pledge("a", 500, None),
            included: vec![RawItem::new("user", "a").with_attr("first_name", "Ada")],
        };

        let outcome = updater().apply(&mut store, EventKind::Create, &payload).unwrap();
        let WebhookOutcome::Updated(Some(supporter)) = outcome else {
            panic!("expected an updated supporter");
        };
        assert_eq!(supporter.display_name, "Ada");
        assert_eq!(supporter.contribution.reward_id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_update_replaces_contribution_in_place() {
        let mut store = loaded_store();
        let payload = WebhookPayload {
            data: pledge("b", 1500, Some("r2")),
            included: vec![],
        };

        let outcome = updater().apply(&mut store, EventKind::Update, &payload).unwrap();
        let WebhookOutcome::Updated(Some(supporter)) = outcome else {
            panic!("expected an updated supporter");
        };
        assert_eq!(supporter.display_name, "Bea");
        assert_eq!(supporter.contribution.amount_cents, 1500);
        assert_eq!(store.reward_for_cost(1500), Some("r2"));
    }

    #[test]
    fn test_delete_is_idempotent_and_keeps_cost_index() {
        let mut store = loaded_store();
        let payload = WebhookPayload {
            data: pledge("b", 500, Some("r1")),
            included: vec![],
        };

        let first = updater().apply(&mut store, EventKind::Delete, &payload).unwrap();
        let after_first = store.stats();
        let second = updater().apply(&mut store, EventKind::Delete, &payload).unwrap();

        assert_eq!(first, WebhookOutcome::Acknowledged);
        assert_eq!(second, WebhookOutcome::Acknowledged);
        assert_eq!(store.stats().supporters, after_first.supporters);
        assert_eq!(store.stats().contributions, after_first.contributions);
        assert!(store.supporter("b").is_none());
        assert_eq!(store.reward_for_cost(500), Some("r1"));
    }

    #[test]
    fn test_primary_must_be_contribution() {
        let mut store = loaded_store();
        let payload = WebhookPayload {
            data: RawItem::new("user", "b"),
            included: vec![],
        };
        assert!(matches!(
            updater().apply(&mut store, EventKind::Update, &payload),
            Err(AppError::Normalization { .. })
        ));
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(WebhookOutcome::Acknowledged).unwrap();
        assert_eq!(json["status"], "acknowledged");
    }
}
