//! Sorted read snapshots of the store.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::SupporterView;
use crate::storage::ReconciliationStore;

/// Ordering requested by a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Largest contribution first, oldest first among equals
    Amount,
    /// Oldest contribution first
    #[default]
    CreatedAt,
}

impl SortKey {
    /// `"amount"` selects [`SortKey::Amount`]; anything else sorts by date.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("amount") => SortKey::Amount,
            _ => SortKey::CreatedAt,
        }
    }

    fn compare(self, a: &SupporterView, b: &SupporterView) -> Ordering {
        let by_amount = match self {
            SortKey::Amount => b.amount_cents.cmp(&a.amount_cents),
            SortKey::CreatedAt => Ordering::Equal,
        };
        by_amount
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Supporters plus the reward title map.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub supporters: Vec<SupporterView>,
    pub rewards: BTreeMap<String, String>,
}

/// Read-only projection over the store.
pub struct QueryView<'a> {
    store: &'a ReconciliationStore,
}

impl<'a> QueryView<'a> {
    pub fn new(store: &'a ReconciliationStore) -> Self {
        Self { store }
    }

    pub fn find(&self, sort: SortKey) -> Snapshot {
        let mut supporters: Vec<SupporterView> = self
            .store
            .supporters()
            .iter()
            .map(SupporterView::from)
            .collect();
        sort_supporters(&mut supporters, sort);

        Snapshot {
            supporters,
            rewards: self.store.rewards().clone(),
        }
    }
}

pub fn sort_supporters(rows: &mut [SupporterView], sort: SortKey) {
    rows.sort_by(|a, b| sort.compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Contribution;

    fn store_with(rows: &[(&str, u64, &str)]) -> ReconciliationStore {
        let mut store = ReconciliationStore::new();
        for (id, amount, created) in rows {
            let created_at = created.parse().unwrap();
            store.upsert_contribution(id, Contribution::new(*amount, created_at, None));
            store.upsert_supporter(id, id).unwrap();
        }
        store.upsert_reward_definition("r1", "Avocado");
        store
    }

    fn ids(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.supporters.iter().map(|s| s.id.as_str()).collect()
    }

    const ROWS: [(&str, u64, &str); 4] = [
        ("a", 500, "2020-03-01T00:00:00Z"),
        ("b", 2499, "2020-05-01T00:00:00Z"),
        ("c", 500, "2020-01-01T00:00:00Z"),
        ("d", 999, "2020-02-01T00:00:00Z"),
    ];

    #[test]
    fn test_sort_by_amount() {
        let store = store_with(&ROWS);
        let snapshot = QueryView::new(&store).find(SortKey::Amount);
        assert_eq!(ids(&snapshot), vec!["b", "d", "c", "a"]);

        for pair in snapshot.supporters.windows(2) {
            assert!(pair[0].amount_cents >= pair[1].amount_cents);
            if pair[0].amount_cents == pair[1].amount_cents {
                assert!(pair[0].created_at <= pair[1].created_at);
            }
        }
    }

    #[test]
    fn test_sort_by_date() {
        let store = store_with(&ROWS);
        let snapshot = QueryView::new(&store).find(SortKey::CreatedAt);
        assert_eq!(ids(&snapshot), vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_sort_key_from_query() {
        assert_eq!(SortKey::from_query(Some("amount")), SortKey::Amount);
        assert_eq!(SortKey::from_query(Some("name")), SortKey::CreatedAt);
        assert_eq!(SortKey::from_query(None), SortKey::CreatedAt);
    }

    #[test]
    fn test_find_includes_rewards_and_leaves_store_alone() {
        let store = store_with(&ROWS);
        let before = store.stats();
        let snapshot = QueryView::new(&store).find(SortKey::Amount);

        assert_eq!(snapshot.rewards.get("r1").map(String::as_str), Some("Avocado"));
        assert_eq!(store.stats().supporters, before.supporters);
    }
}
