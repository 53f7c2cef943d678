//! Diff calculation between supporter snapshots.
//!
//! Used when a platform signals "something changed" without a usable
//! payload: the cache reloads and reports which supporters appeared,
//! changed or went away.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::SupporterView;

/// Changes between two snapshots, each list ordered by id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SupporterDiff {
    pub added: Vec<SupporterView>,
    pub updated: Vec<SupporterView>,
    pub removed: Vec<String>,
}

impl SupporterDiff {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty() || !self.removed.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }
}

/// Calculate the diff between previous and current snapshots.
pub fn calculate_diff(previous: &[SupporterView], current: &[SupporterView]) -> SupporterDiff {
    let prev_map: HashMap<&str, &SupporterView> =
        previous.iter().map(|s| (s.id.as_str(), s)).collect();
    let curr_map: HashMap<&str, &SupporterView> =
        current.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut diff = SupporterDiff::default();

    for (id, curr) in &curr_map {
        match prev_map.get(id) {
            None => diff.added.push((*curr).clone()),
            Some(prev) if prev != curr => diff.updated.push((*curr).clone()),
            Some(_) => {}
        }
    }

    diff.removed = prev_map
        .keys()
        .filter(|id| !curr_map.contains_key(*id))
        .map(|id| id.to_string())
        .collect();

    diff.added.sort_by(|a, b| a.id.cmp(&b.id));
    diff.updated.sort_by(|a, b| a.id.cmp(&b.id));
    diff.removed.sort();
    diff
}
