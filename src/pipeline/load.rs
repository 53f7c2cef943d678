// src/pipeline/load.rs

//! Bulk load: fetch every page, normalize, resolve rewards.

use chrono::Utc;
use serde::Serialize;

use crate::error::Result;
use crate::services::{BatchSummary, PageFetcher, PageSource, RecordNormalizer};
use crate::storage::ReconciliationStore;

/// What one bulk load did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub pages: usize,
    pub contributions: usize,
    pub rewards: usize,
    pub supporters: usize,
    pub dropped: usize,
    pub unmatched: usize,
    pub ignored: usize,
    /// Supporters whose reward was inferred from the cost index
    pub inferred_rewards: usize,
    pub elapsed_ms: u64,
}

impl LoadReport {
    fn new(pages: usize, summary: BatchSummary, inferred_rewards: usize, elapsed_ms: u64) -> Self {
        Self {
            pages,
            contributions: summary.contributions,
            rewards: summary.rewards,
            supporters: summary.supporters,
            dropped: summary.dropped,
            unmatched: summary.unmatched,
            ignored: summary.ignored,
            inferred_rewards,
            elapsed_ms,
        }
    }
}

/// Rebuild `store` from every page of `source`.
///
/// Pages are fetched before the store is touched, so a failed fetch leaves
/// the previous contents in place. A malformed item aborts the load with the
/// store cleared and marked unloaded.
pub async fn run_bulk_load(
    source: &dyn PageSource,
    normalizer: &RecordNormalizer,
    store: &mut ReconciliationStore,
    max_pages: usize,
) -> Result<LoadReport> {
    let start_time = Utc::now();
    log::info!("Starting bulk load for campaign {}", normalizer.campaign_id());

    let pages = PageFetcher::new(source, max_pages).fetch_all().await?;

    store.clear();
    let mut summary = BatchSummary::default();
    for (index, page) in pages.iter().enumerate() {
        match normalizer.apply_batch(store, &page.data, &page.included) {
            Ok(page_summary) => summary += page_summary,
            Err(e) => {
                log::error!("Bulk load aborted on page {}: {}", index + 1, e);
                return Err(e);
            }
        }
    }

    let inferred_rewards = store.resolve_rewards();
    store.mark_loaded();

    let elapsed_ms = (Utc::now() - start_time).num_milliseconds().max(0) as u64;
    let report = LoadReport::new(pages.len(), summary, inferred_rewards, elapsed_ms);
    log::info!(
        "Bulk load complete: {} supporters from {} pages ({} dropped, {} rewards inferred) in {}ms",
        report.supporters,
        report.pages,
        report.dropped,
        report.inferred_rewards,
        report.elapsed_ms
    );
    Ok(report)
}
