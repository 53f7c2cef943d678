// src/pipeline/service.rs

//! Supporter service: the single store handle shared by every entry point.
//!
//! Construct one per process and pass it around (usually as
//! `Arc<SupporterService>`). The store sits behind an async mutex: a bulk
//! load holds it for the whole rebuild and a webhook holds it across its
//! full create/update step, so the two never interleave. A separate guard
//! rejects a second bulk load while one is running.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, MutexGuard};

use crate::error::{AppError, Result};
use crate::models::{Config, WebhookPayload};
use crate::pipeline::diff::{SupporterDiff, calculate_diff};
use crate::pipeline::load::{LoadReport, run_bulk_load};
use crate::pipeline::query::{QueryView, Snapshot, SortKey};
use crate::services::{
    EventKind, IncrementalUpdater, PageSource, RecordNormalizer, WebhookOutcome, WebhookVerifier,
    build_source,
};
use crate::storage::{ReconciliationStore, StoreStats};

pub struct SupporterService {
    config: Config,
    source: Box<dyn PageSource>,
    normalizer: RecordNormalizer,
    updater: IncrementalUpdater,
    verifier: WebhookVerifier,
    store: Mutex<ReconciliationStore>,
    loading: AtomicBool,
}

/// Clears the load-in-progress flag when dropped.
struct LoadGuard<'a>(&'a AtomicBool);

impl<'a> LoadGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::LoadInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SupporterService {
    /// Build the service with the HTTP source for the configured platform.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let source = build_source(&config)?;
        Self::with_source(config, source)
    }

    /// Build the service around an arbitrary page source.
    pub fn with_source(config: Config, source: Box<dyn PageSource>) -> Result<Self> {
        config.validate()?;
        let normalizer = RecordNormalizer::new(config.source.campaign_id.clone());
        let verifier = WebhookVerifier::new(&config.source.webhook_secret, config.source.digest);

        Ok(Self {
            updater: IncrementalUpdater::new(normalizer.clone()),
            normalizer,
            verifier,
            source,
            config,
            store: Mutex::new(ReconciliationStore::new()),
            loading: AtomicBool::new(false),
        })
    }

    /// Rebuild the store from the remote listing.
    pub async fn load(&self) -> Result<LoadReport> {
        let _guard = LoadGuard::acquire(&self.loading)?;
        let mut store = self.store.lock().await;
        run_bulk_load(
            self.source.as_ref(),
            &self.normalizer,
            &mut store,
            self.config.http.max_pages,
        )
        .await
    }

    /// Sorted snapshot of all supporters; loads on first use.
    pub async fn find(&self, sort: Option<&str>) -> Result<Snapshot> {
        let store = self.loaded_store().await?;
        Ok(QueryView::new(&store).find(SortKey::from_query(sort)))
    }

    /// Authenticate and apply one push-update event.
    ///
    /// The signature is checked against `raw_body` before anything is
    /// parsed or mutated. The body is only decoded once the store is known
    /// to be loaded, so an unloaded store always answers `Precondition`.
    pub async fn apply_webhook(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
        event: &str,
    ) -> Result<WebhookOutcome> {
        if self.config.source.webhook_secret.is_empty() {
            return Err(AppError::config(
                "webhooks need source.webhook_secret to be configured",
            ));
        }
        self.verifier.check(raw_body, signature)?;
        let kind: EventKind = event.parse()?;

        let mut store = self.store.lock().await;
        if !store.is_loaded() {
            return Err(AppError::precondition(
                "webhook received before the initial bulk load",
            ));
        }
        let payload: WebhookPayload = serde_json::from_slice(raw_body)?;
        self.updater.apply(&mut store, kind, &payload)
    }

    /// Reload everything and report what changed since the last load.
    pub async fn refresh(&self) -> Result<SupporterDiff> {
        let previous = {
            let store = self.store.lock().await;
            if store.is_loaded() {
                QueryView::new(&store).find(SortKey::CreatedAt).supporters
            } else {
                Vec::new()
            }
        };

        self.load().await?;

        let current = {
            let store = self.store.lock().await;
            QueryView::new(&store).find(SortKey::CreatedAt).supporters
        };
        let diff = calculate_diff(&previous, &current);
        if diff.has_changes() {
            log::info!(
                "Refresh: {} added, {} updated, {} removed",
                diff.added.len(),
                diff.updated.len(),
                diff.removed.len()
            );
        }
        Ok(diff)
    }

    pub async fn stats(&self) -> StoreStats {
        self.store.lock().await.stats()
    }

    /// Run a read-only closure against the store.
    pub async fn inspect<R>(&self, f: impl FnOnce(&ReconciliationStore) -> R) -> R {
        let store = self.store.lock().await;
        f(&store)
    }

    async fn loaded_store(&self) -> Result<MutexGuard<'_, ReconciliationStore>> {
        {
            let store = self.store.lock().await;
            if store.is_loaded() {
                return Ok(store);
            }
        }

        match self.load().await {
            Ok(_) | Err(AppError::LoadInProgress) => {}
            Err(e) => return Err(e),
        }

        let store = self.store.lock().await;
        if store.is_loaded() {
            Ok(store)
        } else {
            Err(AppError::precondition("bulk load has not completed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{Page, RawItem};
    use crate::services::StaticSource;

    const SECRET: &str = "webhook-secret";

    fn config() -> Config {
        let mut config = Config::default();
        config.source.access_token = "token".to_string();
        config.source.campaign_id = "c1".to_string();
        config.source.webhook_secret = SECRET.to_string();
        config
    }

    fn pledge(supporter: &str, amount: u64, created: &str, reward: Option<&str>) -> RawItem {
        let item = RawItem::new("pledge", format!("pledge-{supporter}"))
            .with_attr("amount_cents", amount)
            .with_attr("created_at", created)
            .with_attr("declined_since", serde_json::Value::Null)
            .with_relation("patron", "user", supporter);
        match reward {
            Some(id) => item.with_relation("reward", "reward", id),
            None => item,
        }
    }

    fn user(id: &str, name: &str) -> RawItem {
        RawItem::new("user", id).with_attr("first_name", name)
    }

    fn reward(id: &str, campaign: &str, title: &str) -> RawItem {
        RawItem::new("reward", id)
            .with_attr("title", title)
            .with_relation("campaign", "campaign", campaign)
    }

    fn two_supporter_page() -> Page {
        Page {
            data: vec![
                pledge("a", 500, "2020-01-01T00:00:00Z", None),
                pledge("b", 500, "2020-02-01T00:00:00Z", Some("r1")),
            ],
            included: vec![
                user("a", "Ada"),
                user("b", "Bea"),
                reward("r1", "c1", "Fertilizer"),
                reward("r2", "c2", "Someone else's"),
            ],
            ..Page::default()
        }
    }

    fn service(pages: Vec<Page>) -> SupporterService {
        SupporterService::with_source(config(), Box::new(StaticSource::chain(pages))).unwrap()
    }

    fn sign(body: &[u8]) -> String {
        WebhookVerifier::new(SECRET, config().source.digest).sign(body)
    }

    fn webhook_body(data: RawItem, included: Vec<RawItem>) -> Vec<u8> {
        serde_json::to_vec_pretty(&WebhookPayload { data, included }).unwrap()
    }

    #[test]
    fn test_construction_fails_fast_without_credentials() {
        let result = SupporterService::with_source(
            Config::default(),
            Box::new(StaticSource::chain(vec![])),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_end_to_end_load_infer_delete() {
        let service = service(vec![two_supporter_page()]);

        let snapshot = service.find(Some("amount")).await.unwrap();
        assert_eq!(snapshot.supporters.len(), 2);
        assert_eq!(snapshot.supporters[0].id, "a");
        assert_eq!(snapshot.supporters[0].reward_id.as_deref(), Some("r1"));
        assert!(snapshot.rewards.contains_key("r1"));
        assert!(!snapshot.rewards.contains_key("r2"));

        let body = webhook_body(pledge("b", 500, "2020-02-01T00:00:00Z", Some("r1")), vec![]);
        let outcome = service
            .apply_webhook(&body, Some(&sign(&body)), "pledges:delete")
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Acknowledged);

        let (cost, a) = service
            .inspect(|s| (s.reward_for_cost(500).map(str::to_string), s.supporter("a")))
            .await;
        assert_eq!(cost.as_deref(), Some("r1"));
        let a = a.unwrap();
        assert_eq!(a.display_name, "Ada");
        assert_eq!(a.contribution.reward_id.as_deref(), Some("r1"));

        let snapshot = service.find(None).await.unwrap();
        assert_eq!(snapshot.supporters.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_signature_leaves_store_untouched() {
        let service = service(vec![two_supporter_page()]);
        service.load().await.unwrap();

        let body = webhook_body(pledge("b", 500, "2020-02-01T00:00:00Z", None), vec![]);
        let result = service
            .apply_webhook(&body, Some("deadbeef"), "pledges:delete")
            .await;
        assert!(matches!(result, Err(AppError::Signature)));

        let missing = service.apply_webhook(&body, None, "pledges:delete").await;
        assert!(matches!(missing, Err(AppError::Signature)));

        assert!(service.inspect(|s| s.supporter("b").is_some()).await);
    }

    #[tokio::test]
    async fn test_webhook_before_load_is_rejected() {
        let service = service(vec![two_supporter_page()]);
        let body = webhook_body(
            pledge("z", 100, "2021-01-01T00:00:00Z", None),
            vec![user("z", "Zed")],
        );

        let result = service
            .apply_webhook(&body, Some(&sign(&body)), "pledges:create")
            .await;
        assert!(matches!(result, Err(AppError::Precondition(_))));
        assert_eq!(service.stats().await.contributions, 0);
    }

    #[tokio::test]
    async fn test_malformed_body_before_load_is_precondition() {
        let service = service(vec![two_supporter_page()]);
        let body = b"{not json".to_vec();

        let result = service
            .apply_webhook(&body, Some(&sign(&body)), "pledges:create")
            .await;
        assert!(matches!(result, Err(AppError::Precondition(_))));

        service.load().await.unwrap();
        let result = service
            .apply_webhook(&body, Some(&sign(&body)), "pledges:create")
            .await;
        assert!(matches!(result, Err(AppError::Json(_))));
    }

    #[tokio::test]
    async fn test_create_webhook_returns_supporter() {
        let service = service(vec![two_supporter_page()]);
        service.load().await.unwrap();

        let body = webhook_body(
            pledge("c", 500, "2021-01-01T00:00:00Z", None),
            vec![user("c", "Cy"), reward("r1", "c1", "Fertilizer")],
        );
        let outcome = service
            .apply_webhook(&body, Some(&sign(&body)), "pledges:create")
            .await
            .unwrap();

        let WebhookOutcome::Updated(Some(supporter)) = outcome else {
            panic!("expected supporter");
        };
        assert_eq!(supporter.display_name, "Cy");
        assert_eq!(supporter.contribution.reward_id.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_unknown_event_rejected() {
        let service = service(vec![two_supporter_page()]);
        service.load().await.unwrap();

        let body = webhook_body(pledge("a", 500, "2020-01-01T00:00:00Z", None), vec![]);
        let result = service
            .apply_webhook(&body, Some(&sign(&body)), "pledges:refund")
            .await;
        assert!(matches!(result, Err(AppError::UnsupportedEvent(_))));
    }

    #[tokio::test]
    async fn test_declined_supporter_filtered_end_to_end() {
        let mut page = two_supporter_page();
        page.data.push(
            pledge("d", 900, "2020-03-01T00:00:00Z", None)
                .with_attr("declined_since", "2020-04-01T00:00:00Z"),
        );
        page.included.push(user("d", "Dee"));
        let service = service(vec![page]);

        let snapshot = service.find(None).await.unwrap();
        assert!(snapshot.supporters.iter().all(|s| s.id != "d"));
    }

    #[tokio::test]
    async fn test_concurrent_load_is_rejected() {
        let service = service(vec![two_supporter_page()]);
        let _guard = LoadGuard::acquire(&service.loading).unwrap();

        assert!(matches!(service.load().await, Err(AppError::LoadInProgress)));
    }

    #[tokio::test]
    async fn test_refresh_reports_new_supporters() {
        let service = service(vec![two_supporter_page()]);
        let first = service.refresh().await.unwrap();
        assert_eq!(first.added.len(), 2);

        let second = service.refresh().await.unwrap();
        assert!(!second.has_changes());
    }

    #[tokio::test]
    async fn test_shared_handle_across_tasks() {
        let service = Arc::new(service(vec![two_supporter_page()]));
        service.load().await.unwrap();

        let handles: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|id| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let body = webhook_body(pledge(id, 500, "2020-01-01T00:00:00Z", None), vec![]);
                    service
                        .apply_webhook(&body, Some(&sign(&body)), "pledges:delete")
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), WebhookOutcome::Acknowledged);
        }
        assert_eq!(service.stats().await.supporters, 0);
    }
}
