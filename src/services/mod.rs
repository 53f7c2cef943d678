//! Service layer for the supporter cache.
//!
//! This module contains the building blocks for:
//! - Paginated fetching (`PageFetcher`, `PageSource`)
//! - Platform listing sources (`PatreonSource`, `TwitchSource`)
//! - Record normalization (`RecordNormalizer`)
//! - Webhook authentication (`WebhookVerifier`)
//! - Webhook application (`IncrementalUpdater`)

mod fetcher;
mod normalizer;
mod patreon;
mod twitch;
mod updater;
mod verifier;

pub use fetcher::{PageFetcher, PageSource};
pub use normalizer::{BatchSummary, Record, RecordNormalizer};
pub use patreon::PatreonSource;
pub use twitch::{SubscriptionPage, TwitchSource};
pub use updater::{EventKind, IncrementalUpdater, WebhookOutcome};
pub use verifier::WebhookVerifier;

#[cfg(test)]
pub(crate) use fetcher::tests::StaticSource;

use crate::error::Result;
use crate::models::{Config, Platform};
use crate::utils::http;

/// Build the listing source for the configured platform.
pub fn build_source(config: &Config) -> Result<Box<dyn PageSource>> {
    let client = http::create_async_client(&config.http)?;
    let source: Box<dyn PageSource> = match config.source.platform {
        Platform::Patreon => Box::new(PatreonSource::new(client, &config.source)?),
        Platform::Twitch => Box::new(TwitchSource::new(client, &config.source)?),
    };
    Ok(source)
}
