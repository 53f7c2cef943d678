//! Channel subscription source.
//!
//! The subscription listing is offset-paginated and reports a running
//! `_total` instead of a next-link. This source turns the offset into a
//! cursor and maps every subscription row onto the same raw items the pledge
//! listing produces:
//!
//! ```text
//! subscription row ──► "subscription" item  (amount from tier table, reward = plan)
//!                  └─► "user" item          (display name)
//! tier table       ──► "tier" items         (scoped to the channel, first page only)
//! ```
//!
//! The broadcaster's own row is never emitted.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Page, PageLinks, RawItem, SourceConfig};
use crate::services::PageSource;
use crate::utils::{api_url, http};

const ACCEPT: &str = "application/vnd.twitchtv.v5+json";

/// One page of the subscription listing.
#[derive(Debug, Deserialize)]
pub struct SubscriptionPage {
    #[serde(rename = "_total")]
    pub total: usize,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Deserialize)]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: String,
    pub created_at: String,
    pub sub_plan: String,
    pub user: SubscriptionUser,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionUser {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

pub struct TwitchSource {
    client: Client,
    listing: Url,
    client_id: String,
    config: SourceConfig,
}

impl TwitchSource {
    pub fn new(client: Client, config: &SourceConfig) -> Result<Self> {
        let listing = api_url(
            config.api_base(),
            &["channels", config.campaign_id.as_str(), "subscriptions"],
        )?;
        let client_id = config
            .client_id
            .clone()
            .ok_or_else(|| AppError::config("source.client_id is required for twitch"))?;

        Ok(Self {
            client,
            listing,
            client_id,
            config: config.clone(),
        })
    }

    fn page_url(&self, offset: usize) -> String {
        let mut url = self.listing.clone();
        url.query_pairs_mut()
            .append_pair("limit", &self.config.page_size.to_string())
            .append_pair("offset", &offset.to_string());
        url.to_string()
    }

    /// Map one listing page onto raw items and the next offset cursor.
    ///
    /// Rows on a plan missing from the tier table are skipped with a warning.
    pub fn into_page(&self, body: SubscriptionPage, offset: usize) -> Page {
        let channel_id = self.config.campaign_id.as_str();
        let mut page = Page::default();

        if offset == 0 {
            page.included.extend(self.config.tiers.iter().map(|tier| {
                RawItem::new("tier", &tier.plan)
                    .with_attr("title", tier.title.as_str())
                    .with_relation("campaign", "channel", channel_id)
            }));
        }

        let seen = offset + body.subscriptions.len();
        let has_more = !body.subscriptions.is_empty() && seen < body.total;

        for sub in body.subscriptions {
            if sub.user.id == channel_id {
                continue;
            }
            let Some(tier) = self.config.tier(&sub.sub_plan) else {
                log::warn!("Skipping subscription {} with unknown plan {}", sub.id, sub.sub_plan);
                continue;
            };

            page.data.push(
                RawItem::new("subscription", &sub.id)
                    .with_attr("amount_cents", tier.amount_cents)
                    .with_attr("created_at", sub.created_at.as_str())
                    .with_relation("user", "user", &sub.user.id)
                    .with_relation("reward", "tier", &sub.sub_plan),
            );

            let name = sub.user.display_name.or(sub.user.name).unwrap_or_default();
            page.included
                .push(RawItem::new("user", &sub.user.id).with_attr("display_name", name));
        }

        page.links = PageLinks {
            next: has_more.then(|| seen.to_string()),
        };
        page
    }
}

#[async_trait]
impl PageSource for TwitchSource {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page> {
        let offset = match cursor {
            None => 0,
            Some(c) => c.parse::<usize>().map_err(|e| {
                AppError::remote_fetch(self.listing.as_str(), format!("bad offset cursor '{c}': {e}"))
            })?,
        };

        let url = self.page_url(offset);
        log::debug!("GET {}", url);
        let request = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, format!("OAuth {}", self.config.access_token))
            .header("Client-ID", &self.client_id)
            .header(reqwest::header::ACCEPT, ACCEPT);

        let body: SubscriptionPage = http::get_json(request, &url).await?;
        Ok(self.into_page(body, offset))
    }
}
