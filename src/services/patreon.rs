//! Pledge listing source.
//!
//! Reads the campaign pledge listing as JSON:API pages and follows the
//! server-issued `links.next` cursor.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::Result;
use crate::models::{Page, SourceConfig};
use crate::services::PageSource;
use crate::utils::{api_url, http, resolve_url};

pub struct PatreonSource {
    client: Client,
    first_page: Url,
    access_token: String,
}

impl PatreonSource {
    pub fn new(client: Client, config: &SourceConfig) -> Result<Self> {
        let mut first_page = api_url(
            config.api_base(),
            &["campaigns", config.campaign_id.as_str(), "pledges"],
        )?;
        first_page
            .query_pairs_mut()
            .append_pair("include", "patron.null");

        Ok(Self {
            client,
            first_page,
            access_token: config.access_token.clone(),
        })
    }

    pub fn first_page_url(&self) -> &str {
        self.first_page.as_str()
    }

    fn page_url(&self, cursor: Option<&str>) -> String {
        match cursor {
            Some(next) => resolve_url(&self.first_page, next),
            None => self.first_page.to_string(),
        }
    }
}

#[async_trait]
impl PageSource for PatreonSource {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page> {
        let url = self.page_url(cursor);
        log::debug!("GET {}", url);
        let request = self.client.get(&url).bearer_auth(&self.access_token);
        http::get_json(request, &url).await
    }
}
