// src/services/fetcher.rs

//! Paginated bulk fetching.
//!
//! The fetcher walks server-issued cursors from the first page until the
//! server stops returning a next-link. Pagination state lives on the server,
//! so a failed walk is simply restarted from the first page.

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Page;

/// Source of listing pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page; `None` requests the first page.
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page>;
}

/// Walks every page of a [`PageSource`].
pub struct PageFetcher<'a> {
    source: &'a dyn PageSource,
    max_pages: usize,
}

impl<'a> PageFetcher<'a> {
    pub fn new(source: &'a dyn PageSource, max_pages: usize) -> Self {
        Self { source, max_pages }
    }

    /// Fetch all pages, in server order.
    ///
    /// Any failure aborts the whole walk; nothing is retried.
    pub async fn fetch_all(&self) -> Result<Vec<Page>> {
        let mut pages: Vec<Page> = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            if pages.len() >= self.max_pages {
                log::error!(
                    "Pagination still returning next-links after {} pages",
                    self.max_pages
                );
                return Err(AppError::PageLimitExceeded {
                    max_pages: self.max_pages,
                });
            }

            let page = self.source.fetch_page(cursor.as_deref()).await?;
            cursor = page.next_link().map(str::to_string);
            log::debug!(
                "Fetched page {} ({} items, next: {})",
                pages.len() + 1,
                page.item_count(),
                cursor.as_deref().unwrap_or("none")
            );
            pages.push(page);

            if cursor.is_none() {
                break;
            }
        }

        log::info!("Fetched {} pages", pages.len());
        Ok(pages)
    }
}
