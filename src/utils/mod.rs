//! Utility functions and helpers.

pub mod http;
pub mod log;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Join path segments onto an API root, keeping any path the root already has.
pub fn api_url(base: &str, segments: &[&str]) -> crate::error::Result<Url> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| crate::error::AppError::config(format!("API base cannot be a base: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
