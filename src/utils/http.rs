// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Send a request and decode a JSON body.
///
/// Transport failures, non-success statuses and undecodable bodies all
/// surface as [`AppError::RemoteFetch`] for `url`.
pub async fn get_json<T: DeserializeOwned>(request: RequestBuilder, url: &str) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| AppError::remote_fetch(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::remote_fetch(url, format!("HTTP {status}")));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::remote_fetch(url, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::remote_fetch(url, format!("invalid JSON body: {e}")))
}
