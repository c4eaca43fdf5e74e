// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::ScraperConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &ScraperConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page asynchronously and return its body.
///
/// Non-success statuses are errors so an upstream error page is never
/// mistaken for an empty listing.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::scrape(url, format!("upstream returned {status}")));
    }
    Ok(response.text().await?)
}
