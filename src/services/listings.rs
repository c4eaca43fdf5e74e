// src/services/listings.rs

//! Listing scraper service.
//!
//! Fetches each configured category page and extracts its torrent rows with
//! the configured CSS selectors.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CategoryIndex, CategorySource, Config, ListingSelectors, Torrent};
use crate::utils::http;
use crate::utils::{normalize_whitespace, parse_count, parse_description, resolve_url};

use super::Scraper;

/// Selectors parsed once at construction.
struct CompiledSelectors {
    row: Selector,
    name: Selector,
    magnet: Selector,
    description: Selector,
    seeders: Selector,
    leechers: Selector,
    link_attr: String,
}

impl CompiledSelectors {
    fn compile(selectors: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            row: parse_selector(&selectors.row)?,
            name: parse_selector(&selectors.name)?,
            magnet: parse_selector(&selectors.magnet)?,
            description: parse_selector(&selectors.description)?,
            seeders: parse_selector(&selectors.seeders)?,
            leechers: parse_selector(&selectors.leechers)?,
            link_attr: selectors.link_attr.clone(),
        })
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Scrapes the top torrents of every configured category.
pub struct ListingScraper {
    config: Arc<Config>,
    client: Client,
    selectors: CompiledSelectors,
}

impl ListingScraper {
    /// Create a scraper with the given configuration.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = http::create_async_client(&config.scraper)?;
        Self::with_client(config, client)
    }

    /// Create a scraper that uses an existing HTTP client.
    pub fn with_client(config: Arc<Config>, client: Client) -> Result<Self> {
        let selectors = CompiledSelectors::compile(&config.selectors)?;
        Ok(Self {
            config,
            client,
            selectors,
        })
    }

    /// Fetch and parse one category page.
    async fn fetch_category(&self, source: &CategorySource) -> Result<Vec<Torrent>> {
        let html = http::fetch_text(&self.client, &source.url).await?;
        let base_url = Url::parse(&source.url)?;
        let torrents = self.parse_listing(&html, &base_url);

        if torrents.is_empty() && !self.config.scraper.allow_empty_categories {
            return Err(AppError::scrape(
                &source.name,
                "listing contained no torrents",
            ));
        }
        Ok(torrents)
    }

    /// Extract at most `max_items_per_category` torrents from a listing page.
    pub fn parse_listing(&self, html: &str, base_url: &Url) -> Vec<Torrent> {
        let document = Html::parse_document(html);
        document
            .select(&self.selectors.row)
            .filter_map(|row| self.parse_row(&row, base_url))
            .take(self.config.scraper.max_items_per_category)
            .collect()
    }

    fn parse_row(&self, row: &ElementRef, base_url: &Url) -> Option<Torrent> {
        let sel = &self.selectors;
        let name_elem = row.select(&sel.name).next()?;
        let name = normalize_whitespace(&name_elem.text().collect::<String>());
        if name.is_empty() {
            return None;
        }

        let attr = |elem: ElementRef| {
            elem.value()
                .attr(&sel.link_attr)
                .filter(|href| !href.trim().is_empty())
                .map(|href| resolve_url(base_url, href.trim()))
        };
        let text_of = |selector: &Selector| -> String {
            row.select(selector)
                .next()
                .map(|e| e.text().collect())
                .unwrap_or_default()
        };

        let description = parse_description(&text_of(&sel.description));

        Some(Torrent {
            name,
            link: attr(name_elem),
            magnet: row.select(&sel.magnet).next().and_then(attr),
            size: description.size,
            uploaded: description.uploaded,
            seeders: parse_count(&text_of(&sel.seeders)),
            leechers: parse_count(&text_of(&sel.leechers)),
        })
    }
}

/// Re-key an error to the category it happened in, without nesting scrape errors.
fn in_category(category: &str, err: AppError) -> AppError {
    match err {
        AppError::Scrape { message, .. } => AppError::scrape(category, message),
        other => AppError::scrape(category, other),
    }
}

#[async_trait]
impl Scraper for ListingScraper {
    async fn scrape(&self) -> Result<CategoryIndex> {
        let delay = Duration::from_millis(self.config.scraper.request_delay_ms);
        let concurrency = self.config.scraper.max_concurrent.max(1);

        // Request starts are spaced by `delay` across all in-flight fetches.
        let pacer = (!delay.is_zero()).then(|| {
            let mut interval = tokio::time::interval(delay);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Mutex::new(interval)
        });
        let pacer = &pacer;

        // `buffered` yields in input order, so categories keep their configured order.
        let mut pages = stream::iter(self.config.categories.iter().cloned())
            .map(move |source| async move {
                if let Some(pacer) = pacer {
                    pacer.lock().await.tick().await;
                }
                let result = self.fetch_category(&source).await;
                (source, result)
            })
            .boxed()
            .buffered(concurrency);

        let mut builder = CategoryIndex::builder();
        while let Some((source, result)) = pages.next().await {
            let torrents = result.map_err(|e| {
                log::warn!("Failed to scrape {} ({}): {}", source.name, source.url, e);
                in_category(&source.name, e)
            })?;
            log::debug!("Scraped {} torrents for {}", torrents.len(), source.name);
            builder = builder.category(source.name, torrents);
        }

        Ok(builder.build())
    }
}
