//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener and contact settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Index rebuild timing
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Upstream HTTP and extraction behavior
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Upstream listing pages, one per category, in serving order
    #[serde(default = "defaults::categories")]
    pub categories: Vec<CategorySource>,

    /// CSS selectors for the upstream listing table
    #[serde(default)]
    pub selectors: ListingSelectors,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply `PORT` and `ADMIN_EMAIL` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("ADMIN_EMAIL").ok().as_deref(),
        );
    }

    fn apply_overrides(&mut self, port: Option<&str>, admin_email: Option<&str>) {
        if let Some(port) = port {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(e) => log::warn!("Ignoring invalid PORT {:?}: {}", port, e),
            }
        }
        if let Some(email) = admin_email.filter(|e| !e.trim().is_empty()) {
            self.server.admin_email = email.trim().to_string();
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.server.admin_email.trim().is_empty() {
            return Err(AppError::validation("server.admin_email is empty"));
        }
        if self.refresh.interval_secs == 0 {
            return Err(AppError::validation("refresh.interval_secs must be > 0"));
        }
        if self.scraper.user_agent.trim().is_empty() {
            return Err(AppError::validation("scraper.user_agent is empty"));
        }
        if self.scraper.timeout_secs == 0 {
            return Err(AppError::validation("scraper.timeout_secs must be > 0"));
        }
        if self.scraper.max_concurrent == 0 {
            return Err(AppError::validation("scraper.max_concurrent must be > 0"));
        }
        if self.scraper.max_items_per_category == 0 {
            return Err(AppError::validation(
                "scraper.max_items_per_category must be > 0",
            ));
        }
        if self.categories.is_empty() {
            return Err(AppError::validation("No categories defined"));
        }

        let mut seen = HashSet::new();
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(AppError::validation("Category with empty name"));
            }
            if !seen.insert(category.name.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate category: {}",
                    category.name
                )));
            }
            url::Url::parse(&category.url).map_err(|e| {
                AppError::validation(format!("Category {} has invalid url: {e}", category.name))
            })?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            refresh: RefreshConfig::default(),
            scraper: ScraperConfig::default(),
            categories: defaults::categories(),
            selectors: ListingSelectors::default(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Contact shown to clients when an internal error occurs
    #[serde(default = "defaults::admin_email")]
    pub admin_email: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            admin_email: defaults::admin_email(),
        }
    }
}

/// Index rebuild settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between the starts of consecutive rebuild attempts
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
        }
    }
}

/// HTTP client and extraction settings for the upstream listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Minimum spacing between category request starts in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Torrents kept per category (top N as listed upstream)
    #[serde(default = "defaults::max_items")]
    pub max_items_per_category: usize,

    /// Accept a category page with no torrents instead of failing the scrape
    #[serde(default)]
    pub allow_empty_categories: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
            max_items_per_category: defaults::max_items(),
            allow_empty_categories: false,
        }
    }
}

/// A category and the upstream page listing its top torrents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySource {
    pub name: String,
    pub url: String,
}

/// CSS selectors used to extract torrents from a listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// One match per torrent row
    #[serde(default = "defaults::row_selector")]
    pub row: String,

    /// Title element; its link attribute is the detail page
    #[serde(default = "defaults::name_selector")]
    pub name: String,

    #[serde(default = "defaults::magnet_selector")]
    pub magnet: String,

    /// Free-text description holding upload date and size
    #[serde(default = "defaults::description_selector")]
    pub description: String,

    #[serde(default = "defaults::seeders_selector")]
    pub seeders: String,

    #[serde(default = "defaults::leechers_selector")]
    pub leechers: String,

    /// HTML attribute for link extraction
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            row: defaults::row_selector(),
            name: defaults::name_selector(),
            magnet: defaults::magnet_selector(),
            description: defaults::description_selector(),
            seeders: defaults::seeders_selector(),
            leechers: defaults::leechers_selector(),
            link_attr: defaults::link_attr(),
        }
    }
}

mod defaults {
    use super::CategorySource;

    // Server defaults
    pub fn host() -> String {
        "0.0.0.0".into()
    }
    pub fn port() -> u16 {
        3000
    }
    pub fn admin_email() -> String {
        "admin@example.com".into()
    }

    // Refresh defaults
    pub fn interval() -> u64 {
        15 * 60
    }

    // Scraper defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; torrent-index/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        250
    }
    pub fn max_concurrent() -> usize {
        3
    }
    pub fn max_items() -> usize {
        100
    }

    // Selector defaults
    pub fn row_selector() -> String {
        "#searchResult tr:has(a.detLink)".into()
    }
    pub fn name_selector() -> String {
        "a.detLink".into()
    }
    pub fn magnet_selector() -> String {
        "a[href^='magnet:']".into()
    }
    pub fn description_selector() -> String {
        "font.detDesc".into()
    }
    pub fn seeders_selector() -> String {
        "td:nth-last-child(2)".into()
    }
    pub fn leechers_selector() -> String {
        "td:nth-last-child(1)".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }

    // Category defaults
    pub fn categories() -> Vec<CategorySource> {
        [
            ("audio", "100"),
            ("video", "200"),
            ("applications", "300"),
            ("games", "400"),
            ("other", "600"),
        ]
        .into_iter()
        .map(|(name, code)| CategorySource {
            name: name.to_string(),
            url: format!("https://thepiratebay.org/top/{code}"),
        })
        .collect()
    }
}
