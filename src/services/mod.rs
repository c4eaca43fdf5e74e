//! Service layer for the torrent index.
//!
//! - Scrape contract (`Scraper`)
//! - Upstream listing scraping (`ListingScraper`)

mod listings;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CategoryIndex;

pub use listings::ListingScraper;

/// Builds a complete [`CategoryIndex`] from upstream sources.
///
/// Implementations either return a fully built index or an error, never a
/// partial index. They may take arbitrarily long and are responsible for
/// their own request timeouts.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self) -> Result<CategoryIndex>;
}
