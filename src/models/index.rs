//! Category index snapshot.
//!
//! A [`CategoryIndex`] is built once by a scrape and never mutated
//! afterwards. Replacing the served index means building a new value and
//! publishing it through [`crate::store::IndexStore`].

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use super::Torrent;

/// Immutable mapping from category name to its torrents.
///
/// Category order is the order in which the scrape produced them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryIndex {
    categories: IndexMap<String, Vec<Torrent>>,
    built_at: DateTime<Utc>,
}

impl CategoryIndex {
    /// Start building a new index.
    pub fn builder() -> CategoryIndexBuilder {
        CategoryIndexBuilder::default()
    }

    /// Build an index from `(category, torrents)` pairs, keeping their order.
    ///
    /// A repeated category name replaces the earlier list but keeps its
    /// original position.
    pub fn from_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<Torrent>)>,
        S: Into<String>,
    {
        categories
            .into_iter()
            .fold(Self::builder(), |builder, (name, items)| {
                builder.category(name, items)
            })
            .build()
    }

    /// Category names in index order.
    pub fn categories(&self) -> impl ExactSizeIterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Torrents for `category`, or `None` if it is not part of this index.
    ///
    /// Lookup is case-sensitive.
    pub fn items(&self, category: &str) -> Option<&[Torrent]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Total number of torrents across all categories.
    pub fn item_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// When the scrape that produced this index finished.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

/// Incremental builder; the only way to populate a [`CategoryIndex`].
#[derive(Debug, Default)]
pub struct CategoryIndexBuilder {
    categories: IndexMap<String, Vec<Torrent>>,
}

impl CategoryIndexBuilder {
    /// Add a category and its torrents.
    pub fn category(mut self, name: impl Into<String>, items: Vec<Torrent>) -> Self {
        self.categories.insert(name.into(), items);
        self
    }

    /// Freeze the builder into an index stamped with the current time.
    pub fn build(self) -> CategoryIndex {
        CategoryIndex {
            categories: self.categories,
            built_at: Utc::now(),
        }
    }
}
