// src/query.rs

//! Read-only queries against the published index.

use std::sync::Arc;

use thiserror::Error;

use crate::models::Torrent;
use crate::store::IndexStore;

/// Why a query could not be answered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// No index has been published yet; retry later.
    #[error("torrent index is not ready yet")]
    NotReady,

    /// The category is not part of the current index.
    #[error("unknown category: {0}")]
    NotFound(String),
}

/// Answers category and torrent lookups from whatever is published.
#[derive(Debug, Clone)]
pub struct QueryService {
    store: Arc<IndexStore>,
}

impl QueryService {
    pub fn new(store: Arc<IndexStore>) -> Self {
        Self { store }
    }

    /// Category names in the order the last successful scrape produced them.
    pub fn list_categories(&self) -> Result<Vec<String>, QueryError> {
        let state = self.store.read();
        let index = state.index().ok_or(QueryError::NotReady)?;
        Ok(index.categories().map(str::to_owned).collect())
    }

    /// Torrents listed for `category`, as scraped.
    pub fn list_items(&self, category: &str) -> Result<Vec<Torrent>, QueryError> {
        let state = self.store.read();
        let index = state.index().ok_or(QueryError::NotReady)?;
        index
            .items(category)
            .map(<[Torrent]>::to_vec)
            .ok_or_else(|| QueryError::NotFound(category.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryIndex;

    fn service_with(index: Option<CategoryIndex>) -> QueryService {
        let store = Arc::new(IndexStore::new());
        if let Some(index) = index {
            store.publish(index);
        }
        QueryService::new(store)
    }

    fn movies_and_music() -> CategoryIndex {
        CategoryIndex::from_categories([
            ("movies", vec![Torrent::named("a"), Torrent::named("b")]),
            ("music", vec![]),
        ])
    }

    #[test]
    fn fresh_start_is_not_ready() {
        let service = service_with(None);
        assert_eq!(service.list_categories(), Err(QueryError::NotReady));
        assert_eq!(service.list_items("movies"), Err(QueryError::NotReady));
    }

    #[test]
    fn lists_categories_in_scrape_order() {
        let service = service_with(Some(movies_and_music()));
        assert_eq!(
            service.list_categories().unwrap(),
            vec!["movies".to_string(), "music".to_string()]
        );
    }

    #[test]
    fn lists_items_for_category() {
        let service = service_with(Some(movies_and_music()));

        let names: Vec<_> = service
            .list_items("movies")
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(service.list_items("music").unwrap().is_empty());
    }

    #[test]
    fn unknown_category_is_not_found() {
        let service = service_with(Some(movies_and_music()));
        assert_eq!(
            service.list_items("books"),
            Err(QueryError::NotFound("books".to_string()))
        );
    }

    #[test]
    fn sees_newly_published_index() {
        let store = Arc::new(IndexStore::new());
        let service = QueryService::new(Arc::clone(&store));
        store.publish(movies_and_music());
        store.publish(CategoryIndex::from_categories([("books", vec![])]));

        assert_eq!(service.list_categories().unwrap(), vec!["books".to_string()]);
        assert!(matches!(
            service.list_items("movies"),
            Err(QueryError::NotFound(_))
        ));
    }
}
