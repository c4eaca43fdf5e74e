// src/store.rs

//! Published index slot.
//!
//! The store holds at most one [`CategoryIndex`]. Publishing swaps a whole
//! `Arc` in a single atomic step, so a reader holds either the old snapshot
//! or the new one and keeps it alive for as long as it needs. Readers never
//! take a lock and never wait on a scrape or a publish.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::models::CategoryIndex;

/// Snapshot of what is currently being served.
#[derive(Debug, Clone)]
pub enum PublishedState {
    /// No scrape has succeeded yet.
    Unavailable,
    /// The most recently published index.
    Available(Arc<CategoryIndex>),
}

impl PublishedState {
    pub fn index(&self) -> Option<&Arc<CategoryIndex>> {
        match self {
            Self::Unavailable => None,
            Self::Available(index) => Some(index),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

/// Two states are equal when they refer to the same published snapshot.
impl PartialEq for PublishedState {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unavailable, Self::Unavailable) => true,
            (Self::Available(a), Self::Available(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Holder of the single published [`CategoryIndex`].
#[derive(Debug, Default)]
pub struct IndexStore {
    slot: ArcSwapOption<CategoryIndex>,
}

impl IndexStore {
    /// Create an empty store in the `Unavailable` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published index. The previous one is dropped once the
    /// last reader holding it lets go.
    pub fn publish(&self, index: CategoryIndex) {
        self.slot.store(Some(Arc::new(index)));
    }

    /// Current published state.
    pub fn read(&self) -> PublishedState {
        match self.slot.load_full() {
            Some(index) => PublishedState::Available(index),
            None => PublishedState::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use super::*;
    use crate::models::Torrent;

    fn index_of(tag: &str, width: usize) -> CategoryIndex {
        CategoryIndex::from_categories((0..width).map(|i| {
            (
                format!("cat{i}"),
                vec![Torrent::named(format!("{tag}-{i}"))],
            )
        }))
    }

    #[test]
    fn starts_unavailable() {
        let store = IndexStore::new();
        assert_eq!(store.read(), PublishedState::Unavailable);
        assert!(!store.read().is_available());
    }

    #[test]
    fn publish_makes_index_available() {
        let store = IndexStore::new();
        store.publish(index_of("a", 2));

        let state = store.read();
        let index = state.index().expect("published");
        assert_eq!(index.len(), 2);
        assert_eq!(index.items("cat1").unwrap()[0].name, "a-1");
    }

    #[test]
    fn read_is_idempotent_without_publish() {
        let store = IndexStore::new();
        store.publish(index_of("a", 1));

        assert_eq!(store.read(), store.read());
    }

    #[test]
    fn publish_replaces_previous_index() {
        let store = IndexStore::new();
        store.publish(index_of("a", 1));
        let before = store.read();
        store.publish(index_of("b", 1));
        let after = store.read();

        assert_ne!(before, after);
        assert_eq!(after.index().unwrap().items("cat0").unwrap()[0].name, "b-0");
        // A reader that took the old snapshot keeps seeing it intact.
        assert_eq!(before.index().unwrap().items("cat0").unwrap()[0].name, "a-0");
    }

    #[test]
    fn concurrent_readers_never_see_mixed_versions() {
        const WIDTH: usize = 16;
        let store = Arc::new(IndexStore::new());
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    while !done.load(Ordering::Relaxed) {
                        let state = store.read();
                        let Some(index) = state.index() else {
                            continue;
                        };
                        assert_eq!(index.len(), WIDTH);
                        let tag = index.items("cat0").unwrap()[0]
                            .name
                            .split('-')
                            .next()
                            .unwrap()
                            .to_string();
                        for (i, name) in index.categories().enumerate() {
                            let item = &index.items(name).unwrap()[0];
                            assert_eq!(item.name, format!("{tag}-{i}"));
                        }
                    }
                })
            })
            .collect();

        for round in 0..500 {
            store.publish(index_of(&format!("v{round}"), WIDTH));
        }
        done.store(true, Ordering::Relaxed);

        for reader in readers {
            reader.join().expect("reader panicked");
        }
    }
}
