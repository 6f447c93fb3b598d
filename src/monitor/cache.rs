use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// A snapshot together with the moment it was fetched
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub snapshot: Arc<Vec<T>>,
    pub last_updated: Instant,
}

/// Latest snapshot of one feed.
///
/// Writers swap in a whole new entry, so readers always see a snapshot and its
/// timestamp from the same write.
#[derive(Debug)]
pub struct FeedCache<T> {
    slot: RwLock<Option<Arc<CacheEntry<T>>>>,
    freshness: Duration,
}

impl<T> FeedCache<T> {
    pub fn new(freshness: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            freshness,
        }
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    pub fn entry(&self) -> Option<Arc<CacheEntry<T>>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cached snapshot, empty if nothing was fetched yet
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.entry()
            .map(|entry| entry.snapshot.clone())
            .unwrap_or_default()
    }

    /// Cached snapshot if it is younger than the freshness window
    pub fn fresh(&self) -> Option<Arc<Vec<T>>> {
        self.entry()
            .filter(|entry| entry.last_updated.elapsed() < self.freshness)
            .map(|entry| entry.snapshot.clone())
    }

    pub fn last_updated(&self) -> Option<Instant> {
        self.entry().map(|entry| entry.last_updated)
    }

    /// Replace the snapshot, returning `(previous, current)`
    pub fn replace(&self, items: Vec<T>) -> (Arc<Vec<T>>, Arc<Vec<T>>) {
        let entry = Arc::new(CacheEntry {
            snapshot: Arc::new(items),
            last_updated: Instant::now(),
        });
        let current = entry.snapshot.clone();

        let previous = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(entry);

        let previous = previous
            .map(|entry| entry.snapshot.clone())
            .unwrap_or_default();
        (previous, current)
    }
}
