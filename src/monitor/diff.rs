//! Identity-keyed comparison of two feed snapshots.
//!
//! Only membership changes are reported. A record whose identity survives but whose
//! content changed (a message turning read, an edited comment) is not in either set.

use std::collections::HashSet;

use crate::models::Identity;

/// Records that entered and left a feed between two snapshots
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDiff<T> {
    /// In `new` but not `old`, in `new`'s order
    pub added: Vec<T>,
    /// In `old` but not `new`, in `old`'s order
    pub removed: Vec<T>,
}

impl<T> SnapshotDiff<T> {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

pub fn diff<T: Identity + Clone>(old: &[T], new: &[T]) -> SnapshotDiff<T> {
    let old_keys: HashSet<&str> = old.iter().map(Identity::identity).collect();
    let new_keys: HashSet<&str> = new.iter().map(Identity::identity).collect();

    let added = new
        .iter()
        .filter(|item| !old_keys.contains(item.identity()))
        .cloned()
        .collect();
    let removed = old
        .iter()
        .filter(|item| !new_keys.contains(item.identity()))
        .cloned()
        .collect();

    SnapshotDiff { added, removed }
}

/// Drop repeated identities, keeping the first occurrence
pub fn dedupe<T: Identity>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.identity().to_string()))
        .collect()
}
