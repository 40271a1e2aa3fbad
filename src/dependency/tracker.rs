use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::commands::Fingerprint;

/// Default capacity of a tracker.
pub const DEFAULT_CAPACITY: usize = 2000;

/// Anything that knows its own fingerprint.
///
/// Components compute their fingerprint at construction time; calling this
/// is always cheap and never fails.
pub trait Fingerprinted {
    fn fingerprint(&self) -> Fingerprint;
}

/// A bounded, process-local cache from fingerprints to shared artifacts.
///
/// Keys are the canonical textual form of the fingerprint, stored in a
/// `BTreeMap` so retrieval is logarithmic. Insertion is first-writer-wins:
/// adding under an existing key keeps the old entry. When the capacity is
/// exceeded, the oldest insertion is evicted; because the tracker only
/// holds `Arc` handles, eviction never destroys an artifact that a live
/// pipeline still references.
pub struct DependencyTracker<T: ?Sized> {
    inner: RwLock<TrackerInner<T>>,
    capacity: usize,
}

struct TrackerInner<T: ?Sized> {
    entries: BTreeMap<String, Arc<T>>,
    insertion_order: VecDeque<String>,
}

impl<T: ?Sized> DependencyTracker<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(TrackerInner {
                entries: BTreeMap::new(),
                insertion_order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Returns the artifact stored under `fingerprint`, if any. A miss is
    /// the normal path, not an error.
    pub fn retrieve(&self, fingerprint: &Fingerprint) -> Option<Arc<T>> {
        self.inner.read().entries.get(fingerprint.as_json()).cloned()
    }

    /// Inserts `artifact` under an explicit fingerprint.
    pub fn add_with_fingerprint(&self, fingerprint: &Fingerprint, artifact: Arc<T>) {
        let mut inner = self.inner.write();

        let key = fingerprint.as_json().to_string();

        if inner.entries.contains_key(&key) {
            return;
        }

        inner.entries.insert(key.clone(), artifact);
        inner.insertion_order.push_back(key);

        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.insertion_order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.insertion_order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

impl<T: Fingerprinted + ?Sized> DependencyTracker<T> {
    /// Inserts `artifact` under its own fingerprint.
    pub fn add(&self, artifact: Arc<T>) {
        let fingerprint = artifact.fingerprint();
        self.add_with_fingerprint(&fingerprint, artifact);
    }
}

impl<T: ?Sized> Default for DependencyTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}
