//! Resource Store - latest known value per tracked resource
//!
//! Values are merged from whichever source (pull or push) reports the newer
//! observation; arrival order never matters. The view layer reads snapshots
//! and watches a revision counter for redraws.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::watch;

use crate::sync::resource::{ResourceFamily, ResourceKey, ResourceValue};
use crate::sync::staleness;

/// In-memory map from resource identity to its latest known value
pub struct ResourceStore {
    entries: DashMap<ResourceKey, ResourceValue>,
    /// Error message of the last failed pull, cleared by the next success
    last_error: Mutex<Option<String>>,
    /// Bumped on every accepted mutation
    revision: watch::Sender<u64>,
}

impl ResourceStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            entries: DashMap::new(),
            last_error: Mutex::new(None),
            revision,
        }
    }

    /// Apply a value if it is newer than the current entry.
    ///
    /// Returns whether a mutation occurred; callers use this to decide
    /// whether to re-arm the fallback timer and notify observers.
    pub fn upsert(&self, value: ResourceValue) -> bool {
        let changed = self.apply(value);
        if changed {
            self.bump();
        }
        changed
    }

    /// Remove one entry (e.g. on a device-deleted event)
    pub fn remove(&self, key: &ResourceKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.bump();
        }
        removed
    }

    /// Fold a pull response for one family into the store, key by key.
    ///
    /// Present keys go through the same staleness comparison as push events;
    /// a slow pull must never clobber a fresher push. Absent family keys are
    /// removed (membership reflects currently known resources) unless they
    /// were observed after `pulled_at`: the pull predates those entries and
    /// cannot testify to their deletion.
    ///
    /// Returns whether anything changed.
    pub fn merge_family(
        &self,
        family: ResourceFamily,
        values: Vec<ResourceValue>,
        pulled_at: i64,
    ) -> bool {
        let mut present: HashSet<ResourceKey> = HashSet::with_capacity(values.len());
        let mut changed = false;

        for value in values {
            present.insert(value.key);
            changed |= self.apply(value);
        }

        let mut removed = false;
        self.entries.retain(|key, entry| {
            if !family.contains(key) || present.contains(key) {
                return true;
            }
            if entry.observed_at.is_some_and(|t| t > pulled_at) {
                return true;
            }
            removed = true;
            false
        });

        if changed || removed {
            self.bump();
        }
        changed || removed
    }

    /// Current value for one key
    pub fn get(&self, key: &ResourceKey) -> Option<ResourceValue> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains_key(&self, key: &ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read-only snapshot of current values, ordered by key id
    pub fn snapshot(&self) -> Vec<ResourceValue> {
        let mut values: Vec<ResourceValue> =
            self.entries.iter().map(|entry| entry.value().clone()).collect();
        values.sort_by_key(|value| value.key.id());
        values
    }

    /// Discard everything (session teardown)
    pub fn clear(&self) {
        self.entries.clear();
        self.bump();
    }

    /// Record or clear the last failed pull
    pub fn set_last_error(&self, error: Option<String>) {
        let mut last_error = self.last_error.lock().unwrap();
        if *last_error != error {
            *last_error = error;
            drop(last_error);
            self.bump();
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    /// Revision counter for observers; bumped on every accepted mutation
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn apply(&self, value: ResourceValue) -> bool {
        match self.entries.entry(value.key) {
            Entry::Occupied(mut occupied) => {
                if staleness::is_newer(&value, Some(occupied.get())) {
                    occupied.insert(value);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(value);
                true
            }
        }
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}
